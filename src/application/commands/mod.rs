//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：登录会话、作品库和任务的写操作

mod auth_commands;
mod novel_commands;

pub mod handlers;

pub use auth_commands::*;
pub use novel_commands::*;
