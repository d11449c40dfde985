//! 应用层 - 查询（读操作）

mod auth_queries;
mod novel_queries;

pub mod handlers;

pub use auth_queries::*;
pub use novel_queries::*;
