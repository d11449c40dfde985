//! Query Handlers 实现

mod auth_handlers;
mod novel_handlers;

pub use auth_handlers::*;
pub use novel_handlers::*;
