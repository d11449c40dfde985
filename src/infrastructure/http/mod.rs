//! HTTP Layer - 请求客户端与令牌刷新
//!
//! 所有 REST 调用经过 ApiClient；401 由 RefreshCoordinator 统一处理

mod client;
mod error_body;
mod refresh;

pub use client::{ApiClient, RequestOptions};
pub use error_body::{extract_message, status_error};
pub use refresh::{exchange_refresh_token, RefreshCoordinator, SessionExpiredCallback, REFRESH_PATH};
