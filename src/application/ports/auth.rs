//! Auth Port - 登录与当前用户

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ApiError, TokenPair, User};

/// 登录/注册成功后的会话
///
/// 有的后端不在登录响应里带用户，此时由调用方再取 `me`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Auth Port
///
/// 请求客户端遇到 401 时由刷新协调器调用 `refresh`，
/// 业务代码一般不直接调用
#[async_trait]
pub trait AuthPort: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError>;

    async fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError>;

    /// 用 refresh token 换取新的令牌对；不带 bearer，也不触发 401 重试
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;

    async fn me(&self) -> Result<User, ApiError>;
}
