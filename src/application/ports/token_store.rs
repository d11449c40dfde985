//! Token Store Port - 本地持久化的凭据与偏好
//!
//! 读操作不经过网络，具体实现在 infrastructure/memory 和 infrastructure/persistence 层

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 本地存储错误
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<TokenStoreError> for crate::application::ports::ApiError {
    fn from(err: TokenStoreError) -> Self {
        Self::Store(err.to_string())
    }
}

/// access + refresh 令牌对
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// 当前登录用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Token Store Port
pub trait TokenStorePort: Send + Sync {
    fn access_token(&self) -> Result<Option<String>, TokenStoreError>;

    fn refresh_token(&self) -> Result<Option<String>, TokenStoreError>;

    fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), TokenStoreError>;

    fn clear_tokens(&self) -> Result<(), TokenStoreError>;
}

/// Preference Store Port
///
/// 缓存的当前用户，以及按用户区分的首选 AI 提供方
pub trait PreferenceStorePort: Send + Sync {
    fn cached_user(&self) -> Result<Option<User>, TokenStoreError>;

    fn set_cached_user(&self, user: &User) -> Result<(), TokenStoreError>;

    fn clear_cached_user(&self) -> Result<(), TokenStoreError>;

    fn preferred_provider(&self, user_id: &str) -> Result<Option<String>, TokenStoreError>;

    fn set_preferred_provider(&self, user_id: &str, provider: &str)
        -> Result<(), TokenStoreError>;
}
