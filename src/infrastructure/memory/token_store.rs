//! In-Memory Token Store Implementation
//!
//! 进程内的凭据与偏好，用于测试和不落盘的临时会话

use dashmap::DashMap;
use std::sync::{Arc, RwLock};

use crate::application::ports::{
    PreferenceStorePort, TokenPair, TokenStoreError, TokenStorePort, User,
};

/// 内存令牌存储
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<Option<TokenPair>>,
    user: RwLock<Option<User>>,
    /// user_id -> provider
    providers: DashMap<String, String>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access_token: &str, refresh_token: &str) -> Self {
        let store = Self::new();
        *store.tokens.write().unwrap_or_else(|e| e.into_inner()) = Some(TokenPair {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        });
        store
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn read_tokens(&self) -> Option<TokenPair> {
        self.tokens.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl TokenStorePort for InMemoryTokenStore {
    fn access_token(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.read_tokens().map(|p| p.access_token))
    }

    fn refresh_token(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.read_tokens().map(|p| p.refresh_token))
    }

    fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), TokenStoreError> {
        *self.tokens.write().unwrap_or_else(|e| e.into_inner()) = Some(TokenPair {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        });
        Ok(())
    }

    fn clear_tokens(&self) -> Result<(), TokenStoreError> {
        *self.tokens.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

impl PreferenceStorePort for InMemoryTokenStore {
    fn cached_user(&self) -> Result<Option<User>, TokenStoreError> {
        Ok(self.user.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn set_cached_user(&self, user: &User) -> Result<(), TokenStoreError> {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user.clone());
        Ok(())
    }

    fn clear_cached_user(&self) -> Result<(), TokenStoreError> {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }

    fn preferred_provider(&self, user_id: &str) -> Result<Option<String>, TokenStoreError> {
        Ok(self.providers.get(user_id).map(|p| p.value().clone()))
    }

    fn set_preferred_provider(&self, user_id: &str, provider: &str) -> Result<(), TokenStoreError> {
        self.providers
            .insert(user_id.to_string(), provider.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear_tokens() {
        let store = InMemoryTokenStore::new();
        assert_eq!(store.access_token().unwrap(), None);

        store.set_tokens("a", "r").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("a"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("r"));

        store.clear_tokens().unwrap();
        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_provider_is_per_user() {
        let store = InMemoryTokenStore::new();
        store.set_preferred_provider("u1", "openai").unwrap();
        store.set_preferred_provider("u2", "deepseek").unwrap();

        assert_eq!(store.preferred_provider("u1").unwrap().as_deref(), Some("openai"));
        assert_eq!(store.preferred_provider("u2").unwrap().as_deref(), Some("deepseek"));
        assert_eq!(store.preferred_provider("u3").unwrap(), None);
    }
}
