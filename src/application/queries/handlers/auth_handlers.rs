//! Auth Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{AuthPort, PreferenceStorePort, TokenStorePort, User};
use crate::application::queries::{GetCurrentUser, GetPreferredProvider};

/// 当前用户：优先读本地缓存，没有缓存但有令牌时询问后端
pub struct CurrentUserHandler {
    auth: Arc<dyn AuthPort>,
    tokens: Arc<dyn TokenStorePort>,
    preferences: Arc<dyn PreferenceStorePort>,
}

impl CurrentUserHandler {
    pub fn new(
        auth: Arc<dyn AuthPort>,
        tokens: Arc<dyn TokenStorePort>,
        preferences: Arc<dyn PreferenceStorePort>,
    ) -> Self {
        Self {
            auth,
            tokens,
            preferences,
        }
    }

    pub async fn handle(&self, _query: GetCurrentUser) -> Result<Option<User>, ApplicationError> {
        if let Some(user) = self.preferences.cached_user()? {
            return Ok(Some(user));
        }
        if self.tokens.access_token()?.is_none() {
            return Ok(None);
        }

        let user = self.auth.me().await?;
        self.preferences.set_cached_user(&user)?;
        Ok(Some(user))
    }
}

pub struct PreferredProviderHandler {
    preferences: Arc<dyn PreferenceStorePort>,
}

impl PreferredProviderHandler {
    pub fn new(preferences: Arc<dyn PreferenceStorePort>) -> Self {
        Self { preferences }
    }

    /// 未登录或未设置时为 None
    pub fn handle(&self, _query: GetPreferredProvider) -> Result<Option<String>, ApplicationError> {
        match self.preferences.cached_user()? {
            Some(user) => Ok(self.preferences.preferred_provider(&user.id)?),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::HttpMethod;
    use crate::infrastructure::adapters::test_support::fake_client;
    use crate::infrastructure::adapters::HttpAuthApi;
    use crate::infrastructure::memory::InMemoryTokenStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_cached_user_needs_no_request() {
        let (fake, client) = fake_client();
        let store = Arc::new(InMemoryTokenStore::with_tokens("a", "r"));
        let user = User {
            id: "u1".to_string(),
            username: "mira".to_string(),
            email: None,
        };
        store.set_cached_user(&user).unwrap();
        let handler = CurrentUserHandler::new(
            Arc::new(HttpAuthApi::new(client)),
            store.clone(),
            store.clone(),
        );

        assert_eq!(handler.handle(GetCurrentUser).await.unwrap(), Some(user));
        assert_eq!(fake.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_uncached_user_is_fetched_and_cached() {
        let (fake, client) = fake_client();
        fake.push_json(HttpMethod::Get, "/auth/me", 200, json!({"id": "u1", "username": "mira"}));
        let store = Arc::new(InMemoryTokenStore::with_tokens("a", "r"));
        let handler = CurrentUserHandler::new(
            Arc::new(HttpAuthApi::new(client)),
            store.clone(),
            store.clone(),
        );

        let user = handler.handle(GetCurrentUser).await.unwrap().unwrap();

        assert_eq!(user.username, "mira");
        assert_eq!(store.cached_user().unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_logged_out_is_none() {
        let (fake, client) = fake_client();
        let store = Arc::new(InMemoryTokenStore::new());
        let handler = CurrentUserHandler::new(
            Arc::new(HttpAuthApi::new(client)),
            store.clone(),
            store.clone(),
        );

        assert!(handler.handle(GetCurrentUser).await.unwrap().is_none());
        assert!(PreferredProviderHandler::new(store)
            .handle(GetPreferredProvider)
            .unwrap()
            .is_none());
        assert_eq!(fake.total_requests(), 0);
    }
}
