//! Sled-based Local Store Implementation
//!
//! 客户端唯一落盘的状态：令牌对、缓存的当前用户、按用户的首选 AI 提供方。
//! 不缓存任何作品内容。

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::sync::Arc;

use crate::application::ports::{
    PreferenceStorePort, TokenPair, TokenStoreError, TokenStorePort, User,
};

const TOKENS_KEY: &str = "auth:tokens";
const USER_KEY: &str = "auth:user";
const PROVIDER_PREFIX: &str = "pref:provider:";

/// Sled 本地存储配置
#[derive(Debug, Clone)]
pub struct SledStoreConfig {
    /// 数据库路径
    pub db_path: String,
}

impl Default for SledStoreConfig {
    fn default() -> Self {
        Self {
            db_path: "data/client/state.sled".to_string(),
        }
    }
}

/// 带写入时间的存储条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    stored_at: i64,
}

/// Sled 本地存储
pub struct SledLocalStore {
    db: Db,
}

impl SledLocalStore {
    pub fn new(config: &SledStoreConfig) -> Result<Self, TokenStoreError> {
        let db = sled::open(&config.db_path)
            .map_err(|e| TokenStoreError::DatabaseError(e.to_string()))?;

        tracing::info!(
            db_path = %config.db_path,
            entries = db.len(),
            "SledLocalStore initialized"
        );

        Ok(Self { db })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TokenStoreError> {
        let config = SledStoreConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
        };
        Self::new(&config)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), TokenStoreError> {
        self.db
            .flush()
            .map_err(|e| TokenStoreError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, TokenStoreError> {
        let Some(bytes) = self
            .db
            .get(key)
            .map_err(|e| TokenStoreError::DatabaseError(e.to_string()))?
        else {
            return Ok(None);
        };

        let entry: StoredEntry<T> = bincode::deserialize(&bytes)
            .map_err(|e| TokenStoreError::SerializationError(e.to_string()))?;
        Ok(Some(entry.value))
    }

    fn put<T: Serialize>(&self, key: &str, value: T) -> Result<(), TokenStoreError> {
        let entry = StoredEntry {
            value,
            stored_at: Utc::now().timestamp(),
        };
        let bytes = bincode::serialize(&entry)
            .map_err(|e| TokenStoreError::SerializationError(e.to_string()))?;

        self.db
            .insert(key, bytes)
            .map_err(|e| TokenStoreError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TokenStoreError> {
        self.db
            .remove(key)
            .map_err(|e| TokenStoreError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    fn provider_key(user_id: &str) -> String {
        format!("{}{}", PROVIDER_PREFIX, user_id)
    }
}

impl TokenStorePort for SledLocalStore {
    fn access_token(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.get::<TokenPair>(TOKENS_KEY)?.map(|p| p.access_token))
    }

    fn refresh_token(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.get::<TokenPair>(TOKENS_KEY)?.map(|p| p.refresh_token))
    }

    fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), TokenStoreError> {
        self.put(
            TOKENS_KEY,
            TokenPair {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
            },
        )?;
        tracing::debug!("Tokens stored");
        Ok(())
    }

    fn clear_tokens(&self) -> Result<(), TokenStoreError> {
        self.remove(TOKENS_KEY)?;
        tracing::debug!("Tokens cleared");
        Ok(())
    }
}

impl PreferenceStorePort for SledLocalStore {
    fn cached_user(&self) -> Result<Option<User>, TokenStoreError> {
        self.get(USER_KEY)
    }

    fn set_cached_user(&self, user: &User) -> Result<(), TokenStoreError> {
        self.put(USER_KEY, user)
    }

    fn clear_cached_user(&self) -> Result<(), TokenStoreError> {
        self.remove(USER_KEY)
    }

    fn preferred_provider(&self, user_id: &str) -> Result<Option<String>, TokenStoreError> {
        self.get(&Self::provider_key(user_id))
    }

    fn set_preferred_provider(&self, user_id: &str, provider: &str) -> Result<(), TokenStoreError> {
        self.put(&Self::provider_key(user_id), provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (SledLocalStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SledLocalStore::open(temp_dir.path().join("state.sled")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_tokens_round_trip_and_clear() {
        let (store, _temp) = create_test_store();
        assert_eq!(store.access_token().unwrap(), None);

        store.set_tokens("access-1", "refresh-1").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("access-1"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("refresh-1"));

        store.clear_tokens().unwrap();
        assert_eq!(store.access_token().unwrap(), None);
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.sled");
        let user = User {
            id: "u1".to_string(),
            username: "writer".to_string(),
            email: Some("writer@example.com".to_string()),
        };

        {
            let store = SledLocalStore::open(&path).unwrap();
            store.set_tokens("a", "r").unwrap();
            store.set_cached_user(&user).unwrap();
            store.set_preferred_provider("u1", "openai").unwrap();
            store.flush().unwrap();
        }

        let store = SledLocalStore::open(&path).unwrap();
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("r"));
        assert_eq!(store.cached_user().unwrap(), Some(user));
        assert_eq!(store.preferred_provider("u1").unwrap().as_deref(), Some("openai"));
        assert_eq!(store.preferred_provider("u2").unwrap(), None);
    }

    #[test]
    fn test_clear_cached_user() {
        let (store, _temp) = create_test_store();
        let user = User {
            id: "u1".to_string(),
            username: "writer".to_string(),
            email: None,
        };
        store.set_cached_user(&user).unwrap();
        store.clear_cached_user().unwrap();
        assert_eq!(store.cached_user().unwrap(), None);
    }
}
