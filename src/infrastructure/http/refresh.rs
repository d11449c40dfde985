//! Refresh Coordinator - 单槽记忆化的令牌刷新
//!
//! 第一个需要刷新的调用方创建共享 future，并发的调用方等待同一个；
//! future 完成后清空槽位。失败时的副作用（清除凭据、回调、事件）
//! 在共享 future 内部执行，因此每次刷新只发生一次。

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use super::client::decode_body;
use super::error_body::status_error;
use crate::application::ports::{
    ApiError, ClientEvent, EventSinkPort, HttpMethod, PreferenceStorePort, TokenPair,
    TokenStorePort, TransportPort, TransportRequest,
};

/// 刷新接口路径
pub const REFRESH_PATH: &str = "/auth/refresh";

/// 会话过期回调
pub type SessionExpiredCallback = Arc<dyn Fn() + Send + Sync>;

type SharedRefresh = Shared<BoxFuture<'static, Result<String, ApiError>>>;

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// 用 refresh token 换取新令牌对；不带 bearer，不重试
pub async fn exchange_refresh_token(
    transport: &dyn TransportPort,
    refresh_token: &str,
) -> Result<TokenPair, ApiError> {
    let body = serde_json::to_value(RefreshRequest { refresh_token })
        .map_err(|e| ApiError::Decode(e.to_string()))?;
    let response = transport
        .send(TransportRequest {
            method: HttpMethod::Post,
            path: REFRESH_PATH.to_string(),
            body: Some(body),
            bearer: None,
        })
        .await?;

    if !response.is_success() {
        return Err(status_error(response.status, &response.body));
    }
    decode_body(&response.body)
}

/// 刷新 future 需要的全部依赖（'static）
#[derive(Clone)]
struct RefreshContext {
    transport: Arc<dyn TransportPort>,
    tokens: Arc<dyn TokenStorePort>,
    preferences: Option<Arc<dyn PreferenceStorePort>>,
    events: Option<Arc<dyn EventSinkPort>>,
    on_expired: Arc<Mutex<Option<SessionExpiredCallback>>>,
}

impl RefreshContext {
    async fn run(self) -> Result<String, ApiError> {
        match self.try_refresh().await {
            Ok(access_token) => {
                tracing::info!("Access token refreshed");
                Ok(access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, session expired");
                self.expire();
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn try_refresh(&self) -> Result<String, ApiError> {
        let refresh_token = self
            .tokens
            .refresh_token()?
            .ok_or(ApiError::SessionExpired)?;

        let pair = exchange_refresh_token(self.transport.as_ref(), &refresh_token).await?;
        self.tokens
            .set_tokens(&pair.access_token, &pair.refresh_token)?;
        Ok(pair.access_token)
    }

    fn expire(&self) {
        if let Err(e) = self.tokens.clear_tokens() {
            tracing::error!(error = %e, "Failed to clear tokens");
        }
        if let Some(preferences) = &self.preferences {
            if let Err(e) = preferences.clear_cached_user() {
                tracing::error!(error = %e, "Failed to clear cached user");
            }
        }

        let callback = self
            .on_expired
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback();
        }

        if let Some(events) = &self.events {
            events.publish(ClientEvent::SessionExpired);
        }
    }
}

/// Refresh Coordinator
pub struct RefreshCoordinator {
    context: RefreshContext,
    slot: Mutex<Option<SharedRefresh>>,
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<dyn TransportPort>, tokens: Arc<dyn TokenStorePort>) -> Self {
        Self {
            context: RefreshContext {
                transport,
                tokens,
                preferences: None,
                events: None,
                on_expired: Arc::new(Mutex::new(None)),
            },
            slot: Mutex::new(None),
        }
    }

    /// 刷新失败时一并清除缓存的用户
    pub fn with_preferences(mut self, preferences: Arc<dyn PreferenceStorePort>) -> Self {
        self.context.preferences = Some(preferences);
        self
    }

    /// 刷新失败时发布 `SessionExpired` 事件
    pub fn with_events(mut self, events: Arc<dyn EventSinkPort>) -> Self {
        self.context.events = Some(events);
        self
    }

    /// 注册会话过期回调（替换之前的）
    pub fn on_session_expired<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self
            .context
            .on_expired
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(callback));
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStorePort> {
        &self.context.tokens
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<SharedRefresh>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 是否有进行中的刷新
    pub fn is_refreshing(&self) -> bool {
        self.lock_slot().is_some()
    }

    /// 刷新 access token；并发调用共享同一次刷新
    ///
    /// 失败时返回 `ApiError::SessionExpired`
    pub async fn refresh(&self) -> Result<String, ApiError> {
        let shared = {
            let mut slot = self.lock_slot();
            match slot.as_ref() {
                Some(existing) => {
                    tracing::debug!("Joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    let future = self.context.clone().run().boxed().shared();
                    *slot = Some(future.clone());
                    future
                }
            }
        };

        let result = shared.clone().await;

        let mut slot = self.lock_slot();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&shared)) {
            *slot = None;
        }
        result
    }
}
