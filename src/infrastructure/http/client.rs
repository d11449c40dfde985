//! Api Client - 通用请求客户端
//!
//! - 有 access token 时注入 `Authorization: Bearer`
//! - 401 且允许重试时：刷新一次，用新令牌重发一次
//! - 非 2xx 解析结构化错误体
//! - 204 / 空响应体是合法的空结果
//! - 其他失败不重试

use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::error_body::status_error;
use super::refresh::RefreshCoordinator;
use crate::application::ports::{
    ApiError, ByteStream, HttpMethod, TokenStorePort, TransportPort, TransportRequest,
};

/// 方法 + 可选 JSON 请求体
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: HttpMethod::Get,
            body: None,
        }
    }

    pub fn delete() -> Self {
        Self {
            method: HttpMethod::Delete,
            body: None,
        }
    }

    pub fn with_method(method: HttpMethod) -> Self {
        Self { method, body: None }
    }

    /// 附带 JSON 请求体
    pub fn json<B: Serialize + ?Sized>(method: HttpMethod, body: &B) -> Result<Self, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(Self {
            method,
            body: Some(body),
        })
    }
}

/// 解码响应体；空体按 JSON `null` 解码，于是 `()`、`Option<T>`、`Value` 都能接受
pub(crate) fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(Value::Null).map_err(|e| ApiError::Decode(e.to_string()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Api Client
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn TransportPort>,
    tokens: Arc<dyn TokenStorePort>,
    refresher: Arc<RefreshCoordinator>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn TransportPort>, refresher: Arc<RefreshCoordinator>) -> Self {
        Self {
            transport,
            tokens: refresher.tokens().clone(),
            refresher,
        }
    }

    pub fn transport(&self) -> &Arc<dyn TransportPort> {
        &self.transport
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStorePort> {
        &self.tokens
    }

    pub fn refresher(&self) -> &Arc<RefreshCoordinator> {
        &self.refresher
    }

    /// 401 之后取得重发用的令牌
    ///
    /// 存储中的令牌已不是发出去的那个：别的请求已经刷新过（直接用新的）
    /// 或会话已经过期（不再重复刷新和回调）
    async fn renew_bearer(&self, sent: Option<&str>) -> Result<String, ApiError> {
        match (self.tokens.access_token()?, sent) {
            (Some(current), Some(sent)) if current != sent => {
                tracing::debug!("Access token already renewed, retrying with it");
                Ok(current)
            }
            (None, Some(_)) => Err(ApiError::SessionExpired),
            _ => self.refresher.refresh().await,
        }
    }

    /// 通用请求
    ///
    /// 重试对调用方透明：重试成功与首次成功无法区分
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
        retry_on_401: bool,
    ) -> Result<T, ApiError> {
        let mut retry = retry_on_401;
        let mut bearer = self.tokens.access_token()?;

        loop {
            let response = self
                .transport
                .send(TransportRequest {
                    method: options.method,
                    path: endpoint.to_string(),
                    body: options.body.clone(),
                    bearer: bearer.clone(),
                })
                .await?;

            if response.status == 401 && retry {
                retry = false;
                tracing::debug!(
                    method = %options.method,
                    path = %endpoint,
                    "Unauthorized, refreshing access token"
                );
                bearer = Some(self.renew_bearer(bearer.as_deref()).await?);
                continue;
            }

            if !response.is_success() {
                let err = status_error(response.status, &response.body);
                tracing::debug!(
                    method = %options.method,
                    path = %endpoint,
                    status = response.status,
                    error = %err,
                    "Request failed"
                );
                return Err(err);
            }

            return decode_body(&response.body);
        }
    }

    /// 打开流式响应，鉴权和 401 语义与 `request` 相同
    pub async fn stream(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ByteStream, ApiError> {
        let mut retry = true;
        let mut bearer = self.tokens.access_token()?;

        loop {
            let response = self
                .transport
                .open_stream(TransportRequest {
                    method: options.method,
                    path: endpoint.to_string(),
                    body: options.body.clone(),
                    bearer: bearer.clone(),
                })
                .await?;

            if response.status == 401 && retry {
                retry = false;
                tracing::debug!(path = %endpoint, "Stream unauthorized, refreshing access token");
                bearer = Some(self.renew_bearer(bearer.as_deref()).await?);
                continue;
            }

            if !response.is_success() {
                let status = response.status;
                let body = read_to_end(response.body).await?;
                return Err(status_error(status, &body));
            }

            tracing::debug!(path = %endpoint, "Stream opened");
            return Ok(response.body);
        }
    }

    // ------------------------------------------------------------------
    // 便捷方法（均允许 401 重试）
    // ------------------------------------------------------------------

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(endpoint, RequestOptions::get(), true).await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(endpoint, RequestOptions::json(HttpMethod::Post, body)?, true)
            .await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(endpoint, RequestOptions::json(HttpMethod::Put, body)?, true)
            .await
    }

    pub async fn patch<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(endpoint, RequestOptions::json(HttpMethod::Patch, body)?, true)
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<(), ApiError> {
        // 有的接口删除后返回被删记录，忽略
        let _: Value = self.request(endpoint, RequestOptions::delete(), true).await?;
        Ok(())
    }
}

async fn read_to_end(mut body: ByteStream) -> Result<Vec<u8>, ApiError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = body.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TransportError;
    use crate::infrastructure::adapters::{FakeReply, FakeTransport};
    use crate::infrastructure::http::REFRESH_PATH;
    use crate::infrastructure::memory::InMemoryTokenStore;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    fn client_with(fake: &FakeTransport, tokens: Arc<InMemoryTokenStore>) -> ApiClient {
        let transport: Arc<dyn TransportPort> = Arc::new(fake.clone());
        let refresher = Arc::new(RefreshCoordinator::new(transport.clone(), tokens));
        ApiClient::new(transport, refresher)
    }

    #[tokio::test]
    async fn test_bearer_injected_when_token_present() {
        let fake = FakeTransport::new();
        fake.push_json(HttpMethod::Get, "/novels/n1", 200, json!({"id": "n1"}));
        let client = client_with(&fake, Arc::new(InMemoryTokenStore::with_tokens("tok", "ref")));

        let item: Item = client.get("/novels/n1").await.unwrap();

        assert_eq!(item, Item { id: "n1".to_string() });
        assert_eq!(fake.requests()[0].bearer.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_no_bearer_without_token() {
        let fake = FakeTransport::new();
        fake.push_json(HttpMethod::Get, "/health", 200, json!({}));
        let client = client_with(&fake, Arc::new(InMemoryTokenStore::new()));

        let _: Value = client.get("/health").await.unwrap();

        assert_eq!(fake.requests()[0].bearer, None);
    }

    #[tokio::test]
    async fn test_401_refresh_and_retry_is_transparent() {
        let fake = FakeTransport::new();
        fake.push_json(HttpMethod::Get, "/novels", 401, json!({"detail": "token expired"}))
            .push_json(
                HttpMethod::Post,
                REFRESH_PATH,
                200,
                json!({"access_token": "fresh", "refresh_token": "r2"}),
            )
            .push_json(HttpMethod::Get, "/novels", 200, json!([{"id": "n1"}]));
        let client = client_with(&fake, Arc::new(InMemoryTokenStore::with_tokens("stale", "r1")));

        let items: Vec<Item> = client.get("/novels").await.unwrap();

        assert_eq!(items, vec![Item { id: "n1".to_string() }]);
        let requests = fake.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].bearer.as_deref(), Some("stale"));
        assert_eq!(requests[2].bearer.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_401_with_failed_refresh_is_session_expired() {
        let fake = FakeTransport::new();
        fake.push_json(HttpMethod::Get, "/novels", 401, json!({"detail": "token expired"}))
            .push_json(HttpMethod::Post, REFRESH_PATH, 401, json!({"detail": "invalid"}));
        let tokens = Arc::new(InMemoryTokenStore::with_tokens("stale", "r1"));
        let client = client_with(&fake, tokens.clone());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        client.refresher().on_session_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let result: Result<Vec<Item>, _> = client.get("/novels").await;

        assert_eq!(result, Err(ApiError::SessionExpired));
        assert_eq!(result.unwrap_err().to_string(), "session expired");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.access_token().unwrap(), None);
        assert_eq!(tokens.refresh_token().unwrap(), None);
        assert_eq!(fake.request_count(HttpMethod::Get, "/novels"), 1);
    }

    #[tokio::test]
    async fn test_late_401_reuses_token_renewed_by_another_request() {
        let fake = FakeTransport::new();
        // 两个请求都带着旧令牌发出，401 先后到达
        fake.push_delayed(
            HttpMethod::Get,
            "/a",
            FakeReply::json(401, json!({})),
            Some(Duration::from_millis(10)),
        )
        .push_delayed(
            HttpMethod::Get,
            "/b",
            FakeReply::json(401, json!({})),
            Some(Duration::from_millis(100)),
        )
        .push_json(
            HttpMethod::Post,
            REFRESH_PATH,
            200,
            json!({"access_token": "fresh", "refresh_token": "r2"}),
        )
        .push_json(HttpMethod::Get, "/a", 200, json!({"id": "a"}))
        .push_json(HttpMethod::Get, "/b", 200, json!({"id": "b"}));
        let client = client_with(&fake, Arc::new(InMemoryTokenStore::with_tokens("stale", "r1")));

        let (a, b) = tokio::join!(client.get::<Item>("/a"), client.get::<Item>("/b"));

        assert_eq!(a.unwrap().id, "a");
        assert_eq!(b.unwrap().id, "b");
        assert_eq!(fake.request_count(HttpMethod::Post, REFRESH_PATH), 1);
        let retried_b = fake
            .requests()
            .into_iter()
            .filter(|r| r.path == "/b")
            .last()
            .unwrap();
        assert_eq!(retried_b.bearer.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_late_401_after_expiry_fires_callback_once() {
        let fake = FakeTransport::new();
        fake.push_delayed(
            HttpMethod::Get,
            "/a",
            FakeReply::json(401, json!({})),
            Some(Duration::from_millis(10)),
        )
        .push_delayed(
            HttpMethod::Get,
            "/b",
            FakeReply::json(401, json!({})),
            Some(Duration::from_millis(100)),
        )
        .push_json(HttpMethod::Post, REFRESH_PATH, 401, json!({"detail": "invalid"}));
        let client = client_with(&fake, Arc::new(InMemoryTokenStore::with_tokens("stale", "r1")));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        client.refresher().on_session_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let (a, b) = tokio::join!(client.get::<Value>("/a"), client.get::<Value>("/b"));

        assert_eq!(a, Err(ApiError::SessionExpired));
        assert_eq!(b, Err(ApiError::SessionExpired));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(fake.request_count(HttpMethod::Post, REFRESH_PATH), 1);
        assert_eq!(fake.request_count(HttpMethod::Get, "/b"), 1);
    }

    #[tokio::test]
    async fn test_retry_only_once() {
        let fake = FakeTransport::new();
        fake.push_json(HttpMethod::Get, "/me", 401, json!({}))
            .push_json(
                HttpMethod::Post,
                REFRESH_PATH,
                200,
                json!({"access_token": "a2", "refresh_token": "r2"}),
            )
            .push_json(HttpMethod::Get, "/me", 401, json!({"detail": "still no"}));
        let client = client_with(&fake, Arc::new(InMemoryTokenStore::with_tokens("a1", "r1")));

        let result: Result<Value, _> = client.get("/me").await;

        assert_eq!(
            result,
            Err(ApiError::Status {
                status: 401,
                message: "still no".to_string()
            })
        );
        assert_eq!(fake.request_count(HttpMethod::Post, REFRESH_PATH), 1);
    }

    #[tokio::test]
    async fn test_401_without_retry_flag_surfaces() {
        let fake = FakeTransport::new();
        fake.push_json(HttpMethod::Post, "/auth/login", 401, json!({"detail": "bad credentials"}));
        let client = client_with(&fake, Arc::new(InMemoryTokenStore::new()));

        let result: Result<Value, _> = client
            .request(
                "/auth/login",
                RequestOptions::json(HttpMethod::Post, &json!({"username": "u"})).unwrap(),
                false,
            )
            .await;

        assert_eq!(result.unwrap_err().to_string(), "bad credentials");
        assert_eq!(fake.total_requests(), 1);
    }

    #[tokio::test]
    async fn test_no_retry_on_other_failures() {
        let fake = FakeTransport::new();
        fake.push_json(HttpMethod::Get, "/novels", 500, json!({"message": "db down"}))
            .push(
                HttpMethod::Get,
                "/tasks/t1",
                FakeReply::Fail(TransportError::Network("connection reset".to_string())),
            );
        let client = client_with(&fake, Arc::new(InMemoryTokenStore::with_tokens("a", "r")));

        let err = client.get::<Value>("/novels").await.unwrap_err();
        assert_eq!(err.to_string(), "db down");
        let err = client.get::<Value>("/tasks/t1").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::Network(_))));
        assert_eq!(fake.total_requests(), 2);
    }

    #[tokio::test]
    async fn test_204_is_valid_empty_result() {
        let fake = FakeTransport::new();
        fake.push(HttpMethod::Delete, "/novels/n1", FakeReply::empty(204))
            .push(HttpMethod::Get, "/maybe", FakeReply::empty(204));
        let client = client_with(&fake, Arc::new(InMemoryTokenStore::with_tokens("a", "r")));

        client.delete("/novels/n1").await.unwrap();
        let maybe: Option<Item> = client.get("/maybe").await.unwrap();
        assert_eq!(maybe, None);
    }

    #[tokio::test]
    async fn test_stream_error_body_is_parsed() {
        let fake = FakeTransport::new();
        fake.push(
            HttpMethod::Post,
            "/stream",
            FakeReply::chunks(409, vec![r#"{"detail":"#, r#""chapter locked"}"#]),
        );
        let client = client_with(&fake, Arc::new(InMemoryTokenStore::with_tokens("a", "r")));

        let err = client
            .stream("/stream", RequestOptions::with_method(HttpMethod::Post))
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "chapter locked");
    }
}
