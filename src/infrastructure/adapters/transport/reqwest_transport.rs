//! Reqwest Transport - 真实的 HTTPS 通道
//!
//! 实现 TransportPort trait，所有路径拼接在 base URL 之后
//!
//! 普通请求带整体超时；流式请求只限制连接时间，
//! 响应体可能持续数分钟

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Method, RequestBuilder};
use std::time::Duration;

use crate::application::ports::{
    HttpMethod, StreamResponse, TransportError, TransportPort, TransportRequest, TransportResponse,
};
use crate::config::ApiConfig;

/// Reqwest Transport 配置
#[derive(Debug, Clone)]
pub struct ReqwestTransportConfig {
    /// 后端 API 基础 URL，例如 `http://localhost:8000/api`
    pub base_url: String,
    /// 普通请求超时（秒）
    pub timeout_secs: u64,
    /// 建立连接超时（秒）
    pub connect_timeout_secs: u64,
}

impl Default for ReqwestTransportConfig {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

impl From<&ApiConfig> for ReqwestTransportConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            connect_timeout_secs: config.connect_timeout_secs,
        }
    }
}

/// Reqwest Transport
pub struct ReqwestTransport {
    client: Client,
    config: ReqwestTransportConfig,
}

impl ReqwestTransport {
    pub fn new(config: ReqwestTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn builder(&self, request: &TransportRequest) -> RequestBuilder {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, self.url(&request.path));
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Network(format!("Cannot connect to backend: {}", e))
    } else {
        TransportError::Network(e.to_string())
    }
}

#[async_trait]
impl TransportPort for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            "Sending request"
        );

        let response = self
            .builder(&request)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Body(e.to_string())
                }
            })?
            .to_vec();

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status,
            body_len = body.len(),
            "Response received"
        );

        Ok(TransportResponse { status, body })
    }

    async fn open_stream(
        &self,
        request: TransportRequest,
    ) -> Result<StreamResponse, TransportError> {
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            "Opening stream"
        );

        let response = self
            .builder(&request)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| TransportError::Body(e.to_string()))
            })
            .boxed();

        Ok(StreamResponse { status, body })
    }
}
