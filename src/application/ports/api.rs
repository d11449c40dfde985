//! Transport Port - 与后端的 HTTP 通道
//!
//! 定义请求/响应的抽象，具体实现在 infrastructure/adapters/transport 层
//! （reqwest 实现 + 测试用的脚本化实现）

use async_trait::async_trait;
use futures_util::stream::Stream;
use serde_json::Value;
use std::fmt;
use std::pin::Pin;
use thiserror::Error;

/// 传输层错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Failed to read body: {0}")]
    Body(String),
}

/// 面向调用方的请求错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// 非 2xx 响应，message 来自服务端或通用文案
    #[error("{message}")]
    Status { status: u16, message: String },

    /// 刷新失败，需要重新登录
    #[error("session expired")]
    SessionExpired,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Local store error: {0}")]
    Store(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// 发往后端的请求
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    /// 相对 base URL 的路径，以 `/` 开头
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

/// 已完整读取的响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 分块读取的响应体
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// 流式响应；非 2xx 时调用方自行读取 body 解析错误
pub struct StreamResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl StreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Transport Port
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// 发送请求并读完响应体
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    /// 发送请求，响应体以字节流返回
    async fn open_stream(&self, request: TransportRequest)
        -> Result<StreamResponse, TransportError>;
}
