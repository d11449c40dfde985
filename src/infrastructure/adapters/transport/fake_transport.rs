//! Fake Transport - 用于测试的脚本化通道
//!
//! 按 (方法, 路径) 排队预设响应，依次出队；并记录收到的每个请求。
//! 队列耗尽后返回 404。

use async_trait::async_trait;
use futures_util::stream;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::application::ports::{
    HttpMethod, StreamResponse, TransportError, TransportPort, TransportRequest, TransportResponse,
};

/// 预设响应
#[derive(Debug, Clone)]
pub enum FakeReply {
    /// 完整响应
    Body { status: u16, body: Vec<u8> },
    /// 分块响应体
    Chunks { status: u16, chunks: Vec<Vec<u8>> },
    /// 传输层失败
    Fail(TransportError),
}

impl FakeReply {
    pub fn json(status: u16, value: Value) -> Self {
        FakeReply::Body {
            status,
            body: value.to_string().into_bytes(),
        }
    }

    pub fn empty(status: u16) -> Self {
        FakeReply::Body {
            status,
            body: Vec::new(),
        }
    }

    pub fn chunks<I, C>(status: u16, chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        FakeReply::Chunks {
            status,
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    fn into_parts(self) -> Result<(u16, Vec<Vec<u8>>), TransportError> {
        match self {
            FakeReply::Body { status, body } => Ok((status, vec![body])),
            FakeReply::Chunks { status, chunks } => Ok((status, chunks)),
            FakeReply::Fail(err) => Err(err),
        }
    }
}

struct Scripted {
    reply: FakeReply,
    delay: Option<Duration>,
}

#[derive(Default)]
struct FakeState {
    routes: HashMap<(String, String), VecDeque<Scripted>>,
    requests: Vec<TransportRequest>,
}

/// Fake Transport
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key(method: HttpMethod, path: &str) -> (String, String) {
        (method.to_string(), path.to_string())
    }

    /// 为 (方法, 路径) 追加一个响应
    pub fn push(&self, method: HttpMethod, path: &str, reply: FakeReply) -> &Self {
        self.push_delayed(method, path, reply, None)
    }

    /// 追加一个延迟返回的响应
    pub fn push_delayed(
        &self,
        method: HttpMethod,
        path: &str,
        reply: FakeReply,
        delay: Option<Duration>,
    ) -> &Self {
        self.lock()
            .routes
            .entry(Self::key(method, path))
            .or_default()
            .push_back(Scripted { reply, delay });
        self
    }

    pub fn push_json(&self, method: HttpMethod, path: &str, status: u16, value: Value) -> &Self {
        self.push(method, path, FakeReply::json(status, value))
    }

    /// 收到的全部请求（按到达顺序）
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.lock().requests.clone()
    }

    /// 某个 (方法, 路径) 被请求的次数
    pub fn request_count(&self, method: HttpMethod, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn total_requests(&self) -> usize {
        self.lock().requests.len()
    }

    /// 尚未被消费的预设响应数量
    pub fn pending_replies(&self) -> usize {
        self.lock().routes.values().map(VecDeque::len).sum()
    }

    async fn next_reply(&self, request: TransportRequest) -> FakeReply {
        let key = Self::key(request.method, &request.path);
        let scripted = {
            let mut state = self.lock();
            state.requests.push(request);
            state.routes.get_mut(&key).and_then(VecDeque::pop_front)
        };

        match scripted {
            Some(Scripted { reply, delay }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                reply
            }
            None => {
                tracing::debug!(method = %key.0, path = %key.1, "No scripted reply");
                FakeReply::json(404, serde_json::json!({ "detail": "Not Found" }))
            }
        }
    }
}

#[async_trait]
impl TransportPort for FakeTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let (status, chunks) = self.next_reply(request).await.into_parts()?;
        Ok(TransportResponse {
            status,
            body: chunks.concat(),
        })
    }

    async fn open_stream(
        &self,
        request: TransportRequest,
    ) -> Result<StreamResponse, TransportError> {
        let (status, chunks) = self.next_reply(request).await.into_parts()?;
        let body = stream::iter(chunks.into_iter().map(Ok));
        Ok(StreamResponse {
            status,
            body: Box::pin(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use serde_json::json;

    fn get(path: &str) -> TransportRequest {
        TransportRequest {
            method: HttpMethod::Get,
            path: path.to_string(),
            body: None,
            bearer: None,
        }
    }

    #[tokio::test]
    async fn test_replies_are_dequeued_in_order() {
        let fake = FakeTransport::new();
        fake.push_json(HttpMethod::Get, "/a", 200, json!({"n": 1}))
            .push_json(HttpMethod::Get, "/a", 200, json!({"n": 2}));

        let first = fake.send(get("/a")).await.unwrap();
        let second = fake.send(get("/a")).await.unwrap();
        let third = fake.send(get("/a")).await.unwrap();

        assert_eq!(first.body, br#"{"n":1}"#.to_vec());
        assert_eq!(second.body, br#"{"n":2}"#.to_vec());
        assert_eq!(third.status, 404);
        assert_eq!(fake.request_count(HttpMethod::Get, "/a"), 3);
    }

    #[tokio::test]
    async fn test_stream_yields_chunks() {
        let fake = FakeTransport::new();
        fake.push(
            HttpMethod::Post,
            "/s",
            FakeReply::chunks(200, vec!["ab", "cd"]),
        );
        let request = TransportRequest {
            method: HttpMethod::Post,
            ..get("/s")
        };
        let response = fake.open_stream(request).await.unwrap();
        let chunks: Vec<_> = response.body.collect().await;
        assert_eq!(chunks, vec![Ok(b"ab".to_vec()), Ok(b"cd".to_vec())]);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let fake = FakeTransport::new();
        fake.push(HttpMethod::Get, "/x", FakeReply::Fail(TransportError::Timeout));
        assert_eq!(fake.send(get("/x")).await, Err(TransportError::Timeout));
    }
}
