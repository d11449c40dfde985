//! SSE 流消费
//!
//! 读到底层流结束为止，不合成终止事件；
//! 调用方依赖服务端显式发送的 `done` / `error` / `cancelled`。

use futures_util::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use thiserror::Error;

use super::decoder::{SseDecoder, SseEvent};
use crate::application::ports::{ApiError, ByteStream, TransportError};

/// SSE 消费错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SseError {
    #[error("Stream interrupted: {0}")]
    Transport(#[from] TransportError),
}

impl From<SseError> for ApiError {
    fn from(err: SseError) -> Self {
        match err {
            SseError::Transport(e) => ApiError::Transport(e),
        }
    }
}

/// 逐个回调事件直到流结束，返回事件数
pub async fn consume<F>(mut body: ByteStream, mut on_event: F) -> Result<usize, SseError>
where
    F: FnMut(SseEvent),
{
    let mut decoder = SseDecoder::new();
    let mut count = 0;

    while let Some(chunk) = body.next().await {
        for event in decoder.push(&chunk?) {
            count += 1;
            on_event(event);
        }
    }

    decoder.finish();
    tracing::debug!(events = count, "SSE stream ended");
    Ok(count)
}

/// 把字节流转换为事件流；传输错误作为最后一项产出
pub fn decode_stream(body: ByteStream) -> impl Stream<Item = Result<SseEvent, SseError>> + Send {
    let initial = Some((body, SseDecoder::new(), VecDeque::new()));

    stream::unfold(initial, |state| async move {
        let (mut body, mut decoder, mut pending): (ByteStream, SseDecoder, VecDeque<SseEvent>) =
            state?;
        loop {
            if let Some(event) = pending.pop_front() {
                return Some((Ok(event), Some((body, decoder, pending))));
            }
            match body.next().await {
                Some(Ok(chunk)) => pending.extend(decoder.push(&chunk)),
                Some(Err(e)) => return Some((Err(SseError::from(e)), None)),
                None => {
                    decoder.finish();
                    return None;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(chunks: Vec<Result<&'static str, TransportError>>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|c| c.map(|s| s.as_bytes().to_vec())),
        ))
    }

    #[tokio::test]
    async fn test_consume_invokes_callback_per_event() {
        let body = body_of(vec![
            Ok("event: chunk\ndata: {\"content\":\"a\"}\n"),
            Ok("\nevent: done\ndata: {}\n\n"),
        ]);
        let mut names = Vec::new();

        let count = consume(body, |e| names.push(e.event)).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(names, vec!["chunk", "done"]);
    }

    #[tokio::test]
    async fn test_consume_ends_without_synthetic_event() {
        let body = body_of(vec![Ok("event: chunk\ndata: x\n\nevent: done\ndata: {}")]);
        let mut names = Vec::new();

        consume(body, |e| names.push(e.event)).await.unwrap();

        assert_eq!(names, vec!["chunk"]);
    }

    #[tokio::test]
    async fn test_consume_surfaces_transport_error() {
        let body = body_of(vec![
            Ok("data: 1\n\n"),
            Err(TransportError::Body("reset".to_string())),
        ]);
        let mut seen = 0;

        let result = consume(body, |_| seen += 1).await;

        assert_eq!(seen, 1);
        assert_eq!(result, Err(SseError::Transport(TransportError::Body("reset".to_string()))));
    }

    #[tokio::test]
    async fn test_decode_stream_yields_events_then_ends() {
        let body = body_of(vec![Ok("data: 1\n\nda"), Ok("ta: 2\n\n")]);

        let events: Vec<_> = decode_stream(body).collect().await;

        let raws: Vec<_> = events.into_iter().map(|e| e.unwrap().raw).collect();
        assert_eq!(raws, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_decode_stream_error_is_last_item() {
        let body = body_of(vec![Ok("data: 1\n\n"), Err(TransportError::Timeout), Ok("data: 2\n\n")]);

        let events: Vec<_> = decode_stream(body).collect().await;

        assert_eq!(events.len(), 2);
        assert!(events[1].is_err());
    }
}
