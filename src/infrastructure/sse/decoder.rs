//! SSE 帧解码
//!
//! 按原始字节缓冲，在空行（`\n\n`）处切帧，整帧再做 UTF-8 解码，
//! 所以任意切块边界（包括多字节字符中间）都得到相同结果。
//! `\r` 一律丢弃，`\r\n` 行尾因此等价于 `\n`。

use serde_json::Value;

/// 默认事件名
pub const DEFAULT_EVENT: &str = "message";

/// 一个 SSE 事件
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    /// `event:` 字段，缺省为 `message`
    pub event: String,
    /// JSON 解析结果；不是合法 JSON 时为原始字符串
    pub data: Value,
    /// 拼接后的原始 data
    pub raw: String,
}

impl SseEvent {
    /// data 中的字符串字段
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// 增量解码器：单读者、单缓冲
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一个分块，返回其中已完整的事件
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer
            .extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(event) = parse_frame(&String::from_utf8_lossy(&frame[..end])) {
                events.push(event);
            }
        }
        events
    }

    /// 尚未成帧的字节数
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// 流结束：未以空行结尾的尾帧被丢弃
    pub fn finish(self) {
        if !self.buffer.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!(
                pending_bytes = self.buffer.len(),
                "Discarding unterminated SSE frame"
            );
        }
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// 解析一帧；没有 data 行的帧返回 None
fn parse_frame(frame: &str) -> Option<SseEvent> {
    let mut event: Option<&str> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in frame.split('\n') {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value),
            "data" => data_lines.push(value),
            // id / retry 不处理
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    let raw = data_lines.join("\n");
    let data = serde_json::from_str(&raw).unwrap_or_else(|_| Value::String(raw.clone()));
    let event = event
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_EVENT)
        .to_string();

    Some(SseEvent { event, data, raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAYLOAD: &str = concat!(
        "event: status\ndata: {\"stage\":\"planner\",\"attempt\":1}\n\n",
        ": keep-alive\n\n",
        "event: chunk\ndata: {\"stage\":\"writer\",\"content\":\"夜色\"}\n\n",
        "data: plain text\ndata: second line\n\n",
        "event: first\nevent: done\nid: 7\nretry: 1000\ndata: {\"score\": 8.5}\n\n",
    );

    fn decode_in_chunks(bytes: &[u8], sizes: &[usize]) -> Vec<SseEvent> {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        let mut offset = 0;
        let mut i = 0;
        while offset < bytes.len() {
            let size = sizes[i % sizes.len()].max(1);
            let end = (offset + size).min(bytes.len());
            events.extend(decoder.push(&bytes[offset..end]));
            offset = end;
            i += 1;
        }
        events
    }

    #[test]
    fn test_single_chunk_events() {
        let events = decode_in_chunks(PAYLOAD.as_bytes(), &[PAYLOAD.len()]);
        assert_eq!(events.len(), 4);

        assert_eq!(events[0].event, "status");
        assert_eq!(events[0].data, json!({"stage": "planner", "attempt": 1}));

        assert_eq!(events[1].event, "chunk");
        assert_eq!(events[1].str_field("content"), Some("夜色"));

        assert_eq!(events[2].event, DEFAULT_EVENT);
        assert_eq!(events[2].data, Value::String("plain text\nsecond line".to_string()));

        // 多个 event 行，最后一个生效
        assert_eq!(events[3].event, "done");
        assert_eq!(events[3].data, json!({"score": 8.5}));
    }

    #[test]
    fn test_reassembly_is_boundary_insensitive() {
        let bytes = PAYLOAD.as_bytes();
        let expected = decode_in_chunks(bytes, &[bytes.len()]);

        // 包括逐字节切分，会把「夜色」的 UTF-8 序列切开
        for sizes in [
            vec![1],
            vec![2],
            vec![3, 5, 7],
            vec![13],
            vec![64, 1, 1],
        ] {
            assert_eq!(decode_in_chunks(bytes, &sizes), expected, "sizes {:?}", sizes);
        }
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event: done\r\ndata: {\"score\":1}\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "done");
        assert_eq!(events[0].data, json!({"score": 1}));
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: x\r").is_empty());
        assert!(decoder.push(b"\n\r").is_empty());
        let events = decoder.push(b"\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].raw, "x");
    }

    #[test]
    fn test_frames_without_data_are_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event: ping\n\n: comment\n\n");
        assert!(events.is_empty());
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_data_without_space_and_empty_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data:{\"a\":1}\n\ndata:\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, json!({"a": 1}));
        assert_eq!(events[1].raw, "");
        assert_eq!(events[1].data, Value::String(String::new()));
    }

    #[test]
    fn test_trailing_partial_frame_is_kept_until_finish() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: done\ndata: {}").is_empty());
        assert!(decoder.pending_len() > 0);
        decoder.finish();
    }
}
