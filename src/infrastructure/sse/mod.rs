//! SSE Layer - 分块文本流到命名事件
//!
//! - decoder: 帧重组与字段解析
//! - consumer: 读完整个响应体
//! - agent: 写作流水线事件映射

mod agent;
mod consumer;
mod decoder;

pub use agent::{agent_event, DEFAULT_STAGE};
pub use consumer::{consume, decode_stream, SseError};
pub use decoder::{SseDecoder, SseEvent, DEFAULT_EVENT};
