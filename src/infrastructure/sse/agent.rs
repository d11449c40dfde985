//! SSE 事件到流水线事件的映射
//!
//! 服务端字段名不完全统一（`content` / `text` / `chunk`，`message` / `error` / `detail`），
//! 这里兼容几种写法。

use serde_json::Value;

use super::decoder::SseEvent;
use crate::domain::generation::{AgentEvent, StatusUpdate};

/// 未指明阶段时使用的阶段名
pub const DEFAULT_STAGE: &str = "output";

fn first_str<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| data.get(*k).and_then(Value::as_str))
}

fn as_u32(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

/// 数字或字符串形式的 ID
fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn stage_text(event: &SseEvent) -> (String, String) {
    match &event.data {
        Value::Object(_) => (
            first_str(&event.data, &["stage", "agent"])
                .unwrap_or(DEFAULT_STAGE)
                .to_string(),
            first_str(&event.data, &["content", "text", "chunk"])
                .unwrap_or_default()
                .to_string(),
        ),
        Value::String(s) => (DEFAULT_STAGE.to_string(), s.clone()),
        _ => (DEFAULT_STAGE.to_string(), event.raw.clone()),
    }
}

fn status_update(event: &SseEvent) -> StatusUpdate {
    let data = &event.data;

    if first_str(data, &["status", "type"]) == Some("saved") {
        if let Some(chapter_id) = id_string(data.get("chapter_id")) {
            return StatusUpdate::Saved { chapter_id };
        }
    }

    if let Value::String(message) = data {
        return StatusUpdate::Progress {
            stage: None,
            attempt: None,
            max_attempts: None,
            retrying: false,
            message: Some(message.clone()),
        };
    }

    let retrying = data.get("retry").and_then(Value::as_bool).unwrap_or(false)
        || first_str(data, &["status"]) == Some("retrying");

    StatusUpdate::Progress {
        stage: first_str(data, &["stage", "agent"]).map(str::to_string),
        attempt: as_u32(data.get("attempt")),
        max_attempts: as_u32(data.get("max_attempts")),
        retrying,
        message: first_str(data, &["message"]).map(str::to_string),
    }
}

/// 映射一个 SSE 事件
pub fn agent_event(event: SseEvent) -> AgentEvent {
    match event.event.as_str() {
        "status" => AgentEvent::Status(status_update(&event)),
        "chunk" => {
            let (stage, text) = stage_text(&event);
            AgentEvent::Chunk { stage, text }
        }
        "stage_output" => {
            let (stage, text) = stage_text(&event);
            AgentEvent::StageOutput { stage, text }
        }
        "done" => AgentEvent::Done {
            score: event.data.get("score").and_then(Value::as_f64),
        },
        "error" => AgentEvent::Error {
            message: match &event.data {
                Value::String(s) => s.clone(),
                data => first_str(data, &["message", "error", "detail"])
                    .map(str::to_string)
                    .unwrap_or_else(|| event.raw.clone()),
            },
        },
        "cancelled" => AgentEvent::Cancelled,
        _ => AgentEvent::Other {
            event: event.event,
            data: event.raw,
        },
    }
}
