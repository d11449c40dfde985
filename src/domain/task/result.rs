//! 任务结果 - 以 task_type 为标签的联合类型

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::TaskKind;
use crate::domain::novel::{Chapter, Character, TimelineEvent, WorldSetting};

/// 按任务类型解析后的结果
///
/// 形状与类型不符的负载保留为 `Unknown`，调用方仍可读取原始 JSON。
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Outline { outline: String },
    Characters { characters: Vec<Character> },
    WorldSettings { world_settings: Vec<WorldSetting> },
    Timeline { events: Vec<TimelineEvent> },
    Chapters { chapters: Vec<Chapter> },
    Chapter { chapter_id: String, content: String },
    Unknown(Value),
}

/// 列表结果既可能是裸数组，也可能包在对象里
#[derive(Deserialize)]
#[serde(untagged)]
enum ListPayload<T> {
    Bare(Vec<T>),
    Wrapped(Value),
}

fn parse_list<T: DeserializeOwned>(value: &Value, key: &str) -> Option<Vec<T>> {
    match serde_json::from_value::<ListPayload<T>>(value.clone()).ok()? {
        ListPayload::Bare(items) => Some(items),
        ListPayload::Wrapped(obj) => serde_json::from_value(obj.get(key)?.clone()).ok(),
    }
}

impl TaskResult {
    pub fn from_value(kind: &TaskKind, value: Value) -> Self {
        let parsed = match kind {
            TaskKind::Outline => match &value {
                Value::String(s) => Some(TaskResult::Outline { outline: s.clone() }),
                other => other
                    .get("outline")
                    .and_then(Value::as_str)
                    .map(|s| TaskResult::Outline {
                        outline: s.to_string(),
                    }),
            },
            TaskKind::Characters => parse_list(&value, "characters")
                .map(|characters| TaskResult::Characters { characters }),
            TaskKind::WorldSettings => parse_list(&value, "world_settings")
                .map(|world_settings| TaskResult::WorldSettings { world_settings }),
            TaskKind::Timeline => {
                parse_list(&value, "events").map(|events| TaskResult::Timeline { events })
            }
            TaskKind::Chapters => {
                parse_list(&value, "chapters").map(|chapters| TaskResult::Chapters { chapters })
            }
            TaskKind::Chapter => {
                let chapter_id = value.get("chapter_id").and_then(Value::as_str);
                let content = value.get("content").and_then(Value::as_str);
                match (chapter_id, content) {
                    (Some(id), Some(text)) => Some(TaskResult::Chapter {
                        chapter_id: id.to_string(),
                        content: text.to_string(),
                    }),
                    _ => None,
                }
            }
            TaskKind::Other(_) => None,
        };

        parsed.unwrap_or_else(|| {
            if !matches!(kind, TaskKind::Other(_)) {
                tracing::warn!(task_type = %kind.as_str(), "Task result does not match its type");
            }
            TaskResult::Unknown(value)
        })
    }

    pub fn into_value(self) -> Value {
        match self {
            TaskResult::Outline { outline } => json!({ "outline": outline }),
            TaskResult::Characters { characters } => json!({ "characters": characters }),
            TaskResult::WorldSettings { world_settings } => {
                json!({ "world_settings": world_settings })
            }
            TaskResult::Timeline { events } => json!({ "events": events }),
            TaskResult::Chapters { chapters } => json!({ "chapters": chapters }),
            TaskResult::Chapter {
                chapter_id,
                content,
            } => json!({ "chapter_id": chapter_id, "content": content }),
            TaskResult::Unknown(value) => value,
        }
    }
}
