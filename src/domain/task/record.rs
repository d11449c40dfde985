//! Task 记录与状态机

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TaskResult;
use crate::domain::timestamp;

/// 任务状态
///
/// `pending -> running -> {completed | failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    #[serde(alias = "processing")]
    Running,
    #[serde(alias = "success", alias = "succeeded")]
    Completed,
    #[serde(alias = "error", alias = "cancelled")]
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// 任务类型，决定 `result` 的形状
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    Outline,
    Characters,
    WorldSettings,
    Timeline,
    Chapters,
    Chapter,
    Other(String),
}

impl TaskKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "outline" | "generate_outline" => TaskKind::Outline,
            "characters" | "generate_characters" => TaskKind::Characters,
            "world_settings" | "generate_world_settings" => TaskKind::WorldSettings,
            "timeline" | "generate_timeline" => TaskKind::Timeline,
            "chapters" | "generate_chapters" => TaskKind::Chapters,
            "chapter" | "write_chapter" => TaskKind::Chapter,
            other => TaskKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskKind::Outline => "outline",
            TaskKind::Characters => "characters",
            TaskKind::WorldSettings => "world_settings",
            TaskKind::Timeline => "timeline",
            TaskKind::Chapters => "chapters",
            TaskKind::Chapter => "chapter",
            TaskKind::Other(raw) => raw,
        }
    }
}

/// 后端任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TaskWire", into = "TaskWire")]
pub struct Task {
    pub id: String,
    pub novel_id: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    /// 0–100
    pub progress: u8,
    pub progress_message: Option<String>,
    pub result: Option<TaskResult>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// 轮询失败时合成的失败记录
    pub fn synthesized_failure(task_id: &str, message: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: task_id.to_string(),
            novel_id: String::new(),
            kind: TaskKind::Other("unknown".to_string()),
            status: TaskStatus::Failed,
            progress: 0,
            progress_message: None,
            result: None,
            error_message: Some(message.into()),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: Some(now),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 失败原因，没有服务端消息时给出通用文案
    pub fn failure_message(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| format!("task {} failed", self.id))
    }
}

/// 线上格式
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskWire {
    id: String,
    #[serde(default)]
    novel_id: String,
    #[serde(default)]
    task_type: String,
    status: TaskStatus,
    #[serde(default)]
    progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    progress_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional", skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional", skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

impl From<TaskWire> for Task {
    fn from(wire: TaskWire) -> Self {
        let kind = TaskKind::parse(&wire.task_type);
        let result = wire
            .result
            .filter(|v| !v.is_null())
            .map(|v| TaskResult::from_value(&kind, v));
        let created_at = wire.created_at.unwrap_or_else(Utc::now);
        Self {
            id: wire.id,
            novel_id: wire.novel_id,
            kind,
            status: wire.status,
            progress: wire.progress.clamp(0.0, 100.0).round() as u8,
            progress_message: wire.progress_message,
            result,
            error_message: wire.error_message,
            created_at,
            updated_at: wire.updated_at.unwrap_or(created_at),
            started_at: wire.started_at,
            completed_at: wire.completed_at,
        }
    }
}

impl From<Task> for TaskWire {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            novel_id: task.novel_id,
            task_type: task.kind.as_str().to_string(),
            status: task.status,
            progress: f64::from(task.progress),
            progress_message: task.progress_message,
            result: task.result.map(TaskResult::into_value),
            error_message: task.error_message,
            created_at: Some(task.created_at),
            updated_at: Some(task.updated_at),
            started_at: task.started_at,
            completed_at: task.completed_at,
        }
    }
}
