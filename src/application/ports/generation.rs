//! Generation Port - AI 生成请求与任务查询
//!
//! 生成请求立即返回任务 ID，任务在服务端执行；
//! 流式写作直接返回流水线事件流

use async_trait::async_trait;
use futures_util::stream::Stream;
use serde::Serialize;
use std::pin::Pin;

use super::ApiError;
use crate::domain::generation::AgentEvent;
use crate::domain::task::Task;

/// 流水线事件流
pub type AgentEventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, ApiError>> + Send>>;

/// 任务快照流（SSE 推送）
pub type TaskEventStream = Pin<Box<dyn Stream<Item = Result<Task, ApiError>> + Send>>;

/// 各类生成请求共有的选项
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationOptions {
    /// AI 提供方（用户偏好）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// 额外提示
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// 批量生成章节
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterBatchRequest {
    pub volume_id: String,
    pub count: u32,
    #[serde(flatten)]
    pub options: GenerationOptions,
}

/// 流式写作单章
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChapterWriteRequest {
    #[serde(flatten)]
    pub options: GenerationOptions,
    /// 最多重写次数，由服务端解释
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

/// Generation Port
#[async_trait]
pub trait GenerationPort: Send + Sync {
    async fn generate_outline(
        &self,
        novel_id: &str,
        options: &GenerationOptions,
    ) -> Result<String, ApiError>;

    async fn generate_characters(
        &self,
        novel_id: &str,
        options: &GenerationOptions,
    ) -> Result<String, ApiError>;

    async fn generate_chapters(
        &self,
        novel_id: &str,
        request: &ChapterBatchRequest,
    ) -> Result<String, ApiError>;

    async fn get_task(&self, task_id: &str) -> Result<Task, ApiError>;

    /// 作品下尚未结束的任务
    async fn list_active_tasks(&self, novel_id: &str) -> Result<Vec<Task>, ApiError>;

    /// 带外取消请求；服务端随后以 `cancelled`/`failed` 通知
    async fn cancel_task(&self, task_id: &str) -> Result<(), ApiError>;

    async fn stream_chapter(
        &self,
        novel_id: &str,
        chapter_id: &str,
        request: &ChapterWriteRequest,
    ) -> Result<AgentEventStream, ApiError>;

    async fn task_events(&self, task_id: &str) -> Result<TaskEventStream, ApiError>;
}
