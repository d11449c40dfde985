//! Novel Command Handlers

use std::sync::Arc;

use crate::application::commands::{CancelTask, CreateNovel, DeleteNovel};
use crate::application::error::ApplicationError;
use crate::application::ports::{GenerationPort, NovelRepositoryPort};
use crate::domain::novel::{ensure_deletable, Novel, NovelDraft};

// ============================================================================
// CreateNovel
// ============================================================================

pub struct CreateNovelHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
}

impl CreateNovelHandler {
    pub fn new(novel_repo: Arc<dyn NovelRepositoryPort>) -> Self {
        Self { novel_repo }
    }

    pub async fn handle(&self, command: CreateNovel) -> Result<Novel, ApplicationError> {
        let draft = NovelDraft {
            title: command.title,
            genre: command.genre,
            synopsis: command.synopsis,
        };
        Ok(self.novel_repo.create_novel(&draft).await?)
    }
}

// ============================================================================
// DeleteNovel
// ============================================================================

pub struct DeleteNovelHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
}

impl DeleteNovelHandler {
    pub fn new(novel_repo: Arc<dyn NovelRepositoryPort>) -> Self {
        Self { novel_repo }
    }

    /// 最后一部作品在发出请求前就被拒绝
    pub async fn handle(&self, command: DeleteNovel) -> Result<(), ApplicationError> {
        ensure_deletable(command.known_total)?;
        self.novel_repo.delete_novel(&command.novel_id).await?;
        Ok(())
    }
}

// ============================================================================
// CancelTask
// ============================================================================

pub struct CancelTaskHandler {
    generation: Arc<dyn GenerationPort>,
}

impl CancelTaskHandler {
    pub fn new(generation: Arc<dyn GenerationPort>) -> Self {
        Self { generation }
    }

    /// 终止状态仍由任务观察送达
    pub async fn handle(&self, command: CancelTask) -> Result<(), ApplicationError> {
        self.generation.cancel_task(&command.task_id).await?;
        Ok(())
    }
}
