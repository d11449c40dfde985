//! Outline View - 大纲编辑与生成

use std::sync::Arc;

use super::workspace::NovelWorkspace;
use crate::application::error::ApplicationError;
use crate::application::ports::{GenerationOptions, TaskObserver};
use crate::domain::novel::NovelPatch;

pub struct OutlineView<'a> {
    workspace: &'a NovelWorkspace,
}

impl<'a> OutlineView<'a> {
    pub(crate) fn new(workspace: &'a NovelWorkspace) -> Self {
        Self { workspace }
    }

    pub async fn text(&self) -> String {
        self.workspace.read(|novel| novel.outline.clone()).await
    }

    /// 乐观保存大纲；服务端返回后以其为准
    pub async fn save(&self, outline: &str) -> Result<String, ApplicationError> {
        let patch = NovelPatch::outline(outline);
        self.workspace.mutate(|novel| patch.apply_to(novel)).await;

        let novel_id = self.workspace.novel_id();
        match self.workspace.ports().novels.update_novel(novel_id, &patch).await {
            Ok(saved) => {
                self.workspace
                    .mutate(|novel| novel.outline = saved.outline.clone())
                    .await;
                Ok(saved.outline)
            }
            Err(e) => Err(self.workspace.persist_failed("Novel", novel_id, e)),
        }
    }

    /// 发起大纲生成，返回任务 ID；完成后工作区自动重新同步
    pub async fn generate(
        &self,
        options: &GenerationOptions,
        observer: Option<Arc<dyn TaskObserver>>,
    ) -> Result<String, ApplicationError> {
        let novel_id = self.workspace.novel_id();
        let task_id = self
            .workspace
            .ports()
            .generation
            .generate_outline(novel_id, options)
            .await?;
        self.workspace.watch_task(&task_id, observer);
        Ok(task_id)
    }
}
