//! 人物与章节批量生成
//!
//! 与大纲生成相同：请求立即返回任务 ID，完成后工作区重新同步。

use std::sync::Arc;

use super::workspace::NovelWorkspace;
use crate::application::error::ApplicationError;
use crate::application::ports::{ChapterBatchRequest, GenerationOptions, TaskObserver};
use crate::domain::novel::{is_provisional, NovelError};

impl NovelWorkspace {
    pub async fn generate_characters(
        &self,
        options: &GenerationOptions,
        observer: Option<Arc<dyn TaskObserver>>,
    ) -> Result<String, ApplicationError> {
        let task_id = self
            .ports()
            .generation
            .generate_characters(self.novel_id(), options)
            .await?;
        self.watch_task(&task_id, observer);
        Ok(task_id)
    }

    /// 为某一卷批量生成 `count` 章
    pub async fn generate_chapters(
        &self,
        volume_id: &str,
        count: u32,
        options: &GenerationOptions,
        observer: Option<Arc<dyn TaskObserver>>,
    ) -> Result<String, ApplicationError> {
        if count == 0 {
            return Err(ApplicationError::business_rule(
                "chapter count must be at least 1",
            ));
        }
        let known = self.read(|novel| novel.volume(volume_id).is_some()).await;
        if !known {
            return Err(NovelError::VolumeNotFound(volume_id.to_string()).into());
        }
        if is_provisional(volume_id) {
            return Err(ApplicationError::invalid_state(format!(
                "Volume {} has not been saved yet",
                volume_id
            )));
        }

        let request = ChapterBatchRequest {
            volume_id: volume_id.to_string(),
            count,
            options: options.clone(),
        };
        let task_id = self
            .ports()
            .generation
            .generate_chapters(self.novel_id(), &request)
            .await?;
        self.watch_task(&task_id, observer);
        Ok(task_id)
    }
}
