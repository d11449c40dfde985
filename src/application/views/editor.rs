//! Editor View - 卷与章节编辑、流式写作
//!
//! 章节正文按需加载：列表里只带 `has_content` 标记，
//! 打开章节时才拉取全文。

use tokio_util::sync::CancellationToken;

use super::chapter_stream::{ChapterStreamSession, StreamReport};
use super::workspace::NovelWorkspace;
use crate::application::error::ApplicationError;
use crate::application::ports::ChapterWriteRequest;
use crate::domain::generation::{AgentEvent, StageTranscript};
use crate::domain::novel::{is_provisional, provisional_id, Chapter, NovelError, Volume};

pub struct EditorView<'a> {
    workspace: &'a NovelWorkspace,
}

impl<'a> EditorView<'a> {
    pub(crate) fn new(workspace: &'a NovelWorkspace) -> Self {
        Self { workspace }
    }

    pub async fn volumes(&self) -> Vec<Volume> {
        self.workspace.read(|novel| novel.volumes.clone()).await
    }

    // ------------------------------------------------------------------
    // 章节
    // ------------------------------------------------------------------

    /// 打开章节；服务端有正文而本地为空时才拉取
    pub async fn open_chapter(&self, chapter_id: &str) -> Result<Chapter, ApplicationError> {
        let local = self
            .workspace
            .read(|novel| novel.chapter(chapter_id).cloned())
            .await
            .ok_or_else(|| ApplicationError::from(NovelError::ChapterNotFound(chapter_id.to_string())))?;

        if !local.needs_content_fetch() {
            return Ok(local);
        }

        tracing::debug!(chapter_id = %chapter_id, "Loading chapter content");
        let full = self
            .workspace
            .ports()
            .novels
            .get_chapter(self.workspace.novel_id(), chapter_id)
            .await?;
        self.workspace
            .mutate(|novel| {
                if let Ok(slot) = novel.chapter_mut(chapter_id) {
                    *slot = full.clone();
                }
            })
            .await;
        Ok(full)
    }

    pub async fn save_chapter(&self, chapter: Chapter) -> Result<Chapter, ApplicationError> {
        let chapter_id = chapter.id.clone();
        if is_provisional(&chapter_id) {
            return Err(ApplicationError::invalid_state(format!(
                "Chapter {} has not been saved yet",
                chapter_id
            )));
        }

        self.workspace
            .mutate(|novel| {
                novel.chapter_mut(&chapter_id).map(|slot| *slot = chapter.clone())
            })
            .await?;

        let novel_id = self.workspace.novel_id();
        match self
            .workspace
            .ports()
            .novels
            .update_chapter(novel_id, &chapter)
            .await
        {
            Ok(saved) => {
                self.workspace
                    .mutate(|novel| {
                        if let Ok(slot) = novel.chapter_mut(&chapter_id) {
                            *slot = saved.clone();
                        }
                    })
                    .await;
                tracing::debug!(chapter_id = %chapter_id, "Chapter saved");
                Ok(saved)
            }
            Err(e) => Err(self.workspace.persist_failed("Chapter", &chapter_id, e)),
        }
    }

    pub async fn add_chapter(
        &self,
        volume_id: &str,
        mut chapter: Chapter,
    ) -> Result<Chapter, ApplicationError> {
        if is_provisional(volume_id) {
            return Err(ApplicationError::invalid_state(format!(
                "Volume {} has not been saved yet",
                volume_id
            )));
        }

        let local_id = provisional_id();
        chapter.id = local_id.clone();
        self.workspace
            .mutate(|novel| {
                novel
                    .volume_mut(volume_id)
                    .map(|volume| volume.chapters.push(chapter.clone()))
            })
            .await?;

        chapter.id = String::new();
        let novel_id = self.workspace.novel_id();
        match self
            .workspace
            .ports()
            .novels
            .create_chapter(novel_id, volume_id, &chapter)
            .await
        {
            Ok(saved) => {
                self.workspace
                    .mutate(|novel| {
                        if let Ok(slot) = novel.chapter_mut(&local_id) {
                            *slot = saved.clone();
                        }
                    })
                    .await;
                Ok(saved)
            }
            Err(e) => Err(self.workspace.persist_failed("Chapter", &local_id, e)),
        }
    }

    pub async fn remove_chapter(&self, chapter_id: &str) -> Result<(), ApplicationError> {
        self.workspace
            .mutate(|novel| novel.remove_chapter(chapter_id))
            .await?;
        if is_provisional(chapter_id) {
            return Ok(());
        }

        self.workspace
            .ports()
            .novels
            .delete_chapter(self.workspace.novel_id(), chapter_id)
            .await
            .map_err(|e| self.workspace.persist_failed("Chapter", chapter_id, e))
    }

    // ------------------------------------------------------------------
    // 卷
    // ------------------------------------------------------------------

    pub async fn add_volume(&self, title: &str) -> Result<Volume, ApplicationError> {
        let local_id = provisional_id();
        let mut volume = Volume::new(title);
        volume.id = local_id.clone();
        self.workspace
            .mutate(|novel| novel.volumes.push(volume.clone()))
            .await;

        volume.id = String::new();
        let novel_id = self.workspace.novel_id();
        match self
            .workspace
            .ports()
            .novels
            .create_volume(novel_id, &volume)
            .await
        {
            Ok(saved) => {
                self.workspace
                    .mutate(|novel| {
                        if let Ok(slot) = novel.volume_mut(&local_id) {
                            *slot = saved.clone();
                        }
                    })
                    .await;
                Ok(saved)
            }
            Err(e) => Err(self.workspace.persist_failed("Volume", &local_id, e)),
        }
    }

    /// 只更新卷的元数据，章节列表保持本地
    pub async fn update_volume(&self, volume: Volume) -> Result<Volume, ApplicationError> {
        let volume_id = volume.id.clone();
        if is_provisional(&volume_id) {
            return Err(ApplicationError::invalid_state(format!(
                "Volume {} has not been saved yet",
                volume_id
            )));
        }

        let mut outgoing = volume;
        outgoing.chapters.clear();
        self.workspace
            .mutate(|novel| {
                novel
                    .volume_mut(&volume_id)
                    .map(|slot| copy_volume_metadata(slot, &outgoing))
            })
            .await?;

        let novel_id = self.workspace.novel_id();
        match self
            .workspace
            .ports()
            .novels
            .update_volume(novel_id, &outgoing)
            .await
        {
            Ok(saved) => {
                // 请求期间卷可能已在本地删除，此时直接返回服务端记录
                let merged = self
                    .workspace
                    .mutate(|novel| {
                        novel.volume_mut(&volume_id).ok().map(|slot| {
                            copy_volume_metadata(slot, &saved);
                            slot.clone()
                        })
                    })
                    .await;
                Ok(merged.unwrap_or(saved))
            }
            Err(e) => Err(self.workspace.persist_failed("Volume", &volume_id, e)),
        }
    }

    pub async fn remove_volume(&self, volume_id: &str) -> Result<(), ApplicationError> {
        self.workspace
            .mutate(|novel| {
                let index = novel
                    .volumes
                    .iter()
                    .position(|v| v.id == volume_id)
                    .ok_or_else(|| NovelError::VolumeNotFound(volume_id.to_string()))?;
                Ok::<_, NovelError>(novel.volumes.remove(index))
            })
            .await?;
        if is_provisional(volume_id) {
            return Ok(());
        }

        self.workspace
            .ports()
            .novels
            .delete_volume(self.workspace.novel_id(), volume_id)
            .await
            .map_err(|e| self.workspace.persist_failed("Volume", volume_id, e))
    }

    // ------------------------------------------------------------------
    // 流式写作
    // ------------------------------------------------------------------

    pub async fn write_chapter(
        &self,
        chapter_id: &str,
        request: &ChapterWriteRequest,
    ) -> Result<ChapterStreamSession, ApplicationError> {
        let exists = self
            .workspace
            .read(|novel| novel.chapter(chapter_id).is_some())
            .await;
        if !exists {
            return Err(NovelError::ChapterNotFound(chapter_id.to_string()).into());
        }

        let events = self
            .workspace
            .ports()
            .generation
            .stream_chapter(self.workspace.novel_id(), chapter_id, request)
            .await?;
        tracing::info!(chapter_id = %chapter_id, "Chapter stream opened");
        Ok(ChapterStreamSession::new(chapter_id, events))
    }

    /// 写完一章；服务端保存后重新拉取正文
    pub async fn write_chapter_to_end(
        &self,
        chapter_id: &str,
        request: &ChapterWriteRequest,
        cancel: &CancellationToken,
        on_event: impl FnMut(&AgentEvent, &StageTranscript),
    ) -> Result<StreamReport, ApplicationError> {
        let session = self.write_chapter(chapter_id, request).await?;
        let report = session.run(cancel, on_event).await?;

        tracing::info!(
            chapter_id = %chapter_id,
            outcome = ?report.outcome,
            stages = report.transcript.stages().len(),
            "Chapter stream finished"
        );

        if report.persisted() {
            let saved_id = report
                .saved_chapter_id
                .clone()
                .unwrap_or_else(|| chapter_id.to_string());
            match self
                .workspace
                .ports()
                .novels
                .get_chapter(self.workspace.novel_id(), &saved_id)
                .await
            {
                Ok(fresh) => {
                    self.workspace
                        .mutate(|novel| {
                            if let Ok(slot) = novel.chapter_mut(&saved_id) {
                                *slot = fresh;
                            }
                        })
                        .await
                }
                Err(e) => {
                    tracing::warn!(chapter_id = %saved_id, error = %e, "Reloading written chapter failed");
                }
            }
        }

        Ok(report)
    }
}

fn copy_volume_metadata(target: &mut Volume, source: &Volume) {
    target.title = source.title.clone();
    target.summary = source.summary.clone();
    target.outline = source.outline.clone();
}
