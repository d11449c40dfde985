//! Novel Workspace - 单部作品的编辑会话
//!
//! 持有内存中的 Novel 聚合，所有视图共享同一份副本。
//! 锁只在本地修改时持有，不跨越网络请求。

use dashmap::DashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::editor::EditorView;
use super::entity_view::EntityView;
use super::outline::OutlineView;
use crate::application::backend::BackendPorts;
use crate::application::error::ApplicationError;
use crate::application::observers::{CompletionHook, EventForwardingObserver};
use crate::application::ports::{ClientEvent, EventSinkPort, NovelRepositoryPort, TaskObserver};
use crate::domain::novel::{Character, Foreshadowing, Novel, TimelineEvent, WorldSetting};
use crate::domain::task::Task;

/// 作品工作区
pub struct NovelWorkspace {
    novel_id: String,
    novel: Arc<RwLock<Novel>>,
    ports: BackendPorts,
    /// 本工作区发起的任务观察
    watched: Arc<DashSet<String>>,
}

impl NovelWorkspace {
    /// 拉取完整聚合并打开工作区
    pub async fn open(ports: BackendPorts, novel_id: &str) -> Result<Self, ApplicationError> {
        let novel = ports.novels.get_novel(novel_id).await?;
        tracing::info!(
            novel_id = %novel.id,
            title = %novel.title,
            volumes = novel.volumes.len(),
            chapters = novel.chapter_count(),
            "Workspace opened"
        );
        Ok(Self::from_novel(ports, novel))
    }

    pub fn from_novel(ports: BackendPorts, novel: Novel) -> Self {
        Self {
            novel_id: novel.id.clone(),
            novel: Arc::new(RwLock::new(novel)),
            ports,
            watched: Arc::new(DashSet::new()),
        }
    }

    pub fn novel_id(&self) -> &str {
        &self.novel_id
    }

    pub fn ports(&self) -> &BackendPorts {
        &self.ports
    }

    /// 当前本地副本的拷贝
    pub async fn snapshot(&self) -> Novel {
        self.novel.read().await.clone()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&Novel) -> R) -> R {
        let novel = self.novel.read().await;
        f(&novel)
    }

    pub(crate) async fn mutate<R>(&self, f: impl FnOnce(&mut Novel) -> R) -> R {
        let mut novel = self.novel.write().await;
        f(&mut novel)
    }

    // ------------------------------------------------------------------
    // 视图
    // ------------------------------------------------------------------

    pub fn characters(&self) -> EntityView<'_, Character> {
        EntityView::new(self)
    }

    pub fn world_settings(&self) -> EntityView<'_, WorldSetting> {
        EntityView::new(self)
    }

    pub fn timeline(&self) -> EntityView<'_, TimelineEvent> {
        EntityView::new(self)
    }

    pub fn foreshadowings(&self) -> EntityView<'_, Foreshadowing> {
        EntityView::new(self)
    }

    pub fn outline(&self) -> OutlineView<'_> {
        OutlineView::new(self)
    }

    pub fn editor(&self) -> EditorView<'_> {
        EditorView::new(self)
    }

    // ------------------------------------------------------------------
    // 同步与任务
    // ------------------------------------------------------------------

    fn syncer(&self) -> WorkspaceSync {
        WorkspaceSync {
            novel_id: self.novel_id.clone(),
            novel: self.novel.clone(),
            novels: self.ports.novels.clone(),
            events: self.ports.events.clone(),
        }
    }

    /// 从后端重新拉取整个聚合，覆盖本地副本
    pub async fn resync(&self) -> Result<(), ApplicationError> {
        self.syncer().resync().await
    }

    /// 观察本作品的任务：进度转成事件，完成后重新同步；
    /// `inner` 额外收到同样的回调
    pub fn watch_task(&self, task_id: &str, inner: Option<Arc<dyn TaskObserver>>) {
        let mut observer = EventForwardingObserver::new(&self.novel_id, self.ports.events.clone())
            .with_hook(Arc::new(self.syncer()));
        if let Some(inner) = inner {
            observer = observer.chain(inner);
        }
        self.watched.insert(task_id.to_string());
        self.ports.watcher.watch(task_id, Arc::new(observer));
    }

    /// 打开作品时发现仍在运行的任务并继续观察。
    /// 尽力而为：失败只记录日志
    pub async fn resume_active_tasks(&self) -> Vec<Task> {
        match self.ports.generation.list_active_tasks(&self.novel_id).await {
            Ok(tasks) => {
                for task in &tasks {
                    self.watch_task(&task.id, None);
                }
                if !tasks.is_empty() {
                    tracing::info!(
                        novel_id = %self.novel_id,
                        count = tasks.len(),
                        "Resumed watching active tasks"
                    );
                }
                tasks
            }
            Err(e) => {
                tracing::warn!(novel_id = %self.novel_id, error = %e, "Active task discovery failed");
                Vec::new()
            }
        }
    }

    /// 带外取消；终止状态仍由观察循环送达
    pub async fn cancel_task(&self, task_id: &str) -> Result<(), ApplicationError> {
        self.ports.generation.cancel_task(task_id).await?;
        Ok(())
    }

    /// 离开工作区：停止本工作区发起的全部观察
    pub fn close(&self) {
        for task_id in self.watched.iter() {
            self.ports.watcher.unwatch(&task_id);
        }
        self.watched.clear();
        tracing::debug!(novel_id = %self.novel_id, "Workspace closed");
    }

    /// 乐观更新未能持久化：记录日志、发布事件、返回错误。本地不回滚
    pub(crate) fn persist_failed(
        &self,
        kind: &str,
        entity_id: &str,
        error: impl Into<ApplicationError>,
    ) -> ApplicationError {
        let error = error.into();
        tracing::warn!(
            novel_id = %self.novel_id,
            kind = kind,
            entity_id = %entity_id,
            error = %error,
            "Optimistic update not persisted"
        );
        self.ports.events.publish(ClientEvent::PersistFailed {
            novel_id: self.novel_id.clone(),
            kind: kind.to_string(),
            entity_id: entity_id.to_string(),
            error: error.to_string(),
        });
        error
    }
}

impl Drop for NovelWorkspace {
    fn drop(&mut self) {
        self.close();
    }
}

/// 重新同步所需的句柄，可脱离工作区生命周期在后台运行
#[derive(Clone)]
struct WorkspaceSync {
    novel_id: String,
    novel: Arc<RwLock<Novel>>,
    novels: Arc<dyn NovelRepositoryPort>,
    events: Arc<dyn EventSinkPort>,
}

impl WorkspaceSync {
    async fn resync(&self) -> Result<(), ApplicationError> {
        let fresh = self.novels.get_novel(&self.novel_id).await?;
        *self.novel.write().await = fresh;
        tracing::debug!(novel_id = %self.novel_id, "Workspace resynced");
        self.events.publish(ClientEvent::NovelResynced {
            novel_id: self.novel_id.clone(),
        });
        Ok(())
    }
}

impl CompletionHook for WorkspaceSync {
    fn task_completed(&self, task: &Task) {
        let sync = self.clone();
        let task_id = task.id.clone();
        tokio::spawn(async move {
            if let Err(e) = sync.resync().await {
                tracing::warn!(
                    novel_id = %sync.novel_id,
                    task_id = %task_id,
                    error = %e,
                    "Resync after task completion failed"
                );
            }
        });
    }
}
