//! Library - 作品列表与仪表盘
//!
//! 缓存最近一次拉取的作品列表；删除时用它判断是否为最后一部作品。

use std::sync::Arc;
use tokio::sync::RwLock;

use super::workspace::NovelWorkspace;
use crate::application::backend::BackendPorts;
use crate::application::commands::handlers::{CreateNovelHandler, DeleteNovelHandler};
use crate::application::commands::{CreateNovel, DeleteNovel};
use crate::application::error::ApplicationError;
use crate::application::observers::EventForwardingObserver;
use crate::application::queries::handlers::{ListActiveTasksHandler, ListNovelsHandler};
use crate::application::queries::{ListActiveTasks, ListNovels};
use crate::domain::novel::{Novel, NovelSummary};
use crate::domain::task::Task;

pub struct Library {
    ports: BackendPorts,
    novels: RwLock<Vec<NovelSummary>>,
    list_handler: ListNovelsHandler,
    create_handler: CreateNovelHandler,
    delete_handler: DeleteNovelHandler,
    active_tasks_handler: ListActiveTasksHandler,
}

impl Library {
    pub fn new(ports: BackendPorts) -> Self {
        Self {
            list_handler: ListNovelsHandler::new(ports.novels.clone()),
            create_handler: CreateNovelHandler::new(ports.novels.clone()),
            delete_handler: DeleteNovelHandler::new(ports.novels.clone()),
            active_tasks_handler: ListActiveTasksHandler::new(ports.generation.clone()),
            novels: RwLock::new(Vec::new()),
            ports,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 最近一次拉取的列表
    pub async fn novels(&self) -> Vec<NovelSummary> {
        self.novels.read().await.clone()
    }

    pub async fn refresh(&self) -> Result<Vec<NovelSummary>, ApplicationError> {
        let novels = self.list_handler.handle(ListNovels).await?;
        *self.novels.write().await = novels.clone();
        Ok(novels)
    }

    pub async fn create(&self, command: CreateNovel) -> Result<Novel, ApplicationError> {
        let novel = self.create_handler.handle(command).await?;
        self.novels.write().await.push(novel.summary());
        Ok(novel)
    }

    /// 只剩一部作品时拒绝，不发请求
    pub async fn delete(&self, novel_id: &str) -> Result<(), ApplicationError> {
        let known_total = self.novels.read().await.len();
        self.delete_handler
            .handle(DeleteNovel {
                novel_id: novel_id.to_string(),
                known_total,
            })
            .await?;
        self.novels.write().await.retain(|n| n.id != novel_id);
        Ok(())
    }

    pub async fn open(&self, novel_id: &str) -> Result<NovelWorkspace, ApplicationError> {
        NovelWorkspace::open(self.ports.clone(), novel_id).await
    }

    /// 各作品仍在运行的任务，只查询不观察。
    /// 尽力而为：单个作品失败只记录日志
    pub async fn active_tasks(&self) -> Vec<Task> {
        let novels = self.novels().await;
        let mut found = Vec::new();

        for novel in &novels {
            let query = ListActiveTasks {
                novel_id: novel.id.clone(),
            };
            match self.active_tasks_handler.handle(query).await {
                Ok(tasks) => {
                    // 任务记录可能不带作品 ID
                    found.extend(tasks.into_iter().map(|mut task| {
                        if task.novel_id.is_empty() {
                            task.novel_id = novel.id.clone();
                        }
                        task
                    }));
                }
                Err(e) => {
                    tracing::warn!(novel_id = %novel.id, error = %e, "Active task discovery failed");
                }
            }
        }
        found
    }

    /// 仪表盘加载时发现仍在运行的任务并开始观察
    pub async fn discover_active_tasks(&self) -> Vec<Task> {
        let tasks = self.active_tasks().await;

        for task in &tasks {
            let observer = EventForwardingObserver::new(&task.novel_id, self.ports.events.clone());
            self.ports.watcher.watch(&task.id, Arc::new(observer));
        }

        if !tasks.is_empty() {
            tracing::info!(count = tasks.len(), "Watching active tasks");
        }
        tasks
    }
}
