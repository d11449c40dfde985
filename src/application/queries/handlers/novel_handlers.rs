//! Novel Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{GenerationPort, NovelRepositoryPort};
use crate::application::queries::{GetTask, ListActiveTasks, ListNovels};
use crate::domain::novel::NovelSummary;
use crate::domain::task::Task;

/// ListNovels Handler
pub struct ListNovelsHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
}

impl ListNovelsHandler {
    pub fn new(novel_repo: Arc<dyn NovelRepositoryPort>) -> Self {
        Self { novel_repo }
    }

    pub async fn handle(&self, _query: ListNovels) -> Result<Vec<NovelSummary>, ApplicationError> {
        let novels = self.novel_repo.list_novels().await?;
        tracing::debug!(count = novels.len(), "Novels listed");
        Ok(novels)
    }
}

/// ListActiveTasks Handler
pub struct ListActiveTasksHandler {
    generation: Arc<dyn GenerationPort>,
}

impl ListActiveTasksHandler {
    pub fn new(generation: Arc<dyn GenerationPort>) -> Self {
        Self { generation }
    }

    pub async fn handle(&self, query: ListActiveTasks) -> Result<Vec<Task>, ApplicationError> {
        Ok(self.generation.list_active_tasks(&query.novel_id).await?)
    }
}

/// GetTask Handler
pub struct GetTaskHandler {
    generation: Arc<dyn GenerationPort>,
}

impl GetTaskHandler {
    pub fn new(generation: Arc<dyn GenerationPort>) -> Self {
        Self { generation }
    }

    pub async fn handle(&self, query: GetTask) -> Result<Task, ApplicationError> {
        Ok(self.generation.get_task(&query.task_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::HttpMethod;
    use crate::domain::task::TaskStatus;
    use crate::infrastructure::adapters::test_support::fake_client;
    use crate::infrastructure::adapters::{HttpGenerationApi, HttpNovelRepository};
    use serde_json::json;

    #[tokio::test]
    async fn test_list_novels_accepts_wrapped_listing() {
        let (fake, client) = fake_client();
        fake.push_json(
            HttpMethod::Get,
            "/novels",
            200,
            json!({"novels": [{"id": "n1", "title": "A"}, {"id": "n2", "title": "B"}]}),
        );
        let handler = ListNovelsHandler::new(Arc::new(HttpNovelRepository::new(client)));

        let novels = handler.handle(ListNovels).await.unwrap();

        let ids: Vec<_> = novels.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2"]);
    }

    #[tokio::test]
    async fn test_get_task() {
        let (fake, client) = fake_client();
        fake.push_json(
            HttpMethod::Get,
            "/tasks/t1",
            200,
            json!({"id": "t1", "status": "running", "progress": 142.0}),
        );
        let handler = GetTaskHandler::new(Arc::new(HttpGenerationApi::new(client)));

        let task = handler
            .handle(GetTask {
                task_id: "t1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.progress, 100);
    }
}
