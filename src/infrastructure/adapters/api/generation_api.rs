//! HTTP Generation API
//!
//! 生成请求返回任务 ID；流式写作和任务推送走 SSE

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;

use super::paths::{self, Listing, TaskCreated};
use crate::application::ports::{
    AgentEventStream, ApiError, ChapterBatchRequest, ChapterWriteRequest, GenerationOptions,
    GenerationPort, HttpMethod, TaskEventStream,
};
use crate::domain::task::Task;
use crate::infrastructure::http::{ApiClient, RequestOptions};
use crate::infrastructure::sse::{agent_event, decode_stream, SseEvent};

pub struct HttpGenerationApi {
    client: ApiClient,
}

impl HttpGenerationApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn start(
        &self,
        novel_id: &str,
        what: &str,
        body: &(impl serde::Serialize + Sync),
    ) -> Result<String, ApiError> {
        let created: TaskCreated = self.client.post(&paths::generate(novel_id, what), body).await?;
        tracing::info!(
            novel_id = %novel_id,
            task_id = %created.task_id,
            kind = what,
            "Generation task started"
        );
        Ok(created.task_id)
    }
}

/// 任务推送帧：带 `status` 的帧是任务快照，`error` 帧是终止失败；其余忽略
fn task_snapshot(task_id: &str, event: SseEvent) -> Option<Result<Task, ApiError>> {
    if event.event == "error" {
        let message = match &event.data {
            Value::String(s) => s.clone(),
            data => data
                .get("message")
                .or_else(|| data.get("detail"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(event.raw),
        };
        return Some(Ok(Task::synthesized_failure(task_id, message)));
    }

    if event.data.get("status").is_none() {
        tracing::debug!(task_id = %task_id, event = %event.event, "Ignoring non-task frame");
        return None;
    }

    Some(serde_json::from_value(event.data).map_err(|e| ApiError::Decode(e.to_string())))
}

#[async_trait]
impl GenerationPort for HttpGenerationApi {
    async fn generate_outline(
        &self,
        novel_id: &str,
        options: &GenerationOptions,
    ) -> Result<String, ApiError> {
        self.start(novel_id, "outline", options).await
    }

    async fn generate_characters(
        &self,
        novel_id: &str,
        options: &GenerationOptions,
    ) -> Result<String, ApiError> {
        self.start(novel_id, "characters", options).await
    }

    async fn generate_chapters(
        &self,
        novel_id: &str,
        request: &ChapterBatchRequest,
    ) -> Result<String, ApiError> {
        self.start(novel_id, "chapters", request).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Task, ApiError> {
        self.client.get(&paths::task(task_id)).await
    }

    async fn list_active_tasks(&self, novel_id: &str) -> Result<Vec<Task>, ApiError> {
        let listing: Listing<Task> = self.client.get(&paths::active_tasks(novel_id)).await?;
        Ok(listing
            .into_vec()
            .into_iter()
            .filter(|t| !t.is_terminal())
            .collect())
    }

    async fn cancel_task(&self, task_id: &str) -> Result<(), ApiError> {
        let _: Value = self
            .client
            .request(
                &paths::task_cancel(task_id),
                RequestOptions::with_method(HttpMethod::Post),
                true,
            )
            .await?;
        tracing::info!(task_id = %task_id, "Task cancel requested");
        Ok(())
    }

    async fn stream_chapter(
        &self,
        novel_id: &str,
        chapter_id: &str,
        request: &ChapterWriteRequest,
    ) -> Result<AgentEventStream, ApiError> {
        let body = self
            .client
            .stream(
                &paths::chapter_write_stream(novel_id, chapter_id),
                RequestOptions::json(HttpMethod::Post, request)?,
            )
            .await?;

        let events = decode_stream(body).map(|item| item.map(agent_event).map_err(ApiError::from));
        Ok(Box::pin(events))
    }

    async fn task_events(&self, task_id: &str) -> Result<TaskEventStream, ApiError> {
        let body = self
            .client
            .stream(&paths::task_events(task_id), RequestOptions::get())
            .await?;

        let task_id = task_id.to_string();
        let snapshots = decode_stream(body).filter_map(move |item| {
            let snapshot = match item {
                Ok(event) => task_snapshot(&task_id, event),
                Err(e) => Some(Err(ApiError::from(e))),
            };
            futures_util::future::ready(snapshot)
        });
        Ok(Box::pin(snapshots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generation::{AgentEvent, StageTranscript};
    use crate::domain::task::{TaskResult, TaskStatus};
    use crate::infrastructure::adapters::test_support::fake_client;
    use crate::infrastructure::adapters::FakeReply;
    use serde_json::json;

    #[tokio::test]
    async fn test_generate_outline_returns_task_id() {
        let (fake, client) = fake_client();
        fake.push_json(
            HttpMethod::Post,
            "/novels/n1/generate/outline",
            202,
            json!({"task_id": "t1"}),
        );
        let api = HttpGenerationApi::new(client);
        let options = GenerationOptions {
            provider: Some("deepseek".to_string()),
            prompt: None,
        };

        let task_id = api.generate_outline("n1", &options).await.unwrap();

        assert_eq!(task_id, "t1");
        assert_eq!(fake.requests()[0].body, Some(json!({"provider": "deepseek"})));
    }

    #[tokio::test]
    async fn test_generate_chapters_body() {
        let (fake, client) = fake_client();
        fake.push_json(
            HttpMethod::Post,
            "/novels/n1/generate/chapters",
            200,
            json!({"id": "t2"}),
        );
        let api = HttpGenerationApi::new(client);
        let request = ChapterBatchRequest {
            volume_id: "v1".to_string(),
            count: 3,
            options: GenerationOptions::default(),
        };

        assert_eq!(api.generate_chapters("n1", &request).await.unwrap(), "t2");
        assert_eq!(
            fake.requests()[0].body,
            Some(json!({"volume_id": "v1", "count": 3}))
        );
    }

    #[tokio::test]
    async fn test_get_task_parses_typed_result() {
        let (fake, client) = fake_client();
        fake.push_json(
            HttpMethod::Get,
            "/tasks/t1",
            200,
            json!({
                "id": "t1", "novel_id": "n1", "task_type": "outline",
                "status": "completed", "progress": 100,
                "result": {"outline": "Act I..."},
                "created_at": "2024-05-01T10:00:00", "updated_at": "2024-05-01T10:01:00"
            }),
        );
        let api = HttpGenerationApi::new(client);

        let task = api.get_task("t1").await.unwrap();

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(
            task.result,
            Some(TaskResult::Outline {
                outline: "Act I...".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_stream_chapter_maps_agent_events() {
        let (fake, client) = fake_client();
        fake.push(
            HttpMethod::Post,
            "/novels/n1/chapters/c1/write/stream",
            FakeReply::chunks(
                200,
                vec![
                    "event: chunk\ndata: {\"stage\":\"writer\",\"content\":\"Hel",
                    "lo\"}\n\nevent: stage_output\ndata: {\"stage\":\"writer\",\"content\":\"Final text\"}\n\n",
                    "event: done\ndata: {\"score\": 9}\n\n",
                ],
            ),
        );
        let api = HttpGenerationApi::new(client);

        let stream = api
            .stream_chapter("n1", "c1", &ChapterWriteRequest::default())
            .await
            .unwrap();
        let events: Vec<AgentEvent> = stream.map(|e| e.unwrap()).collect().await;

        let mut transcript = StageTranscript::new();
        events.iter().for_each(|e| transcript.apply(e));
        assert_eq!(transcript.text("writer"), Some("Final text"));
        assert_eq!(events.last(), Some(&AgentEvent::Done { score: Some(9.0) }));
    }

    #[tokio::test]
    async fn test_task_events_skip_heartbeats() {
        let (fake, client) = fake_client();
        fake.push(
            HttpMethod::Get,
            "/tasks/t1/events",
            FakeReply::chunks(
                200,
                vec![
                    "event: ping\ndata: {}\n\n",
                    "event: task\ndata: {\"id\":\"t1\",\"status\":\"running\",\"progress\":40}\n\n",
                    "event: error\ndata: {\"message\":\"provider quota exceeded\"}\n\n",
                ],
            ),
        );
        let api = HttpGenerationApi::new(client);

        let snapshots: Vec<Task> = api
            .task_events("t1")
            .await
            .unwrap()
            .map(|t| t.unwrap())
            .collect()
            .await;

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].progress, 40);
        assert_eq!(snapshots[1].status, TaskStatus::Failed);
        assert_eq!(snapshots[1].failure_message(), "provider quota exceeded");
    }

    #[tokio::test]
    async fn test_active_tasks_filters_terminal() {
        let (fake, client) = fake_client();
        fake.push_json(
            HttpMethod::Get,
            "/novels/n1/tasks?active=true",
            200,
            json!([
                {"id": "t1", "status": "running", "task_type": "chapters"},
                {"id": "t2", "status": "completed", "task_type": "outline"}
            ]),
        );
        let api = HttpGenerationApi::new(client);

        let tasks = api.list_active_tasks("n1").await.unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "t1");
    }
}
