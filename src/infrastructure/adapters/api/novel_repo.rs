//! HTTP Novel Repository

use async_trait::async_trait;

use super::paths::{self, Listing};
use crate::application::ports::{ApiError, NovelRepositoryPort};
use crate::domain::novel::{Chapter, Novel, NovelDraft, NovelPatch, NovelSummary, Volume};
use crate::infrastructure::http::ApiClient;

/// 作品、卷、章节的 REST 实现
pub struct HttpNovelRepository {
    client: ApiClient,
}

impl HttpNovelRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NovelRepositoryPort for HttpNovelRepository {
    async fn list_novels(&self) -> Result<Vec<NovelSummary>, ApiError> {
        let listing: Listing<NovelSummary> = self.client.get(paths::NOVELS).await?;
        Ok(listing.into_vec())
    }

    async fn get_novel(&self, novel_id: &str) -> Result<Novel, ApiError> {
        self.client.get(&paths::novel(novel_id)).await
    }

    async fn create_novel(&self, draft: &NovelDraft) -> Result<Novel, ApiError> {
        let novel: Novel = self.client.post(paths::NOVELS, draft).await?;
        tracing::info!(novel_id = %novel.id, title = %novel.title, "Novel created");
        Ok(novel)
    }

    async fn update_novel(&self, novel_id: &str, patch: &NovelPatch) -> Result<Novel, ApiError> {
        self.client.patch(&paths::novel(novel_id), patch).await
    }

    async fn delete_novel(&self, novel_id: &str) -> Result<(), ApiError> {
        self.client.delete(&paths::novel(novel_id)).await?;
        tracing::info!(novel_id = %novel_id, "Novel deleted");
        Ok(())
    }

    async fn create_volume(&self, novel_id: &str, volume: &Volume) -> Result<Volume, ApiError> {
        self.client.post(&paths::volumes(novel_id), volume).await
    }

    async fn update_volume(&self, novel_id: &str, volume: &Volume) -> Result<Volume, ApiError> {
        self.client
            .put(&paths::volume(novel_id, &volume.id), volume)
            .await
    }

    async fn delete_volume(&self, novel_id: &str, volume_id: &str) -> Result<(), ApiError> {
        self.client.delete(&paths::volume(novel_id, volume_id)).await
    }

    async fn create_chapter(
        &self,
        novel_id: &str,
        volume_id: &str,
        chapter: &Chapter,
    ) -> Result<Chapter, ApiError> {
        self.client
            .post(&paths::volume_chapters(novel_id, volume_id), chapter)
            .await
    }

    async fn get_chapter(&self, novel_id: &str, chapter_id: &str) -> Result<Chapter, ApiError> {
        self.client.get(&paths::chapter(novel_id, chapter_id)).await
    }

    async fn update_chapter(&self, novel_id: &str, chapter: &Chapter) -> Result<Chapter, ApiError> {
        self.client
            .put(&paths::chapter(novel_id, &chapter.id), chapter)
            .await
    }

    async fn delete_chapter(&self, novel_id: &str, chapter_id: &str) -> Result<(), ApiError> {
        self.client.delete(&paths::chapter(novel_id, chapter_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::HttpMethod;
    use crate::infrastructure::adapters::test_support::fake_client;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_novels() {
        let (fake, client) = fake_client();
        fake.push_json(
            HttpMethod::Get,
            "/novels",
            200,
            json!([{"id": "n1", "title": "长夜", "updated_at": "2024-05-01T10:00:00"}]),
        );
        let repo = HttpNovelRepository::new(client);

        let novels = repo.list_novels().await.unwrap();

        assert_eq!(novels.len(), 1);
        assert_eq!(novels[0].title, "长夜");
        assert!(novels[0].updated_at.is_some());
    }

    #[tokio::test]
    async fn test_get_novel_with_summary_chapters() {
        let (fake, client) = fake_client();
        fake.push_json(
            HttpMethod::Get,
            "/novels/n1",
            200,
            json!({
                "id": "n1",
                "title": "长夜",
                "volumes": [{"id": "v1", "title": "Part One", "chapters": [
                    {"id": "c1", "title": "Opening", "has_content": true}
                ]}],
                "foreshadowings": [{"id": "f1", "content": "the key", "chapter_id": "c1", "resolved": "false"}]
            }),
        );
        let repo = HttpNovelRepository::new(client);

        let novel = repo.get_novel("n1").await.unwrap();

        let chapter = novel.chapter("c1").unwrap();
        assert!(chapter.needs_content_fetch());
        assert!(!novel.foreshadowings[0].resolved);
    }

    #[tokio::test]
    async fn test_update_chapter_uses_chapter_path() {
        let (fake, client) = fake_client();
        fake.push_json(
            HttpMethod::Put,
            "/novels/n1/chapters/c1",
            200,
            json!({"id": "c1", "title": "Opening", "content": "It was late."}),
        );
        let repo = HttpNovelRepository::new(client);
        let mut chapter = Chapter::new("Opening");
        chapter.id = "c1".to_string();
        chapter.content = "It was late.".to_string();

        let saved = repo.update_chapter("n1", &chapter).await.unwrap();

        assert_eq!(saved.content, "It was late.");
        let request = &fake.requests()[0];
        assert_eq!(request.body.as_ref().unwrap()["content"], "It was late.");
    }
}
