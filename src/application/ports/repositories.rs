//! Repository Ports - 出站端口
//!
//! 定义远端作品数据的抽象接口
//! 具体实现在 infrastructure 层（REST API）

use async_trait::async_trait;

use super::ApiError;
use crate::domain::novel::{
    Chapter, Novel, NovelDraft, NovelEntity, NovelPatch, NovelSummary, Volume,
};

// ============================================================================
// Novel Repository
// ============================================================================

/// Novel Repository Port
///
/// 作品、卷、章节的远端读写
#[async_trait]
pub trait NovelRepositoryPort: Send + Sync {
    /// 当前用户的作品列表
    async fn list_novels(&self) -> Result<Vec<NovelSummary>, ApiError>;

    /// 获取完整聚合（章节正文可能未加载）
    async fn get_novel(&self, novel_id: &str) -> Result<Novel, ApiError>;

    async fn create_novel(&self, draft: &NovelDraft) -> Result<Novel, ApiError>;

    async fn update_novel(&self, novel_id: &str, patch: &NovelPatch) -> Result<Novel, ApiError>;

    async fn delete_novel(&self, novel_id: &str) -> Result<(), ApiError>;

    async fn create_volume(&self, novel_id: &str, volume: &Volume) -> Result<Volume, ApiError>;

    async fn update_volume(&self, novel_id: &str, volume: &Volume) -> Result<Volume, ApiError>;

    async fn delete_volume(&self, novel_id: &str, volume_id: &str) -> Result<(), ApiError>;

    async fn create_chapter(
        &self,
        novel_id: &str,
        volume_id: &str,
        chapter: &Chapter,
    ) -> Result<Chapter, ApiError>;

    /// 获取章节全文
    async fn get_chapter(&self, novel_id: &str, chapter_id: &str) -> Result<Chapter, ApiError>;

    async fn update_chapter(&self, novel_id: &str, chapter: &Chapter) -> Result<Chapter, ApiError>;

    async fn delete_chapter(&self, novel_id: &str, chapter_id: &str) -> Result<(), ApiError>;
}

// ============================================================================
// Entity Repository
// ============================================================================

/// 扁平记录（人物、设定、时间线、伏笔）的远端读写
#[async_trait]
pub trait EntityRepositoryPort<E: NovelEntity>: Send + Sync {
    async fn list(&self, novel_id: &str) -> Result<Vec<E>, ApiError>;

    /// 创建记录，返回带服务端 ID 的规范记录
    async fn create(&self, novel_id: &str, entity: &E) -> Result<E, ApiError>;

    async fn update(&self, novel_id: &str, entity: &E) -> Result<E, ApiError>;

    async fn delete(&self, novel_id: &str, entity_id: &str) -> Result<(), ApiError>;
}
