//! Novel Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PROVISIONAL_PREFIX: &str = "local-";

/// 乐观创建时在服务端确认前使用的临时 ID
pub fn provisional_id() -> String {
    format!("{}{}", PROVISIONAL_PREFIX, Uuid::new_v4())
}

pub fn is_provisional(id: &str) -> bool {
    id.starts_with(PROVISIONAL_PREFIX)
}

/// 章节在叙事顺序中的位置（0 起始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChapterPosition {
    pub volume_index: usize,
    pub chapter_index: usize,
}

impl ChapterPosition {
    /// 展示用标签，卷号和章号从 1 开始
    pub fn label(&self, title: &str) -> String {
        format!(
            "Volume {} Chapter {}: {}",
            self.volume_index + 1,
            self.chapter_index + 1,
            title
        )
    }
}

/// 伏笔的埋设/回收标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeshadowingLabels {
    pub origin: Option<String>,
    pub resolution: Option<String>,
}

impl ForeshadowingLabels {
    pub const NOT_RESOLVED: &'static str = "not resolved";

    pub fn resolution_display(&self) -> &str {
        self.resolution.as_deref().unwrap_or(Self::NOT_RESOLVED)
    }
}
