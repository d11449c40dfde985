//! Novel Context - 小说限界上下文
//!
//! 职责:
//! - Novel 聚合（卷、章节、人物、设定、时间线、伏笔）
//! - 章节定位与标签
//! - 乐观更新用的临时 ID

mod aggregate;
mod entities;
mod errors;
mod value_objects;

pub use aggregate::{ensure_deletable, Novel, NovelDraft, NovelPatch, NovelSummary};
pub use entities::{
    Chapter, Character, Foreshadowing, NovelEntity, TimelineEvent, Volume, WorldCategory,
    WorldSetting,
};
pub use errors::NovelError;
pub use value_objects::{is_provisional, provisional_id, ChapterPosition, ForeshadowingLabels};
