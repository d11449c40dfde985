//! Novel Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Chapter, ChapterPosition, Character, Foreshadowing, ForeshadowingLabels, NovelEntity,
    NovelError, TimelineEvent, Volume, WorldSetting,
};
use crate::domain::timestamp;

/// Novel 聚合根
///
/// 不变量:
/// - 卷按数组顺序构成叙事顺序，章节在卷内有序
/// - 扁平记录（人物、设定、时间线、伏笔）按插入顺序保留
/// - 客户端副本不是权威数据，服务端返回值总是覆盖本地
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Novel {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub synopsis: String,
    /// 全书大纲
    #[serde(default)]
    pub outline: String,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub world_settings: Vec<WorldSetting>,
    #[serde(default)]
    pub timeline_events: Vec<TimelineEvent>,
    #[serde(default)]
    pub foreshadowings: Vec<Foreshadowing>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Novel {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn summary(&self) -> NovelSummary {
        NovelSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            genre: self.genre.clone(),
            synopsis: self.synopsis.clone(),
            updated_at: self.updated_at,
        }
    }

    pub fn chapter_count(&self) -> usize {
        self.volumes.iter().map(|v| v.chapters.len()).sum()
    }

    // ------------------------------------------------------------------
    // 卷 / 章节
    // ------------------------------------------------------------------

    pub fn volume(&self, volume_id: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.id == volume_id)
    }

    pub fn volume_mut(&mut self, volume_id: &str) -> Result<&mut Volume, NovelError> {
        self.volumes
            .iter_mut()
            .find(|v| v.id == volume_id)
            .ok_or_else(|| NovelError::VolumeNotFound(volume_id.to_string()))
    }

    /// 线性查找章节位置；数据规模在几十到几百章，足够
    pub fn chapter_position(&self, chapter_id: &str) -> Option<ChapterPosition> {
        self.volumes.iter().enumerate().find_map(|(volume_index, volume)| {
            volume
                .chapters
                .iter()
                .position(|c| c.id == chapter_id)
                .map(|chapter_index| ChapterPosition {
                    volume_index,
                    chapter_index,
                })
        })
    }

    pub fn chapter(&self, chapter_id: &str) -> Option<&Chapter> {
        let pos = self.chapter_position(chapter_id)?;
        Some(&self.volumes[pos.volume_index].chapters[pos.chapter_index])
    }

    pub fn chapter_mut(&mut self, chapter_id: &str) -> Result<&mut Chapter, NovelError> {
        let pos = self
            .chapter_position(chapter_id)
            .ok_or_else(|| NovelError::ChapterNotFound(chapter_id.to_string()))?;
        Ok(&mut self.volumes[pos.volume_index].chapters[pos.chapter_index])
    }

    /// 删除章节，返回被删除的章节
    pub fn remove_chapter(&mut self, chapter_id: &str) -> Result<Chapter, NovelError> {
        let pos = self
            .chapter_position(chapter_id)
            .ok_or_else(|| NovelError::ChapterNotFound(chapter_id.to_string()))?;
        Ok(self.volumes[pos.volume_index]
            .chapters
            .remove(pos.chapter_index))
    }

    /// 「Volume N Chapter M: 标题」，找不到时为 None
    pub fn chapter_label(&self, chapter_id: &str) -> Option<String> {
        let pos = self.chapter_position(chapter_id)?;
        let chapter = &self.volumes[pos.volume_index].chapters[pos.chapter_index];
        Some(pos.label(&chapter.title))
    }

    /// 所有章节按叙事顺序展开
    pub fn chapters_in_order(&self) -> impl Iterator<Item = (ChapterPosition, &Chapter)> {
        self.volumes
            .iter()
            .enumerate()
            .flat_map(|(volume_index, volume)| {
                volume
                    .chapters
                    .iter()
                    .enumerate()
                    .map(move |(chapter_index, chapter)| {
                        (
                            ChapterPosition {
                                volume_index,
                                chapter_index,
                            },
                            chapter,
                        )
                    })
            })
    }

    // ------------------------------------------------------------------
    // 伏笔
    // ------------------------------------------------------------------

    pub fn foreshadowing_labels(&self, foreshadowing: &Foreshadowing) -> ForeshadowingLabels {
        ForeshadowingLabels {
            origin: foreshadowing
                .chapter_id
                .as_deref()
                .and_then(|id| self.chapter_label(id)),
            resolution: foreshadowing
                .resolved_chapter_id
                .as_deref()
                .and_then(|id| self.chapter_label(id)),
        }
    }

    /// 回收章节不在埋设章节之后时给出提示；不阻止保存
    pub fn resolution_order_warning(&self, foreshadowing: &Foreshadowing) -> Option<String> {
        let origin_id = foreshadowing.chapter_id.as_deref()?;
        let resolved_id = foreshadowing.resolved_chapter_id.as_deref()?;
        let origin = self.chapter_position(origin_id)?;
        let resolved = self.chapter_position(resolved_id)?;
        if resolved > origin {
            None
        } else {
            Some(format!(
                "resolving chapter {} does not come after {}",
                resolved.label(&self.volumes[resolved.volume_index].chapters[resolved.chapter_index].title),
                origin.label(&self.volumes[origin.volume_index].chapters[origin.chapter_index].title),
            ))
        }
    }

    // ------------------------------------------------------------------
    // 扁平记录
    // ------------------------------------------------------------------

    pub fn entity<E: NovelEntity>(&self, id: &str) -> Option<&E> {
        E::collection(self).iter().find(|e| e.id() == id)
    }

    pub fn push_entity<E: NovelEntity>(&mut self, entity: E) {
        E::collection_mut(self).push(entity);
    }

    /// 按 ID 原位替换，保留插入顺序；找不到时追加
    pub fn replace_entity<E: NovelEntity>(&mut self, id: &str, entity: E) {
        let items = E::collection_mut(self);
        match items.iter_mut().find(|e| e.id() == id) {
            Some(slot) => *slot = entity,
            None => items.push(entity),
        }
    }

    pub fn remove_entity<E: NovelEntity>(&mut self, id: &str) -> Result<E, NovelError> {
        let items = E::collection_mut(self);
        let index = items
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| NovelError::EntityNotFound {
                kind: E::KIND,
                id: id.to_string(),
            })?;
        Ok(items.remove(index))
    }
}

/// 作品列表中的条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NovelSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 作品库至少保留一部作品；`total` 为删除前的数量
pub fn ensure_deletable(total: usize) -> Result<(), NovelError> {
    if total <= 1 {
        Err(NovelError::LastNovel)
    } else {
        Ok(())
    }
}

/// 新建作品
#[derive(Debug, Clone, Default, Serialize)]
pub struct NovelDraft {
    pub title: String,
    pub genre: String,
    pub synopsis: String,
}

/// 作品元数据的部分更新
#[derive(Debug, Clone, Default, Serialize)]
pub struct NovelPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<String>,
}

impl NovelPatch {
    pub fn outline(outline: impl Into<String>) -> Self {
        Self {
            outline: Some(outline.into()),
            ..Default::default()
        }
    }

    /// 把补丁应用到本地副本
    pub fn apply_to(&self, novel: &mut Novel) {
        if let Some(title) = &self.title {
            novel.title = title.clone();
        }
        if let Some(genre) = &self.genre {
            novel.genre = genre.clone();
        }
        if let Some(synopsis) = &self.synopsis {
            novel.synopsis = synopsis.clone();
        }
        if let Some(outline) = &self.outline {
            novel.outline = outline.clone();
        }
    }
}
