//! REST 路径
//!
//! 所有路径相对 base URL（默认 `http://localhost:8000/api`）

use serde::Deserialize;

use crate::domain::novel::{Character, Foreshadowing, NovelEntity, TimelineEvent, WorldSetting};

pub const LOGIN: &str = "/auth/login";
pub const REGISTER: &str = "/auth/register";
pub const ME: &str = "/auth/me";
pub const NOVELS: &str = "/novels";

pub fn novel(novel_id: &str) -> String {
    format!("/novels/{}", novel_id)
}

pub fn volumes(novel_id: &str) -> String {
    format!("/novels/{}/volumes", novel_id)
}

pub fn volume(novel_id: &str, volume_id: &str) -> String {
    format!("/novels/{}/volumes/{}", novel_id, volume_id)
}

pub fn volume_chapters(novel_id: &str, volume_id: &str) -> String {
    format!("/novels/{}/volumes/{}/chapters", novel_id, volume_id)
}

pub fn chapter(novel_id: &str, chapter_id: &str) -> String {
    format!("/novels/{}/chapters/{}", novel_id, chapter_id)
}

pub fn chapter_write_stream(novel_id: &str, chapter_id: &str) -> String {
    format!("/novels/{}/chapters/{}/write/stream", novel_id, chapter_id)
}

/// `what` ∈ outline / characters / chapters
pub fn generate(novel_id: &str, what: &str) -> String {
    format!("/novels/{}/generate/{}", novel_id, what)
}

pub fn task(task_id: &str) -> String {
    format!("/tasks/{}", task_id)
}

pub fn task_cancel(task_id: &str) -> String {
    format!("/tasks/{}/cancel", task_id)
}

pub fn task_events(task_id: &str) -> String {
    format!("/tasks/{}/events", task_id)
}

pub fn active_tasks(novel_id: &str) -> String {
    format!("/novels/{}/tasks?active=true", novel_id)
}

/// 扁平记录对应的 REST 集合
pub trait RestResource: NovelEntity {
    const SEGMENT: &'static str;

    fn collection_path(novel_id: &str) -> String {
        format!("/novels/{}/{}", novel_id, Self::SEGMENT)
    }

    fn item_path(novel_id: &str, entity_id: &str) -> String {
        format!("/novels/{}/{}/{}", novel_id, Self::SEGMENT, entity_id)
    }
}

impl RestResource for Character {
    const SEGMENT: &'static str = "characters";
}

impl RestResource for WorldSetting {
    const SEGMENT: &'static str = "world-settings";
}

impl RestResource for TimelineEvent {
    const SEGMENT: &'static str = "timeline-events";
}

impl RestResource for Foreshadowing {
    const SEGMENT: &'static str = "foreshadowings";
}

/// 列表响应：裸数组或包在 `items` / `data` 里
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "data", alias = "novels", alias = "tasks")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Wrapped { items } => items,
        }
    }
}

/// 生成请求的响应
#[derive(Debug, Deserialize)]
pub struct TaskCreated {
    #[serde(alias = "id")]
    pub task_id: String,
}
