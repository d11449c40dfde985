//! Novel Context - Entities
//!
//! 与后端交换的值类型记录。客户端不持有权威副本，
//! 每次修改都以服务端返回的记录为准。

use serde::{Deserialize, Serialize};

use super::Novel;

/// 小说内可独立增删改的扁平记录（人物、设定、时间线、伏笔）
///
/// 记录按插入顺序渲染；`collection`/`collection_mut` 指向聚合内对应列表。
pub trait NovelEntity: Clone + Send + Sync + 'static {
    /// 用于日志和错误信息的类型名
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn collection(novel: &Novel) -> &[Self];

    fn collection_mut(novel: &mut Novel) -> &mut Vec<Self>;
}

/// 卷 - 在小说内有序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chapters: Vec<Chapter>,
}

impl Volume {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            summary: None,
            outline: None,
            chapters: Vec::new(),
        }
    }
}

/// 章节
///
/// 列表接口返回的章节只带 `has_content` 标记，正文按需加载。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    /// 给 AI 写作的提示
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_content: Option<bool>,
}

impl Chapter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            summary: String::new(),
            content: String::new(),
            ai_prompt: None,
            has_content: None,
        }
    }

    /// 服务端是否有正文
    pub fn has_content(&self) -> bool {
        self.has_content.unwrap_or(!self.content.is_empty())
    }

    /// 服务端有正文但本地尚未加载
    pub fn needs_content_fetch(&self) -> bool {
        self.has_content == Some(true) && self.content.is_empty()
    }
}

/// 人物
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub background: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<String>,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            role: String::new(),
            description: String::new(),
            personality: String::new(),
            background: String::new(),
            relationships: None,
        }
    }
}

impl NovelEntity for Character {
    const KIND: &'static str = "Character";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn collection(novel: &Novel) -> &[Self] {
        &novel.characters
    }

    fn collection_mut(novel: &mut Novel) -> &mut Vec<Self> {
        &mut novel.characters
    }
}

/// 世界观设定分类（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldCategory {
    #[serde(alias = "Geography")]
    Geography,
    #[serde(alias = "Society")]
    Society,
    #[serde(alias = "magic/technology", alias = "Magic/Technology", alias = "magic")]
    MagicTechnology,
    #[serde(alias = "History")]
    History,
    #[default]
    #[serde(other)]
    Other,
}

impl WorldCategory {
    pub const ALL: [WorldCategory; 5] = [
        WorldCategory::Geography,
        WorldCategory::Society,
        WorldCategory::MagicTechnology,
        WorldCategory::History,
        WorldCategory::Other,
    ];

    /// 展示用名称
    pub fn label(&self) -> &'static str {
        match self {
            WorldCategory::Geography => "Geography",
            WorldCategory::Society => "Society",
            WorldCategory::MagicTechnology => "Magic/Technology",
            WorldCategory::History => "History",
            WorldCategory::Other => "Other",
        }
    }
}

/// 世界观设定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSetting {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: WorldCategory,
    #[serde(default)]
    pub description: String,
}

impl WorldSetting {
    pub fn new(name: impl Into<String>, category: WorldCategory) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            category,
            description: String::new(),
        }
    }
}

impl NovelEntity for WorldSetting {
    const KIND: &'static str = "WorldSetting";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn collection(novel: &Novel) -> &[Self] {
        &novel.world_settings
    }

    fn collection_mut(novel: &mut Novel) -> &mut Vec<Self> {
        &mut novel.world_settings
    }
}

/// 时间线事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// 故事内时间（自由文本，如「第三年春」）
    #[serde(default)]
    pub time: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "chapterId", skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<String>,
}

impl TimelineEvent {
    pub fn new(time: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            time: time.into(),
            title: title.into(),
            description: String::new(),
            chapter_id: None,
        }
    }
}

impl NovelEntity for TimelineEvent {
    const KIND: &'static str = "TimelineEvent";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn collection(novel: &Novel) -> &[Self] {
        &novel.timeline_events
    }

    fn collection_mut(novel: &mut Novel) -> &mut Vec<Self> {
        &mut novel.timeline_events
    }
}

/// 伏笔
///
/// `resolved_chapter_id` 理应指向 `chapter_id` 之后的章节，客户端不强制。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Foreshadowing {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub content: String,
    #[serde(default, alias = "chapterId")]
    pub chapter_id: Option<String>,
    #[serde(default, alias = "resolvedChapterId")]
    pub resolved_chapter_id: Option<String>,
    /// 线上格式为字符串 "true"/"false"
    #[serde(default, with = "resolved_flag")]
    pub resolved: bool,
}

impl Foreshadowing {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            content: content.into(),
            chapter_id: None,
            resolved_chapter_id: None,
            resolved: false,
        }
    }
}

impl NovelEntity for Foreshadowing {
    const KIND: &'static str = "Foreshadowing";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn collection(novel: &Novel) -> &[Self] {
        &novel.foreshadowings
    }

    fn collection_mut(novel: &mut Novel) -> &mut Vec<Self> {
        &mut novel.foreshadowings
    }
}

/// 布尔值以字符串形式收发；输入也接受真正的 JSON 布尔
mod resolved_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "true" } else { "false" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Option::<Flag>::deserialize(deserializer)? {
            Some(Flag::Bool(b)) => b,
            Some(Flag::Text(s)) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s == "1"
            }
            None => false,
        })
    }
}
