//! Event Sink Port - 客户端事件通知
//!
//! UI 层订阅这些事件以显示横幅、强制重新登录等

use serde::{Deserialize, Serialize};

/// 客户端事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// 刷新失败，凭据已清除
    SessionExpired,
    /// 任务进度
    TaskProgress {
        novel_id: String,
        task_id: String,
        progress: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// 任务完成
    TaskCompleted { novel_id: String, task_id: String },
    /// 任务失败
    TaskFailed {
        novel_id: String,
        task_id: String,
        error: String,
    },
    /// 乐观更新未能持久化（本地不回滚）
    PersistFailed {
        novel_id: String,
        kind: String,
        entity_id: String,
        error: String,
    },
    /// 聚合已从后端重新同步
    NovelResynced { novel_id: String },
}

impl ClientEvent {
    /// 事件所属作品
    pub fn novel_id(&self) -> Option<&str> {
        match self {
            ClientEvent::SessionExpired => None,
            ClientEvent::TaskProgress { novel_id, .. }
            | ClientEvent::TaskCompleted { novel_id, .. }
            | ClientEvent::TaskFailed { novel_id, .. }
            | ClientEvent::PersistFailed { novel_id, .. }
            | ClientEvent::NovelResynced { novel_id } => Some(novel_id),
        }
    }
}

/// Event Sink Port
pub trait EventSinkPort: Send + Sync {
    /// 没有订阅者不算错误
    fn publish(&self, event: ClientEvent);
}
