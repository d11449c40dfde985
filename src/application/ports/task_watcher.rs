//! Task Watcher Port - 统一的长任务观察
//!
//! 无论更新来自轮询（拉）还是 SSE（推），调用方看到的都是同一组三个回调。

use crate::domain::task::Task;

/// 任务观察者
///
/// 每个任务恰好收到一次终止回调（`on_complete` 或 `on_error`），
/// 之后不再有任何回调。
pub trait TaskObserver: Send + Sync {
    fn on_progress(&self, task: &Task);

    fn on_complete(&self, task: &Task);

    fn on_error(&self, task: &Task);
}

/// Task Watcher Port
///
/// 每个任务 ID 同时最多一个活动观察；对同一 ID 再次 `watch` 会先取消旧的。
pub trait TaskWatcherPort: Send + Sync {
    fn watch(&self, task_id: &str, observer: std::sync::Arc<dyn TaskObserver>);

    /// 幂等
    fn unwatch(&self, task_id: &str);

    fn unwatch_all(&self);

    fn is_watching(&self, task_id: &str) -> bool;
}
