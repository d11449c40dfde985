//! Watch Registry - 每个任务 ID 至多一个活动观察
//!
//! 每次注册分配递增的 generation。被替换或停止的观察循环
//! 即使恰好拿到终止状态，也会因为 generation 不匹配而放弃回调。

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::TaskObserver;
use crate::domain::task::{Task, TaskStatus};

struct WatchHandle {
    generation: u64,
    token: CancellationToken,
}

/// 一次注册的凭据，交给观察循环持有
pub(crate) struct WatchLease {
    pub task_id: String,
    pub generation: u64,
    pub token: CancellationToken,
}

#[derive(Default)]
pub(crate) struct WatchRegistry {
    handles: DashMap<String, WatchHandle>,
    next_generation: AtomicU64,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册新的观察，先取消同 ID 的旧观察
    pub fn register(&self, task_id: &str) -> WatchLease {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let previous = self.handles.insert(
            task_id.to_string(),
            WatchHandle {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
            tracing::debug!(
                task_id = %task_id,
                replaced_generation = previous.generation,
                "Previous watch cancelled"
            );
        }

        WatchLease {
            task_id: task_id.to_string(),
            generation,
            token,
        }
    }

    /// 幂等
    pub fn cancel(&self, task_id: &str) -> bool {
        match self.handles.remove(task_id) {
            Some((_, handle)) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) -> usize {
        let ids: Vec<String> = self.handles.iter().map(|e| e.key().clone()).collect();
        ids.iter().filter(|id| self.cancel(id)).count()
    }

    /// 以终止状态结束一次观察；只有仍是当前 generation 时返回 true
    pub fn finish(&self, lease: &WatchLease) -> bool {
        self.handles
            .remove_if(&lease.task_id, |_, h| h.generation == lease.generation)
            .is_some()
    }

    pub fn is_active(&self, task_id: &str) -> bool {
        self.handles.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }
}

/// 派发终止回调；每个 lease 至多成功一次
pub(crate) fn dispatch_terminal(
    registry: &WatchRegistry,
    lease: &WatchLease,
    observer: &Arc<dyn TaskObserver>,
    task: &Task,
) {
    if !registry.finish(lease) {
        tracing::debug!(task_id = %lease.task_id, "Watch superseded, dropping terminal update");
        return;
    }

    match task.status {
        TaskStatus::Completed => {
            tracing::info!(task_id = %lease.task_id, "Task completed");
            observer.on_complete(task);
        }
        _ => {
            tracing::info!(
                task_id = %lease.task_id,
                error = %task.failure_message(),
                "Task failed"
            );
            observer.on_error(task);
        }
    }
}

/// 派发进度回调；已取消的观察不回调
pub(crate) fn dispatch_progress(lease: &WatchLease, observer: &Arc<dyn TaskObserver>, task: &Task) {
    if lease.token.is_cancelled() {
        return;
    }
    tracing::debug!(
        task_id = %lease.task_id,
        status = task.status.as_str(),
        progress = task.progress,
        "Task progress"
    );
    observer.on_progress(task);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_replaces_and_cancels_previous() {
        let registry = WatchRegistry::new();
        let first = registry.register("t1");
        let second = registry.register("t1");

        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
        assert_eq!(registry.len(), 1);

        // 旧 lease 无法结束新的观察
        assert!(!registry.finish(&first));
        assert!(registry.is_active("t1"));
        assert!(registry.finish(&second));
        assert!(!registry.is_active("t1"));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let registry = WatchRegistry::new();
        let lease = registry.register("t1");

        assert!(registry.cancel("t1"));
        assert!(!registry.cancel("t1"));
        assert!(lease.token.is_cancelled());
        assert!(!registry.finish(&lease));
    }

    #[test]
    fn test_cancel_all() {
        let registry = WatchRegistry::new();
        let a = registry.register("a");
        let b = registry.register("b");

        assert_eq!(registry.cancel_all(), 2);
        assert!(a.token.is_cancelled() && b.token.is_cancelled());
        assert_eq!(registry.len(), 0);
    }
}
