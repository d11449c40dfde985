//! Stream Task Watcher - 推送式任务观察
//!
//! 订阅 `GET /tasks/{id}/events`，每帧是一个任务快照。
//! 回调契约与 TaskPoller 相同：恰好一次终止回调，每个 ID 至多一个活动观察。
//! 流在终止前结束时，再拉取一次任务状态作为结局。

use futures_util::StreamExt;
use std::sync::Arc;

use super::registry::{dispatch_progress, dispatch_terminal, WatchLease, WatchRegistry};
use crate::application::ports::{GenerationPort, TaskObserver, TaskWatcherPort};
use crate::domain::task::Task;

pub struct StreamTaskWatcher {
    api: Arc<dyn GenerationPort>,
    registry: Arc<WatchRegistry>,
}

impl StreamTaskWatcher {
    pub fn new(api: Arc<dyn GenerationPort>) -> Self {
        Self {
            api,
            registry: Arc::new(WatchRegistry::new()),
        }
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }
}

async fn watch_loop(
    lease: WatchLease,
    api: Arc<dyn GenerationPort>,
    registry: Arc<WatchRegistry>,
    observer: Arc<dyn TaskObserver>,
) {
    let opened = tokio::select! {
        biased;
        _ = lease.token.cancelled() => return,
        opened = api.task_events(&lease.task_id) => opened,
    };

    let mut snapshots = match opened {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(task_id = %lease.task_id, error = %e, "Task event stream failed to open");
            let failure = Task::synthesized_failure(&lease.task_id, e.to_string());
            dispatch_terminal(&registry, &lease, &observer, &failure);
            return;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = lease.token.cancelled() => return,
            next = snapshots.next() => next,
        };

        match next {
            Some(Ok(task)) if task.is_terminal() => {
                dispatch_terminal(&registry, &lease, &observer, &task);
                return;
            }
            Some(Ok(task)) => dispatch_progress(&lease, &observer, &task),
            Some(Err(e)) => {
                tracing::warn!(task_id = %lease.task_id, error = %e, "Task event stream interrupted");
                let failure = Task::synthesized_failure(&lease.task_id, e.to_string());
                dispatch_terminal(&registry, &lease, &observer, &failure);
                return;
            }
            None => break,
        }
    }

    tracing::debug!(task_id = %lease.task_id, "Task event stream ended, fetching final state");
    let fetched = tokio::select! {
        biased;
        _ = lease.token.cancelled() => return,
        fetched = api.get_task(&lease.task_id) => fetched,
    };
    let task = match fetched {
        Ok(task) if task.is_terminal() => task,
        Ok(_) => Task::synthesized_failure(&lease.task_id, "task stream ended before completion"),
        Err(e) => Task::synthesized_failure(&lease.task_id, e.to_string()),
    };
    dispatch_terminal(&registry, &lease, &observer, &task);
}

impl TaskWatcherPort for StreamTaskWatcher {
    fn watch(&self, task_id: &str, observer: Arc<dyn TaskObserver>) {
        let lease = self.registry.register(task_id);
        tracing::debug!(task_id = %task_id, generation = lease.generation, "Task stream watch started");
        tokio::spawn(watch_loop(
            lease,
            self.api.clone(),
            self.registry.clone(),
            observer,
        ));
    }

    fn unwatch(&self, task_id: &str) {
        if self.registry.cancel(task_id) {
            tracing::debug!(task_id = %task_id, "Task stream watch stopped");
        }
    }

    fn unwatch_all(&self) {
        self.registry.cancel_all();
    }

    fn is_watching(&self, task_id: &str) -> bool {
        self.registry.is_active(task_id)
    }
}

impl Drop for StreamTaskWatcher {
    fn drop(&mut self) {
        self.registry.cancel_all();
    }
}
