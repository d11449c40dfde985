//! Task Poller - 拉取式任务观察
//!
//! 每个任务一个后台循环：立即拉取一次，未终止则回调进度并等待固定间隔再拉。
//! 拉取失败（传输或解析）视为终止失败，不重试。
//! 同一任务内的 tick 严格顺序执行，不同任务互不影响。

use std::sync::Arc;
use std::time::Duration;

use super::registry::{dispatch_progress, dispatch_terminal, WatchLease, WatchRegistry};
use crate::application::ports::{GenerationPort, TaskObserver, TaskWatcherPort};
use crate::config::PollingConfig;
use crate::domain::task::Task;

/// Poller 配置
#[derive(Debug, Clone)]
pub struct TaskPollerConfig {
    /// 两次拉取之间的间隔
    pub interval: Duration,
}

impl Default for TaskPollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
        }
    }
}

impl From<&PollingConfig> for TaskPollerConfig {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
        }
    }
}

/// Task Poller
///
/// 必须在 tokio 运行时内调用 `start_polling`
pub struct TaskPoller {
    api: Arc<dyn GenerationPort>,
    registry: Arc<WatchRegistry>,
    config: TaskPollerConfig,
}

impl TaskPoller {
    pub fn new(api: Arc<dyn GenerationPort>, config: TaskPollerConfig) -> Self {
        Self {
            api,
            registry: Arc::new(WatchRegistry::new()),
            config,
        }
    }

    /// 开始轮询；同 ID 的旧轮询先被取消
    pub fn start_polling(&self, task_id: &str, observer: Arc<dyn TaskObserver>) {
        let lease = self.registry.register(task_id);

        tracing::debug!(
            task_id = %task_id,
            generation = lease.generation,
            interval_ms = self.config.interval.as_millis() as u64,
            "Polling started"
        );

        tokio::spawn(poll_loop(
            lease,
            self.api.clone(),
            self.registry.clone(),
            observer,
            self.config.interval,
        ));
    }

    /// 幂等
    pub fn stop_polling(&self, task_id: &str) {
        if self.registry.cancel(task_id) {
            tracing::debug!(task_id = %task_id, "Polling stopped");
        }
    }

    /// 导航离开或退出时清理全部轮询
    pub fn stop_all_polling(&self) {
        let stopped = self.registry.cancel_all();
        if stopped > 0 {
            tracing::debug!(count = stopped, "All polling stopped");
        }
    }

    pub fn is_polling(&self, task_id: &str) -> bool {
        self.registry.is_active(task_id)
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }
}

async fn poll_loop(
    lease: WatchLease,
    api: Arc<dyn GenerationPort>,
    registry: Arc<WatchRegistry>,
    observer: Arc<dyn TaskObserver>,
    interval: Duration,
) {
    loop {
        let fetched = tokio::select! {
            biased;
            _ = lease.token.cancelled() => return,
            fetched = api.get_task(&lease.task_id) => fetched,
        };

        let task = match fetched {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(task_id = %lease.task_id, error = %e, "Task poll failed");
                Task::synthesized_failure(&lease.task_id, e.to_string())
            }
        };

        if task.is_terminal() {
            dispatch_terminal(&registry, &lease, &observer, &task);
            return;
        }

        dispatch_progress(&lease, &observer, &task);

        tokio::select! {
            biased;
            _ = lease.token.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

impl TaskWatcherPort for TaskPoller {
    fn watch(&self, task_id: &str, observer: Arc<dyn TaskObserver>) {
        self.start_polling(task_id, observer);
    }

    fn unwatch(&self, task_id: &str) {
        self.stop_polling(task_id);
    }

    fn unwatch_all(&self) {
        self.stop_all_polling();
    }

    fn is_watching(&self, task_id: &str) -> bool {
        self.is_polling(task_id)
    }
}

impl Drop for TaskPoller {
    fn drop(&mut self) {
        self.registry.cancel_all();
    }
}
