//! Worker Layer - 长任务观察
//!
//! TaskPoller（拉）与 StreamTaskWatcher（推）实现同一个 TaskWatcherPort

mod registry;
mod stream_watcher;
mod task_poller;

pub use stream_watcher::StreamTaskWatcher;
pub use task_poller::{TaskPoller, TaskPollerConfig};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    use crate::application::ports::TaskObserver;
    use crate::domain::task::Task;

    /// 记录回调顺序的观察者
    #[derive(Default)]
    pub struct RecordingObserver {
        log: Mutex<Vec<String>>,
        terminal: Mutex<Option<Task>>,
        notify: Notify,
    }

    impl RecordingObserver {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        pub async fn wait_terminal(&self) -> Task {
            loop {
                if let Some(task) = self.terminal.lock().unwrap().clone() {
                    return task;
                }
                self.notify.notified().await;
            }
        }

        fn finish(&self, entry: &str, task: &Task) {
            self.log.lock().unwrap().push(entry.to_string());
            *self.terminal.lock().unwrap() = Some(task.clone());
            self.notify.notify_one();
        }
    }

    impl TaskObserver for RecordingObserver {
        fn on_progress(&self, task: &Task) {
            self.log
                .lock()
                .unwrap()
                .push(format!("progress:{}", task.progress));
        }

        fn on_complete(&self, task: &Task) {
            self.finish("complete", task);
        }

        fn on_error(&self, task: &Task) {
            self.finish("error", task);
        }
    }
}
