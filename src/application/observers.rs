//! Task Observers - 任务回调的常用适配
//!
//! - `ChannelObserver`: 回调转成 mpsc 消息，便于 `await` 任务结束
//! - `EventForwardingObserver`: 回调转成 `ClientEvent`，可再串一个内层观察者

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::error::ApplicationError;
use crate::application::ports::{ClientEvent, EventSinkPort, TaskObserver, TaskWatcherPort};
use crate::domain::task::Task;

/// 任务更新消息
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    Progress(Task),
    Completed(Task),
    Failed(Task),
}

impl TaskUpdate {
    pub fn task(&self) -> &Task {
        match self {
            TaskUpdate::Progress(task) | TaskUpdate::Completed(task) | TaskUpdate::Failed(task) => {
                task
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskUpdate::Progress(_))
    }
}

/// 把回调送进无界通道
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<TaskUpdate>,
}

impl ChannelObserver {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<TaskUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn send(&self, update: TaskUpdate) {
        // 接收端已放弃等待
        let _ = self.tx.send(update);
    }
}

impl TaskObserver for ChannelObserver {
    fn on_progress(&self, task: &Task) {
        self.send(TaskUpdate::Progress(task.clone()));
    }

    fn on_complete(&self, task: &Task) {
        self.send(TaskUpdate::Completed(task.clone()));
    }

    fn on_error(&self, task: &Task) {
        self.send(TaskUpdate::Failed(task.clone()));
    }
}

/// 观察任务直到终止；失败转成 `TaskFailed`
pub async fn wait_for_task(
    watcher: &dyn TaskWatcherPort,
    task_id: &str,
) -> Result<Task, ApplicationError> {
    let (observer, rx) = ChannelObserver::new();
    watcher.watch(task_id, observer);
    drain_until_terminal(task_id, rx, |_| {}).await
}

/// 消费更新直到终止，进度交给 `on_progress`
pub async fn drain_until_terminal(
    task_id: &str,
    mut rx: mpsc::UnboundedReceiver<TaskUpdate>,
    mut on_progress: impl FnMut(&Task),
) -> Result<Task, ApplicationError> {
    while let Some(update) = rx.recv().await {
        match update {
            TaskUpdate::Progress(task) => on_progress(&task),
            TaskUpdate::Completed(task) => return Ok(task),
            TaskUpdate::Failed(task) => {
                return Err(ApplicationError::TaskFailed {
                    task_id: task_id.to_string(),
                    message: task.failure_message(),
                })
            }
        }
    }
    Err(ApplicationError::invalid_state(format!(
        "watch for task {} ended without a terminal update",
        task_id
    )))
}

/// 任务完成后要做的事（例如重新同步作品）
pub trait CompletionHook: Send + Sync {
    fn task_completed(&self, task: &Task);
}

/// 把任务回调发布为客户端事件
pub struct EventForwardingObserver {
    novel_id: String,
    events: Arc<dyn EventSinkPort>,
    on_complete: Option<Arc<dyn CompletionHook>>,
    inner: Option<Arc<dyn TaskObserver>>,
}

impl EventForwardingObserver {
    pub fn new(novel_id: impl Into<String>, events: Arc<dyn EventSinkPort>) -> Self {
        Self {
            novel_id: novel_id.into(),
            events,
            on_complete: None,
            inner: None,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn CompletionHook>) -> Self {
        self.on_complete = Some(hook);
        self
    }

    pub fn chain(mut self, inner: Arc<dyn TaskObserver>) -> Self {
        self.inner = Some(inner);
        self
    }

    /// 任务自带 novel_id 时优先使用
    fn novel_id_for(&self, task: &Task) -> String {
        if task.novel_id.is_empty() {
            self.novel_id.clone()
        } else {
            task.novel_id.clone()
        }
    }
}

impl TaskObserver for EventForwardingObserver {
    fn on_progress(&self, task: &Task) {
        self.events.publish(ClientEvent::TaskProgress {
            novel_id: self.novel_id_for(task),
            task_id: task.id.clone(),
            progress: task.progress,
            message: task.progress_message.clone(),
        });
        if let Some(inner) = &self.inner {
            inner.on_progress(task);
        }
    }

    fn on_complete(&self, task: &Task) {
        self.events.publish(ClientEvent::TaskCompleted {
            novel_id: self.novel_id_for(task),
            task_id: task.id.clone(),
        });
        if let Some(hook) = &self.on_complete {
            hook.task_completed(task);
        }
        if let Some(inner) = &self.inner {
            inner.on_complete(task);
        }
    }

    fn on_error(&self, task: &Task) {
        self.events.publish(ClientEvent::TaskFailed {
            novel_id: self.novel_id_for(task),
            task_id: task.id.clone(),
            error: task.failure_message(),
        });
        if let Some(inner) = &self.inner {
            inner.on_error(task);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// 记录发布过的事件
    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<ClientEvent>>,
    }

    impl RecordingSink {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn events(&self) -> Vec<ClientEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventSinkPort for RecordingSink {
        fn publish(&self, event: ClientEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
