//! Event Publisher Implementation
//!
//! 客户端事件广播：全局通道收到全部事件，作品通道只收该作品的事件

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{ClientEvent, EventSinkPort};

const CHANNEL_CAPACITY: usize = 100;

/// 事件发布器
pub struct EventPublisher {
    /// novel_id -> broadcast sender
    novel_channels: DashMap<String, broadcast::Sender<ClientEvent>>,
    /// 全局通道（会话过期等与作品无关的事件也在这里）
    global_channel: broadcast::Sender<ClientEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            novel_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全部事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<ClientEvent> {
        self.global_channel.subscribe()
    }

    /// 订阅某个作品的事件（打开工作区时）
    pub fn subscribe_novel(&self, novel_id: &str) -> broadcast::Receiver<ClientEvent> {
        self.novel_channels
            .entry(novel_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// 关闭工作区时取消作品通道
    pub fn unregister_novel(&self, novel_id: &str) {
        self.novel_channels.remove(novel_id);
    }

    fn publish_to_novel(&self, novel_id: &str, event: ClientEvent) {
        if let Some(sender) = self.novel_channels.get(novel_id) {
            if let Err(e) = sender.send(event) {
                tracing::debug!(
                    novel_id = %novel_id,
                    error = %e,
                    "Failed to publish novel event (no receivers)"
                );
            }
        }
    }
}

impl EventSinkPort for EventPublisher {
    fn publish(&self, event: ClientEvent) {
        if let Some(novel_id) = event.novel_id() {
            self.publish_to_novel(novel_id, event.clone());
        }
        if let Err(e) = self.global_channel.send(event) {
            tracing::debug!(error = %e, "Failed to publish event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_receivers_is_fine() {
        let publisher = EventPublisher::new();
        publisher.publish(ClientEvent::SessionExpired);
    }

    #[tokio::test]
    async fn test_novel_events_routed_to_novel_channel() {
        let publisher = EventPublisher::new();
        let mut global = publisher.subscribe_global();
        let mut n1 = publisher.subscribe_novel("n1");
        let mut n2 = publisher.subscribe_novel("n2");

        publisher.publish(ClientEvent::TaskCompleted {
            novel_id: "n1".to_string(),
            task_id: "t1".to_string(),
        });
        publisher.publish(ClientEvent::SessionExpired);

        assert!(matches!(n1.recv().await.unwrap(), ClientEvent::TaskCompleted { .. }));
        assert!(n1.try_recv().is_err());
        assert!(n2.try_recv().is_err());
        assert!(matches!(global.recv().await.unwrap(), ClientEvent::TaskCompleted { .. }));
        assert_eq!(global.recv().await.unwrap(), ClientEvent::SessionExpired);
    }

    #[test]
    fn test_event_wire_format() {
        let event = ClientEvent::PersistFailed {
            novel_id: "n1".to_string(),
            kind: "Character".to_string(),
            entity_id: "c1".to_string(),
            error: "request failed: 500".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "PersistFailed");
        assert_eq!(value["data"]["entity_id"], "c1");
    }
}
