//! Events - 客户端事件发布

mod publisher;

pub use publisher::EventPublisher;
