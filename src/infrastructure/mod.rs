//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod events;
pub mod http;
pub mod memory;
pub mod persistence;
pub mod sse;
pub mod worker;

pub use adapters::{build_backend, ReqwestTransport, ReqwestTransportConfig};
pub use events::EventPublisher;
pub use http::{ApiClient, RefreshCoordinator};
pub use memory::InMemoryTokenStore;
pub use persistence::sled::{SledLocalStore, SledStoreConfig};
pub use worker::{StreamTaskWatcher, TaskPoller, TaskPollerConfig};
