//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod api;
mod auth;
mod events;
mod generation;
mod repositories;
mod task_watcher;
mod token_store;

pub use api::{
    ApiError, ByteStream, HttpMethod, StreamResponse, TransportError, TransportPort,
    TransportRequest, TransportResponse,
};
pub use auth::{AuthPort, AuthSession, Credentials, Registration};
pub use events::{ClientEvent, EventSinkPort};
pub use generation::{
    AgentEventStream, ChapterBatchRequest, ChapterWriteRequest, GenerationOptions,
    GenerationPort, TaskEventStream,
};
pub use repositories::{EntityRepositoryPort, NovelRepositoryPort};
pub use task_watcher::{TaskObserver, TaskWatcherPort};
pub use token_store::{PreferenceStorePort, TokenPair, TokenStoreError, TokenStorePort, User};
