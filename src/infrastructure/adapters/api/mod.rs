//! REST API Adapter - 后端各端口的 HTTP 实现

mod auth_api;
mod entity_repo;
mod generation_api;
mod novel_repo;
pub mod paths;

pub use auth_api::HttpAuthApi;
pub use entity_repo::HttpEntityRepository;
pub use generation_api::HttpGenerationApi;
pub use novel_repo::HttpNovelRepository;
pub use paths::RestResource;

use std::sync::Arc;

use crate::application::ports::{EventSinkPort, GenerationPort, TaskWatcherPort};
use crate::application::BackendPorts;
use crate::config::{PollingConfig, WatchMode};
use crate::infrastructure::http::ApiClient;
use crate::infrastructure::worker::{StreamTaskWatcher, TaskPoller, TaskPollerConfig};

/// 按配置组装全部后端端口；任务观察方式由 `polling.mode` 决定
pub fn build_backend(
    client: ApiClient,
    polling: &PollingConfig,
    events: Arc<dyn EventSinkPort>,
) -> BackendPorts {
    let generation: Arc<dyn GenerationPort> = Arc::new(HttpGenerationApi::new(client.clone()));

    let watcher: Arc<dyn TaskWatcherPort> = match polling.mode {
        WatchMode::Poll => Arc::new(TaskPoller::new(
            generation.clone(),
            TaskPollerConfig::from(polling),
        )),
        WatchMode::Stream => Arc::new(StreamTaskWatcher::new(generation.clone())),
    };

    tracing::debug!(mode = ?polling.mode, interval_ms = polling.interval_ms, "Backend ports assembled");

    BackendPorts {
        novels: Arc::new(HttpNovelRepository::new(client.clone())),
        characters: Arc::new(HttpEntityRepository::new(client.clone())),
        world_settings: Arc::new(HttpEntityRepository::new(client.clone())),
        timeline_events: Arc::new(HttpEntityRepository::new(client.clone())),
        foreshadowings: Arc::new(HttpEntityRepository::new(client)),
        generation,
        watcher,
        events,
    }
}
