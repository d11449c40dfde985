//! Backend Ports - 视图与处理器共用的端口集合

use std::sync::Arc;

use crate::application::ports::{
    EntityRepositoryPort, EventSinkPort, GenerationPort, NovelRepositoryPort, TaskWatcherPort,
};
use crate::domain::novel::{Character, Foreshadowing, NovelEntity, TimelineEvent, WorldSetting};

/// 一次会话里所有后端端口的句柄
#[derive(Clone)]
pub struct BackendPorts {
    pub novels: Arc<dyn NovelRepositoryPort>,
    pub characters: Arc<dyn EntityRepositoryPort<Character>>,
    pub world_settings: Arc<dyn EntityRepositoryPort<WorldSetting>>,
    pub timeline_events: Arc<dyn EntityRepositoryPort<TimelineEvent>>,
    pub foreshadowings: Arc<dyn EntityRepositoryPort<Foreshadowing>>,
    pub generation: Arc<dyn GenerationPort>,
    pub watcher: Arc<dyn TaskWatcherPort>,
    pub events: Arc<dyn EventSinkPort>,
}

/// 能从端口集合里找到自己仓储的扁平记录
pub trait BackedEntity: NovelEntity {
    fn repository(ports: &BackendPorts) -> &Arc<dyn EntityRepositoryPort<Self>>;
}

impl BackedEntity for Character {
    fn repository(ports: &BackendPorts) -> &Arc<dyn EntityRepositoryPort<Self>> {
        &ports.characters
    }
}

impl BackedEntity for WorldSetting {
    fn repository(ports: &BackendPorts) -> &Arc<dyn EntityRepositoryPort<Self>> {
        &ports.world_settings
    }
}

impl BackedEntity for TimelineEvent {
    fn repository(ports: &BackendPorts) -> &Arc<dyn EntityRepositoryPort<Self>> {
        &ports.timeline_events
    }
}

impl BackedEntity for Foreshadowing {
    fn repository(ports: &BackendPorts) -> &Arc<dyn EntityRepositoryPort<Self>> {
        &ports.foreshadowings
    }
}
