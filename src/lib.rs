//! Novelist - AI 小说写作后端的异步客户端
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Novel Context: 作品聚合（卷、章节、人物、设定、时间线、伏笔）
//! - Task Context: 后端长任务与结果
//! - Generation Context: 流式写作事件与阶段缓冲
//!
//! 应用层 (application/):
//! - Ports: 端口定义（Transport, Repositories, Generation, TaskWatcher, TokenStore, EventSink）
//! - Commands / Queries: CQRS 处理器
//! - Views: 作品库与工作区，乐观更新
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: 请求客户端 + 单飞刷新
//! - SSE: 增量解码与事件映射
//! - Worker: 任务轮询与推送观察
//! - Persistence: Sled 本地凭据与偏好
//! - Adapters: reqwest 传输、REST 仓储
//! - Events: 客户端事件广播

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
