//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Novel Context: 作品聚合与扁平记录
//! - Task Context: 后端长任务
//! - Generation Context: 流式写作事件

pub mod generation;
pub mod novel;
pub mod task;

pub(crate) mod timestamp;
