//! Task Context - 后端长任务
//!
//! 生成请求（大纲、人物、章节）由后端创建任务，客户端只观察其状态。

mod result;
mod record;

pub use result::TaskResult;
pub use record::{Task, TaskKind, TaskStatus};
