//! Novel Queries

/// 列出当前用户的作品
#[derive(Debug, Clone)]
pub struct ListNovels;

/// 作品下仍在运行的任务
#[derive(Debug, Clone)]
pub struct ListActiveTasks {
    pub novel_id: String,
}

/// 单个任务的当前状态
#[derive(Debug, Clone)]
pub struct GetTask {
    pub task_id: String,
}
