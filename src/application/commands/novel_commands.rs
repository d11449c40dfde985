//! Novel Commands

/// 创建作品命令
#[derive(Debug, Clone)]
pub struct CreateNovel {
    pub title: String,
    pub genre: String,
    pub synopsis: String,
}

/// 删除作品命令
#[derive(Debug, Clone)]
pub struct DeleteNovel {
    pub novel_id: String,
    /// 删除前客户端已知的作品数量
    pub known_total: usize,
}

/// 取消任务命令
#[derive(Debug, Clone)]
pub struct CancelTask {
    pub task_id: String,
}
