//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（传输、仓储、生成、任务观察、本地存储、事件）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - views: 作品库与作品工作区（乐观更新）
//! - observers: 任务回调适配
//! - error: 应用层错误定义

mod auth_service;
mod backend;

pub mod commands;
pub mod error;
pub mod observers;
pub mod ports;
pub mod queries;
pub mod views;

pub use auth_service::AuthService;
pub use backend::{BackedEntity, BackendPorts};
pub use error::ApplicationError;
pub use observers::{wait_for_task, ChannelObserver, EventForwardingObserver, TaskUpdate};
pub use views::{
    ChapterStreamSession, EditorView, EntityView, Library, NovelWorkspace, OutlineView,
    StreamReport,
};

pub use commands::{
    handlers::{
        CancelTaskHandler, CreateNovelHandler, DeleteNovelHandler, LoginHandler, LogoutHandler,
        RegisterHandler, SetPreferredProviderHandler,
    },
    CancelTask, CreateNovel, DeleteNovel, Login, Logout, Register, SetPreferredProvider,
};

pub use queries::{
    handlers::{
        CurrentUserHandler, GetTaskHandler, ListActiveTasksHandler, ListNovelsHandler,
        PreferredProviderHandler,
    },
    GetCurrentUser, GetPreferredProvider, GetTask, ListActiveTasks, ListNovels,
};
