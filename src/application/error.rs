//! 应用层错误定义
//!
//! 视图、命令、查询统一返回的错误类型

use thiserror::Error;

use crate::application::ports::{ApiError, TokenStoreError};
use crate::domain::novel::NovelError;

/// 应用层错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApplicationError {
    /// 凭据失效且刷新失败，需要重新登录
    #[error("session expired")]
    SessionExpired,

    /// 服务端 4xx，原样展示服务端文案
    #[error("{message}")]
    Validation { status: u16, message: String },

    /// 传输层失败（不自动重试）
    #[error("Network error: {0}")]
    Network(String),

    /// 异步任务以失败结束
    #[error("Task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },

    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 业务规则违反
    #[error("{0}")]
    BusinessRuleViolation(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 本地存储错误
    #[error("Storage error: {0}")]
    Storage(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::BusinessRuleViolation(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// 是否需要重新登录
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

impl From<ApiError> for ApplicationError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::SessionExpired => Self::SessionExpired,
            ApiError::Status { status, message } if (400..500).contains(&status) => {
                Self::Validation { status, message }
            }
            ApiError::Status { status, message } => {
                Self::Network(format!("{} ({})", message, status))
            }
            ApiError::Transport(e) => Self::Network(e.to_string()),
            ApiError::Decode(msg) => Self::Internal(msg),
            ApiError::Store(msg) => Self::Storage(msg),
        }
    }
}

impl From<NovelError> for ApplicationError {
    fn from(err: NovelError) -> Self {
        match err {
            NovelError::VolumeNotFound(id) => Self::not_found("Volume", id),
            NovelError::ChapterNotFound(id) => Self::not_found("Chapter", id),
            NovelError::EntityNotFound { kind, id } => Self::not_found(kind, id),
            NovelError::LastNovel => Self::BusinessRuleViolation(err.to_string()),
        }
    }
}

impl From<TokenStoreError> for ApplicationError {
    fn from(err: TokenStoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
