//! Auth Queries

/// 当前登录用户（优先本地缓存）
#[derive(Debug, Clone)]
pub struct GetCurrentUser;

/// 当前用户的首选 AI 提供方
#[derive(Debug, Clone)]
pub struct GetPreferredProvider;
