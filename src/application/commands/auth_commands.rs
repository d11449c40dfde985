//! Auth Commands

/// 登录命令
#[derive(Debug, Clone)]
pub struct Login {
    pub username: String,
    pub password: String,
}

/// 注册命令（成功后即为登录状态）
#[derive(Debug, Clone)]
pub struct Register {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// 退出登录命令（只清除本地凭据）
#[derive(Debug, Clone)]
pub struct Logout;

/// 设置当前用户的首选 AI 提供方
#[derive(Debug, Clone)]
pub struct SetPreferredProvider {
    pub provider: String,
}
