//! Auth Command Handlers

use std::sync::Arc;

use crate::application::commands::{Login, Logout, Register, SetPreferredProvider};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AuthPort, AuthSession, Credentials, PreferenceStorePort, Registration, TokenStorePort, User,
};

/// 保存令牌并缓存用户；响应里没有用户时再取一次 `me`
async fn establish_session(
    session: AuthSession,
    auth: &dyn AuthPort,
    tokens: &dyn TokenStorePort,
    preferences: &dyn PreferenceStorePort,
) -> Result<User, ApplicationError> {
    tokens.set_tokens(&session.access_token, &session.refresh_token)?;

    let user = match session.user {
        Some(user) => user,
        None => auth.me().await?,
    };
    preferences.set_cached_user(&user)?;

    tracing::info!(user_id = %user.id, username = %user.username, "Session established");
    Ok(user)
}

// ============================================================================
// Login
// ============================================================================

pub struct LoginHandler {
    auth: Arc<dyn AuthPort>,
    tokens: Arc<dyn TokenStorePort>,
    preferences: Arc<dyn PreferenceStorePort>,
}

impl LoginHandler {
    pub fn new(
        auth: Arc<dyn AuthPort>,
        tokens: Arc<dyn TokenStorePort>,
        preferences: Arc<dyn PreferenceStorePort>,
    ) -> Self {
        Self {
            auth,
            tokens,
            preferences,
        }
    }

    pub async fn handle(&self, command: Login) -> Result<User, ApplicationError> {
        let credentials = Credentials {
            username: command.username,
            password: command.password,
        };
        let session = self.auth.login(&credentials).await?;
        establish_session(
            session,
            self.auth.as_ref(),
            self.tokens.as_ref(),
            self.preferences.as_ref(),
        )
        .await
    }
}

// ============================================================================
// Register
// ============================================================================

pub struct RegisterHandler {
    auth: Arc<dyn AuthPort>,
    tokens: Arc<dyn TokenStorePort>,
    preferences: Arc<dyn PreferenceStorePort>,
}

impl RegisterHandler {
    pub fn new(
        auth: Arc<dyn AuthPort>,
        tokens: Arc<dyn TokenStorePort>,
        preferences: Arc<dyn PreferenceStorePort>,
    ) -> Self {
        Self {
            auth,
            tokens,
            preferences,
        }
    }

    pub async fn handle(&self, command: Register) -> Result<User, ApplicationError> {
        let registration = Registration {
            username: command.username,
            email: command.email,
            password: command.password,
        };
        let session = self.auth.register(&registration).await?;
        establish_session(
            session,
            self.auth.as_ref(),
            self.tokens.as_ref(),
            self.preferences.as_ref(),
        )
        .await
    }
}

// ============================================================================
// Logout
// ============================================================================

pub struct LogoutHandler {
    tokens: Arc<dyn TokenStorePort>,
    preferences: Arc<dyn PreferenceStorePort>,
}

impl LogoutHandler {
    pub fn new(tokens: Arc<dyn TokenStorePort>, preferences: Arc<dyn PreferenceStorePort>) -> Self {
        Self {
            tokens,
            preferences,
        }
    }

    /// 首选提供方按用户保存，不随退出清除
    pub fn handle(&self, _command: Logout) -> Result<(), ApplicationError> {
        self.tokens.clear_tokens()?;
        self.preferences.clear_cached_user()?;
        tracing::info!("Logged out");
        Ok(())
    }
}

// ============================================================================
// SetPreferredProvider
// ============================================================================

pub struct SetPreferredProviderHandler {
    preferences: Arc<dyn PreferenceStorePort>,
}

impl SetPreferredProviderHandler {
    pub fn new(preferences: Arc<dyn PreferenceStorePort>) -> Self {
        Self { preferences }
    }

    pub fn handle(&self, command: SetPreferredProvider) -> Result<(), ApplicationError> {
        let user = self
            .preferences
            .cached_user()?
            .ok_or(ApplicationError::SessionExpired)?;
        self.preferences
            .set_preferred_provider(&user.id, &command.provider)?;
        tracing::debug!(user_id = %user.id, provider = %command.provider, "Preferred provider set");
        Ok(())
    }
}
