//! Auth Service - 登录会话的入口
//!
//! 组合登录、注册、退出和当前用户相关的处理器

use std::sync::Arc;

use crate::application::commands::handlers::{
    LoginHandler, LogoutHandler, RegisterHandler, SetPreferredProviderHandler,
};
use crate::application::commands::{Login, Logout, Register, SetPreferredProvider};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AuthPort, GenerationOptions, PreferenceStorePort, TokenStorePort, User,
};
use crate::application::queries::handlers::{CurrentUserHandler, PreferredProviderHandler};
use crate::application::queries::{GetCurrentUser, GetPreferredProvider};

pub struct AuthService {
    login: LoginHandler,
    register: RegisterHandler,
    logout: LogoutHandler,
    current_user: CurrentUserHandler,
    set_provider: SetPreferredProviderHandler,
    get_provider: PreferredProviderHandler,
}

impl AuthService {
    pub fn new(
        auth: Arc<dyn AuthPort>,
        tokens: Arc<dyn TokenStorePort>,
        preferences: Arc<dyn PreferenceStorePort>,
    ) -> Self {
        Self {
            login: LoginHandler::new(auth.clone(), tokens.clone(), preferences.clone()),
            register: RegisterHandler::new(auth.clone(), tokens.clone(), preferences.clone()),
            logout: LogoutHandler::new(tokens.clone(), preferences.clone()),
            current_user: CurrentUserHandler::new(auth, tokens, preferences.clone()),
            set_provider: SetPreferredProviderHandler::new(preferences.clone()),
            get_provider: PreferredProviderHandler::new(preferences),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApplicationError> {
        self.login
            .handle(Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApplicationError> {
        self.register
            .handle(Register {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .await
    }

    pub fn logout(&self) -> Result<(), ApplicationError> {
        self.logout.handle(Logout)
    }

    pub async fn current_user(&self) -> Result<Option<User>, ApplicationError> {
        self.current_user.handle(GetCurrentUser).await
    }

    pub fn preferred_provider(&self) -> Result<Option<String>, ApplicationError> {
        self.get_provider.handle(GetPreferredProvider)
    }

    pub fn set_preferred_provider(&self, provider: &str) -> Result<(), ApplicationError> {
        self.set_provider.handle(SetPreferredProvider {
            provider: provider.to_string(),
        })
    }

    /// 带上用户首选提供方的生成选项
    pub fn generation_options(&self) -> Result<GenerationOptions, ApplicationError> {
        Ok(GenerationOptions {
            provider: self.preferred_provider()?,
            prompt: None,
        })
    }
}
