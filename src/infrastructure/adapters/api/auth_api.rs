//! HTTP Auth API

use async_trait::async_trait;

use super::paths;
use crate::application::ports::{
    ApiError, AuthPort, AuthSession, Credentials, HttpMethod, Registration, TokenPair, User,
};
use crate::infrastructure::http::{exchange_refresh_token, ApiClient, RequestOptions};

pub struct HttpAuthApi {
    client: ApiClient,
}

impl HttpAuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthPort for HttpAuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        // 登录失败的 401 不能触发刷新
        self.client
            .request(
                paths::LOGIN,
                RequestOptions::json(HttpMethod::Post, credentials)?,
                false,
            )
            .await
    }

    async fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError> {
        self.client
            .request(
                paths::REGISTER,
                RequestOptions::json(HttpMethod::Post, registration)?,
                false,
            )
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        exchange_refresh_token(self.client.transport().as_ref(), refresh_token).await
    }

    async fn me(&self) -> Result<User, ApiError> {
        self.client.get(paths::ME).await
    }
}
