//! HTTP Entity Repository
//!
//! 人物、设定、时间线、伏笔共用一个泛型实现，路径由 `RestResource` 决定

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

use super::paths::{Listing, RestResource};
use crate::application::ports::{ApiError, EntityRepositoryPort};
use crate::infrastructure::http::ApiClient;

pub struct HttpEntityRepository<E> {
    client: ApiClient,
    _entity: PhantomData<fn() -> E>,
}

impl<E> HttpEntityRepository<E> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E> EntityRepositoryPort<E> for HttpEntityRepository<E>
where
    E: RestResource + Serialize + DeserializeOwned,
{
    async fn list(&self, novel_id: &str) -> Result<Vec<E>, ApiError> {
        let listing: Listing<E> = self.client.get(&E::collection_path(novel_id)).await?;
        Ok(listing.into_vec())
    }

    async fn create(&self, novel_id: &str, entity: &E) -> Result<E, ApiError> {
        let created: E = self
            .client
            .post(&E::collection_path(novel_id), entity)
            .await?;
        tracing::debug!(
            kind = E::KIND,
            novel_id = %novel_id,
            entity_id = %created.id(),
            "Entity created"
        );
        Ok(created)
    }

    async fn update(&self, novel_id: &str, entity: &E) -> Result<E, ApiError> {
        self.client
            .put(&E::item_path(novel_id, entity.id()), entity)
            .await
    }

    async fn delete(&self, novel_id: &str, entity_id: &str) -> Result<(), ApiError> {
        self.client.delete(&E::item_path(novel_id, entity_id)).await
    }
}
