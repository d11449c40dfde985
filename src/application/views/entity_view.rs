//! Entity View - 扁平记录的乐观增删改
//!
//! 先改本地，再请求后端；成功后以服务端记录为准，
//! 失败时发布 `PersistFailed` 并返回错误，本地修改保留。

use std::marker::PhantomData;

use super::workspace::NovelWorkspace;
use crate::application::backend::BackedEntity;
use crate::application::error::ApplicationError;
use crate::domain::novel::{
    is_provisional, provisional_id, Foreshadowing, ForeshadowingLabels, TimelineEvent,
    WorldCategory, WorldSetting,
};

pub struct EntityView<'a, E: BackedEntity> {
    workspace: &'a NovelWorkspace,
    _marker: PhantomData<E>,
}

impl<'a, E: BackedEntity> EntityView<'a, E> {
    pub(crate) fn new(workspace: &'a NovelWorkspace) -> Self {
        Self {
            workspace,
            _marker: PhantomData,
        }
    }

    /// 按插入顺序
    pub async fn list(&self) -> Vec<E> {
        self.workspace.read(|novel| E::collection(novel).to_vec()).await
    }

    pub async fn get(&self, id: &str) -> Option<E> {
        self.workspace
            .read(|novel| novel.entity::<E>(id).cloned())
            .await
    }

    /// 从后端重新拉取整个列表
    pub async fn reload(&self) -> Result<Vec<E>, ApplicationError> {
        let repo = E::repository(self.workspace.ports());
        let items = repo.list(self.workspace.novel_id()).await?;
        self.workspace
            .mutate(|novel| *E::collection_mut(novel) = items.clone())
            .await;
        Ok(items)
    }

    /// 以临时 ID 立即加入本地，服务端确认后换成规范记录
    pub async fn create(&self, mut entity: E) -> Result<E, ApplicationError> {
        let local_id = provisional_id();
        entity.set_id(local_id.clone());
        self.workspace
            .mutate(|novel| novel.push_entity(entity.clone()))
            .await;

        let mut outgoing = entity;
        outgoing.set_id(String::new());

        let repo = E::repository(self.workspace.ports());
        match repo.create(self.workspace.novel_id(), &outgoing).await {
            Ok(saved) => {
                let replaced = self
                    .workspace
                    .mutate(|novel| {
                        if novel.entity::<E>(&local_id).is_some() {
                            novel.replace_entity(&local_id, saved.clone());
                            true
                        } else {
                            false
                        }
                    })
                    .await;
                if !replaced {
                    tracing::debug!(
                        kind = E::KIND,
                        local_id = %local_id,
                        "Provisional record removed before the server answered"
                    );
                }
                tracing::debug!(kind = E::KIND, id = %saved.id(), "Record created");
                Ok(saved)
            }
            Err(e) => Err(self.workspace.persist_failed(E::KIND, &local_id, e)),
        }
    }

    pub async fn update(&self, entity: E) -> Result<E, ApplicationError> {
        let id = entity.id().to_string();
        if is_provisional(&id) {
            return Err(ApplicationError::invalid_state(format!(
                "{} {} has not been saved yet",
                E::KIND,
                id
            )));
        }

        let found = self
            .workspace
            .mutate(|novel| {
                if novel.entity::<E>(&id).is_some() {
                    novel.replace_entity(&id, entity.clone());
                    true
                } else {
                    false
                }
            })
            .await;
        if !found {
            return Err(ApplicationError::not_found(E::KIND, id));
        }

        let repo = E::repository(self.workspace.ports());
        match repo.update(self.workspace.novel_id(), &entity).await {
            Ok(saved) => {
                self.workspace
                    .mutate(|novel| novel.replace_entity(&id, saved.clone()))
                    .await;
                Ok(saved)
            }
            Err(e) => Err(self.workspace.persist_failed(E::KIND, &id, e)),
        }
    }

    /// 未保存过的记录只在本地删除
    pub async fn delete(&self, id: &str) -> Result<(), ApplicationError> {
        self.workspace
            .mutate(|novel| novel.remove_entity::<E>(id))
            .await?;

        if is_provisional(id) {
            return Ok(());
        }

        let repo = E::repository(self.workspace.ports());
        repo.delete(self.workspace.novel_id(), id)
            .await
            .map_err(|e| self.workspace.persist_failed(E::KIND, id, e))?;
        tracing::debug!(kind = E::KIND, id = %id, "Record deleted");
        Ok(())
    }
}

impl EntityView<'_, WorldSetting> {
    /// 按分类分组，分类顺序固定，空分类省略
    pub async fn grouped(&self) -> Vec<(WorldCategory, Vec<WorldSetting>)> {
        let settings = self.list().await;
        WorldCategory::ALL
            .iter()
            .filter_map(|category| {
                let group: Vec<WorldSetting> = settings
                    .iter()
                    .filter(|s| s.category == *category)
                    .cloned()
                    .collect();
                (!group.is_empty()).then_some((*category, group))
            })
            .collect()
    }
}

impl EntityView<'_, TimelineEvent> {
    /// 关联到某一章的事件
    pub async fn for_chapter(&self, chapter_id: &str) -> Vec<TimelineEvent> {
        self.list()
            .await
            .into_iter()
            .filter(|e| e.chapter_id.as_deref() == Some(chapter_id))
            .collect()
    }
}

impl EntityView<'_, Foreshadowing> {
    pub async fn labels(&self, foreshadowing: &Foreshadowing) -> ForeshadowingLabels {
        self.workspace
            .read(|novel| novel.foreshadowing_labels(foreshadowing))
            .await
    }

    /// 只是提示，不阻止保存
    pub async fn order_warning(&self, foreshadowing: &Foreshadowing) -> Option<String> {
        self.workspace
            .read(|novel| novel.resolution_order_warning(foreshadowing))
            .await
    }

    /// 标记在某章回收
    pub async fn resolve(
        &self,
        id: &str,
        resolved_chapter_id: &str,
    ) -> Result<Foreshadowing, ApplicationError> {
        let mut foreshadowing = self
            .get(id)
            .await
            .ok_or_else(|| ApplicationError::not_found("Foreshadowing", id))?;
        foreshadowing.resolved_chapter_id = Some(resolved_chapter_id.to_string());
        foreshadowing.resolved = true;

        if let Some(warning) = self.order_warning(&foreshadowing).await {
            tracing::info!(foreshadowing_id = %id, warning = %warning, "Resolution order warning");
        }
        self.update(foreshadowing).await
    }

    pub async fn unresolved(&self) -> Vec<Foreshadowing> {
        self.list()
            .await
            .into_iter()
            .filter(|f| !f.resolved)
            .collect()
    }
}
