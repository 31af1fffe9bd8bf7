use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::SubmenuRow;
use crate::database::Repository;
use crate::models::{
    CreateSubmenuRequest, SubmenuDetailResponse, SubmenuResponse, UpdateSubmenuRequest,
};
use crate::sync::diff::{EntityScope, SubmenuPatch};
use crate::utils::ApiError;

use super::cache::{cached, evict, keys, ResponseCache};

pub struct SubmenusService {
    repository: Arc<Repository>,
    cache: Arc<dyn ResponseCache>,
}

impl SubmenusService {
    pub fn new(repository: Arc<Repository>, cache: Arc<dyn ResponseCache>) -> Self {
        Self { repository, cache }
    }

    pub async fn list(&self, menu_id: Uuid) -> Result<Vec<SubmenuResponse>, ApiError> {
        self.ensure_menu(menu_id).await?;
        cached(self.cache.as_ref(), &keys::submenu_list(menu_id), async {
            let rows = self.repository.list_submenus(menu_id).await?;
            Ok(rows.into_iter().map(SubmenuResponse::from).collect())
        })
        .await
    }

    pub async fn get(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
    ) -> Result<SubmenuDetailResponse, ApiError> {
        cached(
            self.cache.as_ref(),
            &keys::submenu_detail(menu_id, submenu_id),
            async {
                let submenu = self.get_submenu_or_404(menu_id, submenu_id).await?;
                let dishes_count = self.repository.submenu_dish_count(submenu_id).await?;
                Ok(SubmenuDetailResponse {
                    id: submenu.id,
                    title: submenu.title,
                    description: submenu.description,
                    menu_id: submenu.menu_id,
                    dishes_count,
                })
            },
        )
        .await
    }

    pub async fn create(
        &self,
        menu_id: Uuid,
        data: CreateSubmenuRequest,
    ) -> Result<SubmenuResponse, ApiError> {
        self.ensure_menu(menu_id).await?;
        let row = self
            .repository
            .create_submenu_row(Uuid::new_v4(), &data.title, &data.description, menu_id)
            .await?;
        self.invalidate(menu_id, row.id).await;
        Ok(row.into())
    }

    pub async fn update(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        data: UpdateSubmenuRequest,
    ) -> Result<SubmenuResponse, ApiError> {
        self.get_submenu_or_404(menu_id, submenu_id).await?;
        let patch = SubmenuPatch {
            title: data.title,
            description: data.description,
        };
        let row = self
            .repository
            .update_submenu_row(submenu_id, &patch)
            .await?
            .ok_or_else(|| ApiError::NotFound("submenu not found".to_string()))?;
        self.invalidate(menu_id, submenu_id).await;
        Ok(row.into())
    }

    pub async fn delete(&self, menu_id: Uuid, submenu_id: Uuid) -> Result<(), ApiError> {
        self.get_submenu_or_404(menu_id, submenu_id).await?;
        self.repository.delete_submenu_row(submenu_id).await?;
        self.invalidate(menu_id, submenu_id).await;
        Ok(())
    }

    pub async fn get_submenu_or_404(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
    ) -> Result<SubmenuRow, ApiError> {
        self.repository
            .get_submenu(menu_id, submenu_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("submenu not found".to_string()))
    }

    async fn ensure_menu(&self, menu_id: Uuid) -> Result<(), ApiError> {
        self.repository
            .get_menu(menu_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound("menu not found".to_string()))
    }

    async fn invalidate(&self, menu_id: Uuid, submenu_id: Uuid) {
        let patterns = keys::submenu_patterns(&EntityScope::submenu(menu_id, submenu_id));
        evict(self.cache.as_ref(), &patterns).await;
    }
}
