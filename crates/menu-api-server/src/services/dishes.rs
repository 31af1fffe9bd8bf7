use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::DishRow;
use crate::database::Repository;
use crate::models::{CreateDishRequest, DishResponse, UpdateDishRequest};
use crate::sync::diff::{DishPatch, EntityScope};
use crate::utils::ApiError;

use super::cache::{cached, evict, keys, ResponseCache};

pub struct DishesService {
    repository: Arc<Repository>,
    cache: Arc<dyn ResponseCache>,
}

impl DishesService {
    pub fn new(repository: Arc<Repository>, cache: Arc<dyn ResponseCache>) -> Self {
        Self { repository, cache }
    }

    pub async fn list(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
    ) -> Result<Vec<DishResponse>, ApiError> {
        self.ensure_submenu(menu_id, submenu_id).await?;
        cached(
            self.cache.as_ref(),
            &keys::dish_list(menu_id, submenu_id),
            async {
                let rows = self.repository.list_dishes(submenu_id).await?;
                Ok(rows.into_iter().map(DishResponse::from).collect())
            },
        )
        .await
    }

    pub async fn get(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
    ) -> Result<DishResponse, ApiError> {
        cached(
            self.cache.as_ref(),
            &keys::dish_detail(menu_id, submenu_id, dish_id),
            async {
                let dish = self.get_dish_or_404(submenu_id, dish_id).await?;
                Ok(dish.into())
            },
        )
        .await
    }

    pub async fn create(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        data: CreateDishRequest,
    ) -> Result<DishResponse, ApiError> {
        self.ensure_submenu(menu_id, submenu_id).await?;
        let row = self
            .repository
            .create_dish_row(
                Uuid::new_v4(),
                &data.title,
                &data.description,
                data.price.round_dp(2),
                submenu_id,
            )
            .await?;
        self.invalidate(menu_id, submenu_id, row.id).await;
        Ok(row.into())
    }

    pub async fn update(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
        data: UpdateDishRequest,
    ) -> Result<DishResponse, ApiError> {
        self.get_dish_or_404(submenu_id, dish_id).await?;
        let patch = DishPatch {
            title: data.title,
            description: data.description,
            price: data.price.map(|price| price.round_dp(2)),
        };
        let row = self
            .repository
            .update_dish_row(dish_id, &patch)
            .await?
            .ok_or_else(|| ApiError::NotFound("dish not found".to_string()))?;
        self.invalidate(menu_id, submenu_id, dish_id).await;
        Ok(row.into())
    }

    pub async fn delete(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
    ) -> Result<(), ApiError> {
        self.get_dish_or_404(submenu_id, dish_id).await?;
        self.repository.delete_dish_row(dish_id).await?;
        self.invalidate(menu_id, submenu_id, dish_id).await;
        Ok(())
    }

    async fn get_dish_or_404(&self, submenu_id: Uuid, dish_id: Uuid) -> Result<DishRow, ApiError> {
        self.repository
            .get_dish(submenu_id, dish_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("dish not found".to_string()))
    }

    async fn ensure_submenu(&self, menu_id: Uuid, submenu_id: Uuid) -> Result<(), ApiError> {
        self.repository
            .get_submenu(menu_id, submenu_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound("submenu not found".to_string()))
    }

    async fn invalidate(&self, menu_id: Uuid, submenu_id: Uuid, dish_id: Uuid) {
        let patterns = keys::dish_patterns(&EntityScope::dish(menu_id, submenu_id, dish_id));
        evict(self.cache.as_ref(), &patterns).await;
    }
}
