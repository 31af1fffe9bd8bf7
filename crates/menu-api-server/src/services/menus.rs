use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::MenuRow;
use crate::database::Repository;
use crate::models::{
    CreateMenuRequest, MenuDetailResponse, MenuResponse, MenuTreeResponse, SubmenuTreeResponse,
    UpdateMenuRequest,
};
use crate::sync::diff::{EntityScope, MenuPatch};
use crate::sync::snapshot::fold_hierarchy;
use crate::utils::ApiError;

use super::cache::{cached, evict, keys, ResponseCache};

pub struct MenusService {
    repository: Arc<Repository>,
    cache: Arc<dyn ResponseCache>,
}

impl MenusService {
    pub fn new(repository: Arc<Repository>, cache: Arc<dyn ResponseCache>) -> Self {
        Self { repository, cache }
    }

    pub async fn list(&self) -> Result<Vec<MenuResponse>, ApiError> {
        cached(self.cache.as_ref(), &keys::menu_list(), async {
            let rows = self.repository.list_menus().await?;
            Ok(rows.into_iter().map(MenuResponse::from).collect())
        })
        .await
    }

    pub async fn get(&self, menu_id: Uuid) -> Result<MenuDetailResponse, ApiError> {
        cached(self.cache.as_ref(), &keys::menu_detail(menu_id), async {
            let menu = self.get_menu_or_404(menu_id).await?;
            let (submenus_count, dishes_count) = self.repository.menu_counts(menu_id).await?;
            Ok(MenuDetailResponse {
                id: menu.id,
                title: menu.title,
                description: menu.description,
                submenus_count,
                dishes_count,
            })
        })
        .await
    }

    pub async fn create(&self, data: CreateMenuRequest) -> Result<MenuResponse, ApiError> {
        let row = self
            .repository
            .create_menu_row(Uuid::new_v4(), &data.title, &data.description)
            .await?;
        self.invalidate(row.id).await;
        Ok(row.into())
    }

    pub async fn update(
        &self,
        menu_id: Uuid,
        data: UpdateMenuRequest,
    ) -> Result<MenuResponse, ApiError> {
        let patch = MenuPatch {
            title: data.title,
            description: data.description,
        };
        let row = self
            .repository
            .update_menu_row(menu_id, &patch)
            .await?
            .ok_or_else(|| ApiError::NotFound("menu not found".to_string()))?;
        self.invalidate(menu_id).await;
        Ok(row.into())
    }

    pub async fn delete(&self, menu_id: Uuid) -> Result<(), ApiError> {
        let deleted = self.repository.delete_menu_row(menu_id).await?;
        if !deleted {
            return Err(ApiError::NotFound("menu not found".to_string()));
        }
        self.invalidate(menu_id).await;
        Ok(())
    }

    /// Full hierarchy in one response, built from the same flattened join
    /// the sync snapshot uses.
    pub async fn tree(&self) -> Result<Vec<MenuTreeResponse>, ApiError> {
        cached(self.cache.as_ref(), &keys::menu_tree(), async {
            let snapshot = fold_hierarchy(self.repository.hierarchy_rows().await?);
            let menus = snapshot
                .tree
                .menus
                .into_values()
                .map(|menu| MenuTreeResponse {
                    id: menu.row.id,
                    title: menu.row.title,
                    description: menu.row.description,
                    submenus: menu
                        .submenus
                        .into_values()
                        .map(|submenu| SubmenuTreeResponse {
                            id: submenu.row.id,
                            title: submenu.row.title,
                            description: submenu.row.description,
                            dishes: submenu.dishes.into_values().map(Into::into).collect(),
                        })
                        .collect(),
                })
                .collect();
            Ok(menus)
        })
        .await
    }

    pub async fn get_menu_or_404(&self, menu_id: Uuid) -> Result<MenuRow, ApiError> {
        self.repository
            .get_menu(menu_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("menu not found".to_string()))
    }

    async fn invalidate(&self, menu_id: Uuid) {
        let patterns = keys::menu_patterns(&EntityScope::menu(menu_id));
        evict(self.cache.as_ref(), &patterns).await;
    }
}
