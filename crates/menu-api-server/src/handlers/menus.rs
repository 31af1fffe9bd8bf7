use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::models::{
    CreateMenuRequest, MenuDetailResponse, MenuResponse, MenuTreeResponse, UpdateMenuRequest,
};
use crate::state::AppState;
use crate::utils::ApiError;

pub async fn list_menus(
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuResponse>>, ApiError> {
    Ok(Json(state.menus.list().await?))
}

pub async fn create_menu(
    State(state): State<AppState>,
    Json(data): Json<CreateMenuRequest>,
) -> Result<(StatusCode, Json<MenuResponse>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.menus.create(data).await?)))
}

pub async fn detail_menu(
    State(state): State<AppState>,
    Path(menu_id): Path<Uuid>,
) -> Result<Json<MenuDetailResponse>, ApiError> {
    Ok(Json(state.menus.get(menu_id).await?))
}

pub async fn update_menu(
    State(state): State<AppState>,
    Path(menu_id): Path<Uuid>,
    Json(data): Json<UpdateMenuRequest>,
) -> Result<Json<MenuResponse>, ApiError> {
    Ok(Json(state.menus.update(menu_id, data).await?))
}

pub async fn delete_menu(
    State(state): State<AppState>,
    Path(menu_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.menus.delete(menu_id).await?;
    Ok(StatusCode::OK)
}

pub async fn menu_tree(
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuTreeResponse>>, ApiError> {
    Ok(Json(state.menus.tree().await?))
}
