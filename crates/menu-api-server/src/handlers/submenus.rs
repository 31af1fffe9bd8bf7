use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::models::{
    CreateSubmenuRequest, SubmenuDetailResponse, SubmenuResponse, UpdateSubmenuRequest,
};
use crate::state::AppState;
use crate::utils::ApiError;

pub async fn list_submenus(
    State(state): State<AppState>,
    Path(menu_id): Path<Uuid>,
) -> Result<Json<Vec<SubmenuResponse>>, ApiError> {
    Ok(Json(state.submenus.list(menu_id).await?))
}

pub async fn create_submenu(
    State(state): State<AppState>,
    Path(menu_id): Path<Uuid>,
    Json(data): Json<CreateSubmenuRequest>,
) -> Result<(StatusCode, Json<SubmenuResponse>), ApiError> {
    Ok((
        StatusCode::CREATED,
        Json(state.submenus.create(menu_id, data).await?),
    ))
}

pub async fn detail_submenu(
    State(state): State<AppState>,
    Path((menu_id, submenu_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SubmenuDetailResponse>, ApiError> {
    Ok(Json(state.submenus.get(menu_id, submenu_id).await?))
}

pub async fn update_submenu(
    State(state): State<AppState>,
    Path((menu_id, submenu_id)): Path<(Uuid, Uuid)>,
    Json(data): Json<UpdateSubmenuRequest>,
) -> Result<Json<SubmenuResponse>, ApiError> {
    Ok(Json(state.submenus.update(menu_id, submenu_id, data).await?))
}

pub async fn delete_submenu(
    State(state): State<AppState>,
    Path((menu_id, submenu_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.submenus.delete(menu_id, submenu_id).await?;
    Ok(StatusCode::OK)
}
