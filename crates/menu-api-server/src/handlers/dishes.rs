use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::models::{CreateDishRequest, DishResponse, UpdateDishRequest};
use crate::state::AppState;
use crate::utils::ApiError;

pub async fn list_dishes(
    State(state): State<AppState>,
    Path((menu_id, submenu_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<DishResponse>>, ApiError> {
    Ok(Json(state.dishes.list(menu_id, submenu_id).await?))
}

pub async fn create_dish(
    State(state): State<AppState>,
    Path((menu_id, submenu_id)): Path<(Uuid, Uuid)>,
    Json(data): Json<CreateDishRequest>,
) -> Result<(StatusCode, Json<DishResponse>), ApiError> {
    Ok((
        StatusCode::CREATED,
        Json(state.dishes.create(menu_id, submenu_id, data).await?),
    ))
}

pub async fn detail_dish(
    State(state): State<AppState>,
    Path((menu_id, submenu_id, dish_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<DishResponse>, ApiError> {
    Ok(Json(state.dishes.get(menu_id, submenu_id, dish_id).await?))
}

pub async fn update_dish(
    State(state): State<AppState>,
    Path((menu_id, submenu_id, dish_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(data): Json<UpdateDishRequest>,
) -> Result<Json<DishResponse>, ApiError> {
    Ok(Json(
        state
            .dishes
            .update(menu_id, submenu_id, dish_id, data)
            .await?,
    ))
}

pub async fn delete_dish(
    State(state): State<AppState>,
    Path((menu_id, submenu_id, dish_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.dishes.delete(menu_id, submenu_id, dish_id).await?;
    Ok(StatusCode::OK)
}
