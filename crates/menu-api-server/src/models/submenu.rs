use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::SubmenuRow;

use super::dish::DishResponse;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubmenuRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubmenuRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmenuResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub menu_id: Uuid,
}

impl From<SubmenuRow> for SubmenuResponse {
    fn from(row: SubmenuRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            menu_id: row.menu_id,
        }
    }
}

/// Submenu detail with its dish count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmenuDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub menu_id: Uuid,
    pub dishes_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmenuTreeResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub dishes: Vec<DishResponse>,
}
