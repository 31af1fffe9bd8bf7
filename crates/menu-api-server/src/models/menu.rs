use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::MenuRow;

use super::submenu::SubmenuTreeResponse;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMenuRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMenuRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

impl From<MenuRow> for MenuResponse {
    fn from(row: MenuRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
        }
    }
}

/// Menu detail with aggregate child counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub submenus_count: i64,
    pub dishes_count: i64,
}

/// One menu of the full-hierarchy response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuTreeResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub submenus: Vec<SubmenuTreeResponse>,
}
