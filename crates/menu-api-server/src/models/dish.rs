use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::DishRow;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDishRequest {
    pub title: String,
    pub description: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDishRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
}

/// Price is serialized as a two-decimal string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: String,
    pub submenu_id: Uuid,
}

impl From<DishRow> for DishResponse {
    fn from(row: DishRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: format!("{:.2}", row.price),
            submenu_id: row.submenu_id,
        }
    }
}
