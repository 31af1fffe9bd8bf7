use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct MenuRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct SubmenuRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub menu_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct DishRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub submenu_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct DiscountRow {
    pub id: Uuid,
    pub value: Decimal,
    pub dish_id: Uuid,
}

/// One row of the flattened menu -> submenu -> dish -> discount outer join.
/// Submenu, dish and discount legs are nullable: a menu with no submenus
/// still produces a row.
#[derive(Debug, Clone, FromRow)]
pub struct HierarchyRow {
    pub menu_id: Uuid,
    pub menu_title: String,
    pub menu_description: String,
    pub submenu_id: Option<Uuid>,
    pub submenu_title: Option<String>,
    pub submenu_description: Option<String>,
    pub dish_id: Option<Uuid>,
    pub dish_title: Option<String>,
    pub dish_description: Option<String>,
    pub dish_price: Option<Decimal>,
    pub discount_id: Option<Uuid>,
    pub discount_value: Option<Decimal>,
}
