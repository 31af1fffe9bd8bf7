//! In-memory shapes of the menu hierarchy used by the diff pass.
//!
//! Both sides of the comparison are held in the same nested-map layout:
//! menu id -> submenu id -> dish id. `IndexMap` keeps file/query order so
//! generated operations stay deterministic.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::database::models::{DishRow, MenuRow, SubmenuRow};

/// Menu fields as parsed from the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

/// Submenu fields as parsed from the source file, with the owning menu id
/// inherited from the parser context.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmenuRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub menu_id: Uuid,
}

/// Dish fields as parsed from the source file, with the owning submenu id
/// inherited from the parser context.
#[derive(Debug, Clone, PartialEq)]
pub struct DishRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub submenu_id: Uuid,
}

/// Hierarchy parsed from the external source for one run.
#[derive(Debug, Default)]
pub struct SourceTree {
    pub menus: IndexMap<Uuid, SourceMenu>,
}

#[derive(Debug)]
pub struct SourceMenu {
    pub record: MenuRecord,
    pub submenus: IndexMap<Uuid, SourceSubmenu>,
}

#[derive(Debug)]
pub struct SourceSubmenu {
    pub record: SubmenuRecord,
    pub dishes: IndexMap<Uuid, DishRecord>,
}

/// Hierarchy loaded from storage for one run.
#[derive(Debug, Default)]
pub struct DbTree {
    pub menus: IndexMap<Uuid, DbMenu>,
}

#[derive(Debug)]
pub struct DbMenu {
    pub row: MenuRow,
    pub submenus: IndexMap<Uuid, DbSubmenu>,
}

#[derive(Debug)]
pub struct DbSubmenu {
    pub row: SubmenuRow,
    pub dishes: IndexMap<Uuid, DishRow>,
}
