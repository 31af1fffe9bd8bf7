use std::sync::Arc;

use crate::config::Settings;
use crate::database::Repository;
use crate::services::{DishesService, MenusService, SubmenusService};
use crate::sync::SyncRunner;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<Repository>,
    pub menus: Arc<MenusService>,
    pub submenus: Arc<SubmenusService>,
    pub dishes: Arc<DishesService>,
    pub sync_runner: Arc<SyncRunner>,
    pub settings: Settings,
}
