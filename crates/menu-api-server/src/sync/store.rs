//! Persistence collaborator contract consumed by the reconciliation engine.
//!
//! Each method is its own transaction boundary; no cross-call transaction
//! is assumed. The sqlx-backed [`crate::database::Repository`] implements
//! this trait in production; tests use the in-memory fake below.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::HierarchyRow;

use super::diff::{DishPatch, MenuPatch, SubmenuPatch};
use super::tree::{DishRecord, MenuRecord, SubmenuRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait MenuStore: Send + Sync {
    /// Full menu x submenu x dish x discount outer join, parent legs always
    /// present, child legs nullable.
    async fn hierarchy_snapshot(&self) -> Result<Vec<HierarchyRow>, StoreError>;

    async fn insert_menu(&self, record: &MenuRecord) -> Result<(), StoreError>;
    async fn update_menu(&self, id: Uuid, patch: &MenuPatch) -> Result<(), StoreError>;
    async fn delete_menu(&self, id: Uuid) -> Result<(), StoreError>;

    async fn insert_submenu(&self, record: &SubmenuRecord) -> Result<(), StoreError>;
    async fn update_submenu(&self, id: Uuid, patch: &SubmenuPatch) -> Result<(), StoreError>;
    async fn delete_submenu(&self, id: Uuid) -> Result<(), StoreError>;

    async fn insert_dish(&self, record: &DishRecord) -> Result<(), StoreError>;
    async fn update_dish(&self, id: Uuid, patch: &DishPatch) -> Result<(), StoreError>;
    async fn delete_dish(&self, id: Uuid) -> Result<(), StoreError>;

    async fn insert_discount(&self, dish_id: Uuid, value: Decimal) -> Result<(), StoreError>;
    async fn update_discount(&self, id: Uuid, value: Decimal) -> Result<(), StoreError>;
    async fn delete_discount(&self, id: Uuid) -> Result<(), StoreError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`MenuStore`] with write logging and failure injection,
    //! shared by the apply/runner tests.

    use super::*;
    use crate::database::models::{DiscountRow, DishRow, MenuRow, SubmenuRow};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct StoreState {
        pub menus: BTreeMap<Uuid, MenuRow>,
        pub submenus: BTreeMap<Uuid, SubmenuRow>,
        pub dishes: BTreeMap<Uuid, DishRow>,
        pub discounts: BTreeMap<Uuid, DiscountRow>,
        /// Human-readable log of every applied write, in order.
        pub write_log: Vec<String>,
    }

    #[derive(Default)]
    pub struct MemoryStore {
        pub state: Mutex<StoreState>,
        /// Fail once this many writes have been applied.
        pub fail_after: Mutex<Option<usize>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed(&self, seed: impl FnOnce(&mut StoreState)) {
            seed(&mut self.state.lock().unwrap());
        }

        pub fn fail_after(&self, writes: usize) {
            *self.fail_after.lock().unwrap() = Some(writes);
        }

        pub fn write_log(&self) -> Vec<String> {
            self.state.lock().unwrap().write_log.clone()
        }

        fn write(&self, entry: String) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            if let Some(limit) = *self.fail_after.lock().unwrap() {
                if state.write_log.len() >= limit {
                    return Err(StoreError::Backend("injected failure".to_string()));
                }
            }
            state.write_log.push(entry);
            Ok(())
        }
    }

    #[async_trait]
    impl MenuStore for MemoryStore {
        async fn hierarchy_snapshot(&self) -> Result<Vec<HierarchyRow>, StoreError> {
            let state = self.state.lock().unwrap();
            let mut rows = Vec::new();
            for menu in state.menus.values() {
                let submenus: Vec<&SubmenuRow> = state
                    .submenus
                    .values()
                    .filter(|s| s.menu_id == menu.id)
                    .collect();
                if submenus.is_empty() {
                    rows.push(join_row(menu, None, None, None));
                    continue;
                }
                for submenu in submenus {
                    let dishes: Vec<&DishRow> = state
                        .dishes
                        .values()
                        .filter(|d| d.submenu_id == submenu.id)
                        .collect();
                    if dishes.is_empty() {
                        rows.push(join_row(menu, Some(submenu), None, None));
                        continue;
                    }
                    for dish in dishes {
                        let discount = state.discounts.values().find(|dc| dc.dish_id == dish.id);
                        rows.push(join_row(menu, Some(submenu), Some(dish), discount));
                    }
                }
            }
            Ok(rows)
        }

        async fn insert_menu(&self, record: &MenuRecord) -> Result<(), StoreError> {
            self.write(format!("create menu[{}]", record.id))?;
            self.state.lock().unwrap().menus.insert(
                record.id,
                MenuRow {
                    id: record.id,
                    title: record.title.clone(),
                    description: record.description.clone(),
                },
            );
            Ok(())
        }

        async fn update_menu(&self, id: Uuid, patch: &MenuPatch) -> Result<(), StoreError> {
            self.write(format!("update menu[{id}]"))?;
            let mut state = self.state.lock().unwrap();
            if let Some(menu) = state.menus.get_mut(&id) {
                if let Some(title) = &patch.title {
                    menu.title = title.clone();
                }
                if let Some(description) = &patch.description {
                    menu.description = description.clone();
                }
            }
            Ok(())
        }

        async fn delete_menu(&self, id: Uuid) -> Result<(), StoreError> {
            self.write(format!("delete menu[{id}]"))?;
            let mut state = self.state.lock().unwrap();
            state.menus.remove(&id);
            let submenu_ids: Vec<Uuid> = state
                .submenus
                .values()
                .filter(|s| s.menu_id == id)
                .map(|s| s.id)
                .collect();
            for submenu_id in submenu_ids {
                cascade_delete_submenu(&mut state, submenu_id);
            }
            Ok(())
        }

        async fn insert_submenu(&self, record: &SubmenuRecord) -> Result<(), StoreError> {
            self.write(format!("create submenu[{}]", record.id))?;
            self.state.lock().unwrap().submenus.insert(
                record.id,
                SubmenuRow {
                    id: record.id,
                    title: record.title.clone(),
                    description: record.description.clone(),
                    menu_id: record.menu_id,
                },
            );
            Ok(())
        }

        async fn update_submenu(&self, id: Uuid, patch: &SubmenuPatch) -> Result<(), StoreError> {
            self.write(format!("update submenu[{id}]"))?;
            let mut state = self.state.lock().unwrap();
            if let Some(submenu) = state.submenus.get_mut(&id) {
                if let Some(title) = &patch.title {
                    submenu.title = title.clone();
                }
                if let Some(description) = &patch.description {
                    submenu.description = description.clone();
                }
            }
            Ok(())
        }

        async fn delete_submenu(&self, id: Uuid) -> Result<(), StoreError> {
            self.write(format!("delete submenu[{id}]"))?;
            cascade_delete_submenu(&mut self.state.lock().unwrap(), id);
            Ok(())
        }

        async fn insert_dish(&self, record: &DishRecord) -> Result<(), StoreError> {
            self.write(format!("create dish[{}]", record.id))?;
            self.state.lock().unwrap().dishes.insert(
                record.id,
                DishRow {
                    id: record.id,
                    title: record.title.clone(),
                    description: record.description.clone(),
                    price: record.price,
                    submenu_id: record.submenu_id,
                },
            );
            Ok(())
        }

        async fn update_dish(&self, id: Uuid, patch: &DishPatch) -> Result<(), StoreError> {
            self.write(format!("update dish[{id}]"))?;
            let mut state = self.state.lock().unwrap();
            if let Some(dish) = state.dishes.get_mut(&id) {
                if let Some(title) = &patch.title {
                    dish.title = title.clone();
                }
                if let Some(description) = &patch.description {
                    dish.description = description.clone();
                }
                if let Some(price) = patch.price {
                    dish.price = price;
                }
            }
            Ok(())
        }

        async fn delete_dish(&self, id: Uuid) -> Result<(), StoreError> {
            self.write(format!("delete dish[{id}]"))?;
            let mut state = self.state.lock().unwrap();
            state.dishes.remove(&id);
            state.discounts.retain(|_, dc| dc.dish_id != id);
            Ok(())
        }

        async fn insert_discount(&self, dish_id: Uuid, value: Decimal) -> Result<(), StoreError> {
            self.write(format!("create discount for dish[{dish_id}]"))?;
            let id = Uuid::new_v4();
            self.state
                .lock()
                .unwrap()
                .discounts
                .insert(id, DiscountRow { id, value, dish_id });
            Ok(())
        }

        async fn update_discount(&self, id: Uuid, value: Decimal) -> Result<(), StoreError> {
            self.write(format!("update discount[{id}]"))?;
            if let Some(discount) = self.state.lock().unwrap().discounts.get_mut(&id) {
                discount.value = value;
            }
            Ok(())
        }

        async fn delete_discount(&self, id: Uuid) -> Result<(), StoreError> {
            self.write(format!("delete discount[{id}]"))?;
            self.state.lock().unwrap().discounts.remove(&id);
            Ok(())
        }
    }

    fn cascade_delete_submenu(state: &mut StoreState, submenu_id: Uuid) {
        state.submenus.remove(&submenu_id);
        let dish_ids: Vec<Uuid> = state
            .dishes
            .values()
            .filter(|d| d.submenu_id == submenu_id)
            .map(|d| d.id)
            .collect();
        for dish_id in dish_ids {
            state.dishes.remove(&dish_id);
            state.discounts.retain(|_, dc| dc.dish_id != dish_id);
        }
    }

    fn join_row(
        menu: &MenuRow,
        submenu: Option<&SubmenuRow>,
        dish: Option<&DishRow>,
        discount: Option<&DiscountRow>,
    ) -> HierarchyRow {
        HierarchyRow {
            menu_id: menu.id,
            menu_title: menu.title.clone(),
            menu_description: menu.description.clone(),
            submenu_id: submenu.map(|s| s.id),
            submenu_title: submenu.map(|s| s.title.clone()),
            submenu_description: submenu.map(|s| s.description.clone()),
            dish_id: dish.map(|d| d.id),
            dish_title: dish.map(|d| d.title.clone()),
            dish_description: dish.map(|d| d.description.clone()),
            dish_price: dish.map(|d| d.price),
            discount_id: discount.map(|dc| dc.id),
            discount_value: discount.map(|dc| dc.value),
        }
    }
}
