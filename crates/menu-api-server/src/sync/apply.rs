//! Sequential execution of the ordered operation list against the
//! persistence collaborator, followed by one batched cache eviction.
//!
//! There is no transaction across the batch: a store error mid-batch
//! propagates and every operation applied before it stays committed. The
//! next run re-plans from a fresh snapshot, which converges the remainder.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::cache::{keys, ResponseCache};

use super::diff::{Operation, SyncAction};
use super::discount::DiscountOp;
use super::store::{MenuStore, StoreError};

pub struct ChangeApplier {
    store: Arc<dyn MenuStore>,
    cache: Arc<dyn ResponseCache>,
}

impl ChangeApplier {
    pub fn new(store: Arc<dyn MenuStore>, cache: Arc<dyn ResponseCache>) -> Self {
        Self { store, cache }
    }

    pub async fn apply(&self, ops: &[Operation]) -> Result<(), StoreError> {
        if ops.is_empty() {
            info!("Data in source and database are equal");
            return Ok(());
        }

        info!("Apply changes started: {} operation(s)", ops.len());
        let mut patterns: BTreeSet<String> = BTreeSet::new();
        for op in ops {
            self.apply_one(op).await?;
            info!(
                "Applied {} {}[{}]",
                op.action.kind(),
                op.action.entity(),
                op.action.id()
            );
            patterns.extend(keys::patterns_for(op.action.entity(), &op.scope));
        }

        if !patterns.is_empty() {
            info!("Clearing cache");
            let patterns: Vec<String> = patterns.into_iter().collect();
            if let Err(err) = self.cache.delete_by_patterns(&patterns).await {
                // The writes are already durable; TTL heals the cache.
                warn!("Cache eviction failed after apply: {}", err);
            }
        }
        info!("Apply changes finished");
        Ok(())
    }

    async fn apply_one(&self, op: &Operation) -> Result<(), StoreError> {
        match &op.action {
            SyncAction::DeleteMenu { id } => self.store.delete_menu(*id).await,
            SyncAction::UpdateMenu { id, patch } => self.store.update_menu(*id, patch).await,
            SyncAction::CreateMenu { record } => self.store.insert_menu(record).await,
            SyncAction::DeleteSubmenu { id } => self.store.delete_submenu(*id).await,
            SyncAction::UpdateSubmenu { id, patch } => self.store.update_submenu(*id, patch).await,
            SyncAction::CreateSubmenu { record } => self.store.insert_submenu(record).await,
            SyncAction::DeleteDish { id } => self.store.delete_dish(*id).await,
            SyncAction::UpdateDish { id, patch } => self.store.update_dish(*id, patch).await,
            SyncAction::CreateDish { record } => self.store.insert_dish(record).await,
        }
    }

    pub async fn apply_discounts(&self, ops: &[DiscountOp]) -> Result<(), StoreError> {
        for op in ops {
            match op {
                DiscountOp::Create { dish_id, value } => {
                    self.store.insert_discount(*dish_id, *value).await?;
                    info!("Added discount {} percent for dish[{}]", value, dish_id);
                }
                DiscountOp::Update { id, dish_id, value } => {
                    self.store.update_discount(*id, *value).await?;
                    info!("Updated discount to {} percent for dish[{}]", value, dish_id);
                }
                DiscountOp::Delete { id, dish_id, value } => {
                    self.store.delete_discount(*id).await?;
                    info!("Deleted discount {} percent for dish[{}]", value, dish_id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{MenuRow, SubmenuRow};
    use crate::services::cache::testing::RecordingCache;
    use crate::services::cache::MockResponseCache;
    use crate::sync::diff::{EntityScope, MenuPatch, SubmenuPatch};
    use crate::sync::store::testing::MemoryStore;
    use crate::sync::tree::MenuRecord;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn delete_menu_op(id: Uuid) -> Operation {
        Operation {
            action: SyncAction::DeleteMenu { id },
            scope: EntityScope::menu(id),
        }
    }

    fn update_menu_op(id: Uuid, title: &str) -> Operation {
        Operation {
            action: SyncAction::UpdateMenu {
                id,
                patch: MenuPatch {
                    title: Some(title.to_string()),
                    description: None,
                },
            },
            scope: EntityScope::menu(id),
        }
    }

    fn create_menu_op(id: Uuid) -> Operation {
        Operation {
            action: SyncAction::CreateMenu {
                record: MenuRecord {
                    id,
                    title: "Fresh".to_string(),
                    description: "desc".to_string(),
                },
            },
            scope: EntityScope::menu(id),
        }
    }

    #[tokio::test]
    async fn applies_operations_sequentially_and_converges_state() {
        let store = Arc::new(MemoryStore::new());
        store.seed(|state| {
            state.menus.insert(
                uuid(1),
                MenuRow {
                    id: uuid(1),
                    title: "Stale".to_string(),
                    description: "desc".to_string(),
                },
            );
            state.menus.insert(
                uuid(2),
                MenuRow {
                    id: uuid(2),
                    title: "Old".to_string(),
                    description: "desc".to_string(),
                },
            );
        });

        let applier = ChangeApplier::new(store.clone(), Arc::new(RecordingCache::new()));
        let ops = vec![
            delete_menu_op(uuid(1)),
            update_menu_op(uuid(2), "New"),
            create_menu_op(uuid(3)),
        ];
        applier.apply(&ops).await.unwrap();

        let state = store.state.lock().unwrap();
        assert!(!state.menus.contains_key(&uuid(1)));
        assert_eq!(state.menus[&uuid(2)].title, "New");
        assert_eq!(state.menus[&uuid(3)].title, "Fresh");
        assert_eq!(state.write_log.len(), 3);
    }

    #[tokio::test]
    async fn evicts_deduplicated_patterns_in_one_batch() {
        let store = Arc::new(MemoryStore::new());
        store.seed(|state| {
            for n in [1, 2] {
                state.menus.insert(
                    uuid(n),
                    MenuRow {
                        id: uuid(n),
                        title: "Old".to_string(),
                        description: "desc".to_string(),
                    },
                );
            }
        });

        let mut cache = MockResponseCache::new();
        cache
            .expect_delete_by_patterns()
            .times(1)
            .withf(|patterns| {
                // The shared list/tree keys appear once despite two menu ops.
                patterns.iter().filter(|p| *p == "menus:list").count() == 1
                    && patterns.iter().filter(|p| *p == "menus:tree").count() == 1
            })
            .returning(|_| Ok(()));

        let applier = ChangeApplier::new(store, Arc::new(cache));
        let ops = vec![update_menu_op(uuid(1), "A"), update_menu_op(uuid(2), "B")];
        applier.apply(&ops).await.unwrap();
    }

    #[tokio::test]
    async fn empty_batch_touches_neither_store_nor_cache() {
        let store = Arc::new(MemoryStore::new());
        let mut cache = MockResponseCache::new();
        cache.expect_delete_by_patterns().times(0);

        let applier = ChangeApplier::new(store.clone(), Arc::new(cache));
        applier.apply(&[]).await.unwrap();
        assert!(store.write_log().is_empty());
    }

    #[tokio::test]
    async fn store_failure_mid_batch_keeps_prior_operations_applied() {
        let store = Arc::new(MemoryStore::new());
        store.seed(|state| {
            state.menus.insert(
                uuid(1),
                MenuRow {
                    id: uuid(1),
                    title: "Old".to_string(),
                    description: "desc".to_string(),
                },
            );
        });
        store.fail_after(1);

        let applier = ChangeApplier::new(store.clone(), Arc::new(RecordingCache::new()));
        let ops = vec![update_menu_op(uuid(1), "New"), create_menu_op(uuid(3))];
        let err = applier.apply(&ops).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));

        let state = store.state.lock().unwrap();
        assert_eq!(state.menus[&uuid(1)].title, "New");
        assert!(!state.menus.contains_key(&uuid(3)));
        assert_eq!(state.write_log.len(), 1);
    }

    #[tokio::test]
    async fn discount_plan_is_applied_through_the_store() {
        let store = Arc::new(MemoryStore::new());
        let applier = ChangeApplier::new(store.clone(), Arc::new(RecordingCache::new()));

        applier
            .apply_discounts(&[DiscountOp::Create {
                dish_id: uuid(7),
                value: Decimal::from(10),
            }])
            .await
            .unwrap();

        let state = store.state.lock().unwrap();
        let discount = state.discounts.values().next().unwrap();
        assert_eq!(discount.dish_id, uuid(7));
        assert_eq!(discount.value, Decimal::from(10));
    }

    #[tokio::test]
    async fn submenu_operations_use_typed_patches() {
        let store = Arc::new(MemoryStore::new());
        store.seed(|state| {
            state.submenus.insert(
                uuid(2),
                SubmenuRow {
                    id: uuid(2),
                    title: "Old".to_string(),
                    description: "desc".to_string(),
                    menu_id: uuid(1),
                },
            );
        });

        let applier = ChangeApplier::new(store.clone(), Arc::new(RecordingCache::new()));
        let ops = vec![Operation {
            action: SyncAction::UpdateSubmenu {
                id: uuid(2),
                patch: SubmenuPatch {
                    title: None,
                    description: Some("updated".to_string()),
                },
            },
            scope: EntityScope::submenu(uuid(1), uuid(2)),
        }];
        applier.apply(&ops).await.unwrap();

        let state = store.state.lock().unwrap();
        assert_eq!(state.submenus[&uuid(2)].title, "Old");
        assert_eq!(state.submenus[&uuid(2)].description, "updated");
    }
}
