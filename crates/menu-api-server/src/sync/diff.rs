//! Level-synchronous comparison of the persisted tree against the source
//! tree, producing the flat, globally ordered operation list.
//!
//! Ordering policy: all deletes run before updates, all updates before
//! creates, and within one kind parents before children. Deletes free
//! unique constraints before creates need them; creates establish parents
//! before children reference them.

use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

use crate::database::models::{DishRow, MenuRow, SubmenuRow};

use super::tree::{DbMenu, DbSubmenu, DbTree, DishRecord, MenuRecord, SourceMenu, SourceSubmenu, SourceTree, SubmenuRecord};

/// Operation kind, in apply order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OpKind {
    Delete,
    Update,
    Create,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Delete => "delete",
            OpKind::Update => "update",
            OpKind::Create => "create",
        };
        f.write_str(name)
    }
}

/// Hierarchy level, in apply order (parents first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntityKind {
    Menu,
    Submenu,
    Dish,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Menu => "menu",
            EntityKind::Submenu => "submenu",
            EntityKind::Dish => "dish",
        };
        f.write_str(name)
    }
}

/// Ancestor ids plus the operation's own id, used to derive the cache key
/// patterns an applied operation invalidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityScope {
    pub menu_id: Option<Uuid>,
    pub submenu_id: Option<Uuid>,
    pub dish_id: Option<Uuid>,
}

impl EntityScope {
    pub fn menu(menu_id: Uuid) -> Self {
        Self {
            menu_id: Some(menu_id),
            ..Default::default()
        }
    }

    pub fn submenu(menu_id: Uuid, submenu_id: Uuid) -> Self {
        Self {
            menu_id: Some(menu_id),
            submenu_id: Some(submenu_id),
            dish_id: None,
        }
    }

    pub fn dish(menu_id: Uuid, submenu_id: Uuid, dish_id: Uuid) -> Self {
        Self {
            menu_id: Some(menu_id),
            submenu_id: Some(submenu_id),
            dish_id: Some(dish_id),
        }
    }
}

/// Changed scalar fields of a menu. `None` means unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl MenuPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmenuPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl SubmenuPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DishPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
}

impl DishPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.price.is_none()
    }
}

/// One planned convergence step, tagged with the typed payload it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    DeleteMenu { id: Uuid },
    UpdateMenu { id: Uuid, patch: MenuPatch },
    CreateMenu { record: MenuRecord },
    DeleteSubmenu { id: Uuid },
    UpdateSubmenu { id: Uuid, patch: SubmenuPatch },
    CreateSubmenu { record: SubmenuRecord },
    DeleteDish { id: Uuid },
    UpdateDish { id: Uuid, patch: DishPatch },
    CreateDish { record: DishRecord },
}

impl SyncAction {
    pub fn kind(&self) -> OpKind {
        match self {
            SyncAction::DeleteMenu { .. }
            | SyncAction::DeleteSubmenu { .. }
            | SyncAction::DeleteDish { .. } => OpKind::Delete,
            SyncAction::UpdateMenu { .. }
            | SyncAction::UpdateSubmenu { .. }
            | SyncAction::UpdateDish { .. } => OpKind::Update,
            SyncAction::CreateMenu { .. }
            | SyncAction::CreateSubmenu { .. }
            | SyncAction::CreateDish { .. } => OpKind::Create,
        }
    }

    pub fn entity(&self) -> EntityKind {
        match self {
            SyncAction::DeleteMenu { .. }
            | SyncAction::UpdateMenu { .. }
            | SyncAction::CreateMenu { .. } => EntityKind::Menu,
            SyncAction::DeleteSubmenu { .. }
            | SyncAction::UpdateSubmenu { .. }
            | SyncAction::CreateSubmenu { .. } => EntityKind::Submenu,
            SyncAction::DeleteDish { .. }
            | SyncAction::UpdateDish { .. }
            | SyncAction::CreateDish { .. } => EntityKind::Dish,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            SyncAction::DeleteMenu { id }
            | SyncAction::UpdateMenu { id, .. }
            | SyncAction::DeleteSubmenu { id }
            | SyncAction::UpdateSubmenu { id, .. }
            | SyncAction::DeleteDish { id }
            | SyncAction::UpdateDish { id, .. } => *id,
            SyncAction::CreateMenu { record } => record.id,
            SyncAction::CreateSubmenu { record } => record.id,
            SyncAction::CreateDish { record } => record.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub action: SyncAction,
    pub scope: EntityScope,
}

/// Compare the persisted tree against the source tree and return the
/// globally ordered operation list.
pub fn diff_trees(db: &DbTree, source: &SourceTree) -> Vec<Operation> {
    let mut ops = Vec::new();
    diff_menus(db, source, &mut ops);
    // Stable sort: within one (kind, level) bucket file order is kept.
    ops.sort_by_key(|op| (op.action.kind(), op.action.entity()));
    ops
}

fn diff_menus(db: &DbTree, source: &SourceTree, ops: &mut Vec<Operation>) {
    for (menu_id, db_menu) in &db.menus {
        let scope = EntityScope::menu(*menu_id);
        match source.menus.get(menu_id) {
            None => {
                // Children disappear with the cascade; no child ops emitted.
                ops.push(Operation {
                    action: SyncAction::DeleteMenu { id: *menu_id },
                    scope,
                });
            }
            Some(source_menu) => {
                let patch = menu_patch(&db_menu.row, &source_menu.record);
                if !patch.is_empty() {
                    ops.push(Operation {
                        action: SyncAction::UpdateMenu {
                            id: *menu_id,
                            patch,
                        },
                        scope,
                    });
                }
                diff_submenus(db_menu, source_menu, *menu_id, ops);
            }
        }
    }

    for (menu_id, source_menu) in &source.menus {
        if db.menus.contains_key(menu_id) {
            continue;
        }
        create_menu_subtree(source_menu, ops);
    }
}

fn diff_submenus(db_menu: &DbMenu, source_menu: &SourceMenu, menu_id: Uuid, ops: &mut Vec<Operation>) {
    for (submenu_id, db_submenu) in &db_menu.submenus {
        let scope = EntityScope::submenu(menu_id, *submenu_id);
        match source_menu.submenus.get(submenu_id) {
            None => {
                ops.push(Operation {
                    action: SyncAction::DeleteSubmenu { id: *submenu_id },
                    scope,
                });
            }
            Some(source_submenu) => {
                let patch = submenu_patch(&db_submenu.row, &source_submenu.record);
                if !patch.is_empty() {
                    ops.push(Operation {
                        action: SyncAction::UpdateSubmenu {
                            id: *submenu_id,
                            patch,
                        },
                        scope,
                    });
                }
                diff_dishes(db_submenu, source_submenu, menu_id, *submenu_id, ops);
            }
        }
    }

    for (submenu_id, source_submenu) in &source_menu.submenus {
        if db_menu.submenus.contains_key(submenu_id) {
            continue;
        }
        create_submenu_subtree(source_submenu, menu_id, ops);
    }
}

fn diff_dishes(
    db_submenu: &DbSubmenu,
    source_submenu: &SourceSubmenu,
    menu_id: Uuid,
    submenu_id: Uuid,
    ops: &mut Vec<Operation>,
) {
    for (dish_id, db_dish) in &db_submenu.dishes {
        let scope = EntityScope::dish(menu_id, submenu_id, *dish_id);
        match source_submenu.dishes.get(dish_id) {
            None => {
                ops.push(Operation {
                    action: SyncAction::DeleteDish { id: *dish_id },
                    scope,
                });
            }
            Some(source_dish) => {
                let patch = dish_patch(db_dish, source_dish);
                if !patch.is_empty() {
                    ops.push(Operation {
                        action: SyncAction::UpdateDish {
                            id: *dish_id,
                            patch,
                        },
                        scope,
                    });
                }
            }
        }
    }

    for (dish_id, source_dish) in &source_submenu.dishes {
        if db_submenu.dishes.contains_key(dish_id) {
            continue;
        }
        ops.push(Operation {
            action: SyncAction::CreateDish {
                record: source_dish.clone(),
            },
            scope: EntityScope::dish(menu_id, submenu_id, *dish_id),
        });
    }
}

fn create_menu_subtree(source_menu: &SourceMenu, ops: &mut Vec<Operation>) {
    let menu_id = source_menu.record.id;
    ops.push(Operation {
        action: SyncAction::CreateMenu {
            record: source_menu.record.clone(),
        },
        scope: EntityScope::menu(menu_id),
    });
    for source_submenu in source_menu.submenus.values() {
        create_submenu_subtree(source_submenu, menu_id, ops);
    }
}

fn create_submenu_subtree(source_submenu: &SourceSubmenu, menu_id: Uuid, ops: &mut Vec<Operation>) {
    let submenu_id = source_submenu.record.id;
    ops.push(Operation {
        action: SyncAction::CreateSubmenu {
            record: source_submenu.record.clone(),
        },
        scope: EntityScope::submenu(menu_id, submenu_id),
    });
    for source_dish in source_submenu.dishes.values() {
        ops.push(Operation {
            action: SyncAction::CreateDish {
                record: source_dish.clone(),
            },
            scope: EntityScope::dish(menu_id, submenu_id, source_dish.id),
        });
    }
}

fn menu_patch(row: &MenuRow, record: &MenuRecord) -> MenuPatch {
    MenuPatch {
        title: changed(&row.title, &record.title),
        description: changed(&row.description, &record.description),
    }
}

fn submenu_patch(row: &SubmenuRow, record: &SubmenuRecord) -> SubmenuPatch {
    SubmenuPatch {
        title: changed(&row.title, &record.title),
        description: changed(&row.description, &record.description),
    }
}

fn dish_patch(row: &DishRow, record: &DishRecord) -> DishPatch {
    DishPatch {
        title: changed(&row.title, &record.title),
        description: changed(&row.description, &record.description),
        price: (row.price != record.price).then_some(record.price),
    }
}

fn changed(current: &str, incoming: &str) -> Option<String> {
    (current != incoming).then(|| incoming.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn source_menu(id: Uuid, title: &str) -> SourceMenu {
        SourceMenu {
            record: MenuRecord {
                id,
                title: title.to_string(),
                description: "desc".to_string(),
            },
            submenus: IndexMap::new(),
        }
    }

    fn source_submenu(id: Uuid, menu_id: Uuid, title: &str) -> SourceSubmenu {
        SourceSubmenu {
            record: SubmenuRecord {
                id,
                title: title.to_string(),
                description: "desc".to_string(),
                menu_id,
            },
            dishes: IndexMap::new(),
        }
    }

    fn source_dish(id: Uuid, submenu_id: Uuid, price: Decimal) -> DishRecord {
        DishRecord {
            id,
            title: "dish".to_string(),
            description: "desc".to_string(),
            price,
            submenu_id,
        }
    }

    fn db_menu(id: Uuid, title: &str) -> DbMenu {
        DbMenu {
            row: MenuRow {
                id,
                title: title.to_string(),
                description: "desc".to_string(),
            },
            submenus: IndexMap::new(),
        }
    }

    fn db_submenu(id: Uuid, menu_id: Uuid, title: &str) -> DbSubmenu {
        DbSubmenu {
            row: SubmenuRow {
                id,
                title: title.to_string(),
                description: "desc".to_string(),
                menu_id,
            },
            dishes: IndexMap::new(),
        }
    }

    fn db_dish(id: Uuid, submenu_id: Uuid, price: Decimal) -> DishRow {
        DishRow {
            id,
            title: "dish".to_string(),
            description: "desc".to_string(),
            price,
            submenu_id,
        }
    }

    #[test]
    fn identical_trees_produce_no_operations() {
        let m = uuid(1);
        let s = uuid(2);
        let d = uuid(3);
        let price = Decimal::new(1000, 2);

        let mut db = DbTree::default();
        let mut menu = db_menu(m, "Menu");
        let mut submenu = db_submenu(s, m, "Submenu");
        submenu.dishes.insert(d, db_dish(d, s, price));
        menu.submenus.insert(s, submenu);
        db.menus.insert(m, menu);

        let mut source = SourceTree::default();
        let mut src_menu = source_menu(m, "Menu");
        let mut src_submenu = source_submenu(s, m, "Submenu");
        src_submenu.dishes.insert(d, source_dish(d, s, price));
        src_menu.submenus.insert(s, src_submenu);
        source.menus.insert(m, src_menu);

        assert!(diff_trees(&db, &source).is_empty());
    }

    #[test]
    fn integer_and_scaled_prices_compare_equal() {
        let d = uuid(3);
        let row = db_dish(d, uuid(2), Decimal::new(1200, 2)); // 12.00
        let record = source_dish(d, uuid(2), Decimal::from(12)); // 12
        assert!(dish_patch(&row, &record).is_empty());
    }

    #[test]
    fn db_only_menu_is_deleted_without_child_operations() {
        let m = uuid(1);
        let s = uuid(2);

        let mut db = DbTree::default();
        let mut menu = db_menu(m, "Menu");
        menu.submenus.insert(s, db_submenu(s, m, "Submenu"));
        db.menus.insert(m, menu);

        let ops = diff_trees(&db, &SourceTree::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].action, SyncAction::DeleteMenu { id: m });
        assert_eq!(ops[0].scope, EntityScope::menu(m));
    }

    #[test]
    fn update_patch_carries_only_changed_fields() {
        let m = uuid(1);
        let mut db = DbTree::default();
        db.menus.insert(m, db_menu(m, "Old title"));

        let mut source = SourceTree::default();
        source.menus.insert(m, source_menu(m, "New title"));

        let ops = diff_trees(&db, &source);
        assert_eq!(ops.len(), 1);
        match &ops[0].action {
            SyncAction::UpdateMenu { id, patch } => {
                assert_eq!(*id, m);
                assert_eq!(patch.title.as_deref(), Some("New title"));
                assert!(patch.description.is_none());
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn source_only_menu_creates_whole_subtree_with_scopes() {
        let m = uuid(1);
        let s = uuid(2);
        let d = uuid(3);

        let mut source = SourceTree::default();
        let mut menu = source_menu(m, "Menu");
        let mut submenu = source_submenu(s, m, "Submenu");
        submenu
            .dishes
            .insert(d, source_dish(d, s, Decimal::new(999, 2)));
        menu.submenus.insert(s, submenu);
        source.menus.insert(m, menu);

        let ops = diff_trees(&DbTree::default(), &source);
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0].action, SyncAction::CreateMenu { .. }));
        assert!(matches!(ops[1].action, SyncAction::CreateSubmenu { .. }));
        assert!(matches!(ops[2].action, SyncAction::CreateDish { .. }));
        assert_eq!(ops[2].scope, EntityScope::dish(m, s, d));
    }

    #[test]
    fn children_of_a_matched_menu_are_diffed_even_when_menu_is_unchanged() {
        let m = uuid(1);
        let s = uuid(2);

        let mut db = DbTree::default();
        db.menus.insert(m, db_menu(m, "Menu"));

        let mut source = SourceTree::default();
        let mut menu = source_menu(m, "Menu");
        menu.submenus.insert(s, source_submenu(s, m, "Submenu"));
        source.menus.insert(m, menu);

        let ops = diff_trees(&db, &source);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0].action, SyncAction::CreateSubmenu { .. }));
    }

    #[test]
    fn operations_are_globally_ordered_by_kind_then_level() {
        // db: menu A (delete), menu B with submenu S1 (S1 renamed) and dish D1
        // under S1 (delete); source: menu B renamed, submenu S1 renamed, new
        // submenu S2 with dish D2.
        let a = uuid(0xa);
        let b = uuid(0xb);
        let s1 = uuid(0x51);
        let d1 = uuid(0xd1);
        let s2 = uuid(0x52);
        let d2 = uuid(0xd2);

        let mut db = DbTree::default();
        db.menus.insert(a, db_menu(a, "A"));
        let mut menu_b = db_menu(b, "B");
        let mut sub1 = db_submenu(s1, b, "S1");
        sub1.dishes.insert(d1, db_dish(d1, s1, Decimal::ONE));
        menu_b.submenus.insert(s1, sub1);
        db.menus.insert(b, menu_b);

        let mut source = SourceTree::default();
        let mut src_b = source_menu(b, "B renamed");
        src_b.submenus.insert(s1, source_submenu(s1, b, "S1 renamed"));
        let mut src_s2 = source_submenu(s2, b, "S2");
        src_s2.dishes.insert(d2, source_dish(d2, s2, Decimal::TWO));
        src_b.submenus.insert(s2, src_s2);
        source.menus.insert(b, src_b);

        let ops = diff_trees(&db, &source);
        let keys: Vec<(OpKind, EntityKind)> = ops
            .iter()
            .map(|op| (op.action.kind(), op.action.entity()))
            .collect();

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted, "operations must already be sorted");

        assert_eq!(
            keys,
            vec![
                (OpKind::Delete, EntityKind::Menu),
                (OpKind::Delete, EntityKind::Dish),
                (OpKind::Update, EntityKind::Menu),
                (OpKind::Update, EntityKind::Submenu),
                (OpKind::Create, EntityKind::Submenu),
                (OpKind::Create, EntityKind::Dish),
            ]
        );
    }
}
