//! Folds the flattened hierarchy join into the nested tree shape the diff
//! pass consumes, plus the flat dish-id -> discount map for the discount
//! reconciliation pass.

use indexmap::IndexMap;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::database::models::{DiscountRow, DishRow, HierarchyRow, MenuRow, SubmenuRow};

use super::tree::{DbMenu, DbSubmenu, DbTree};

#[derive(Debug, Default)]
pub struct DbSnapshot {
    pub tree: DbTree,
    /// dish id -> its current discount row.
    pub discounts: BTreeMap<Uuid, DiscountRow>,
}

/// Every menu appears even with no submenus, every submenu even with no
/// dishes (left outer join semantics of the snapshot query).
pub fn fold_hierarchy(rows: Vec<HierarchyRow>) -> DbSnapshot {
    let mut snapshot = DbSnapshot::default();

    for row in rows {
        let menu = snapshot
            .tree
            .menus
            .entry(row.menu_id)
            .or_insert_with(|| DbMenu {
                row: MenuRow {
                    id: row.menu_id,
                    title: row.menu_title.clone(),
                    description: row.menu_description.clone(),
                },
                submenus: IndexMap::new(),
            });

        let (Some(submenu_id), Some(submenu_title), Some(submenu_description)) = (
            row.submenu_id,
            row.submenu_title.clone(),
            row.submenu_description.clone(),
        ) else {
            continue;
        };

        let submenu = menu.submenus.entry(submenu_id).or_insert_with(|| DbSubmenu {
            row: SubmenuRow {
                id: submenu_id,
                title: submenu_title,
                description: submenu_description,
                menu_id: row.menu_id,
            },
            dishes: IndexMap::new(),
        });

        let (Some(dish_id), Some(dish_title), Some(dish_description), Some(dish_price)) = (
            row.dish_id,
            row.dish_title.clone(),
            row.dish_description.clone(),
            row.dish_price,
        ) else {
            continue;
        };

        submenu.dishes.insert(
            dish_id,
            DishRow {
                id: dish_id,
                title: dish_title,
                description: dish_description,
                price: dish_price,
                submenu_id,
            },
        );

        if let (Some(discount_id), Some(discount_value)) = (row.discount_id, row.discount_value) {
            snapshot.discounts.insert(
                dish_id,
                DiscountRow {
                    id: discount_id,
                    value: discount_value,
                    dish_id,
                },
            );
        }
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn menu_only_row(menu_id: Uuid) -> HierarchyRow {
        HierarchyRow {
            menu_id,
            menu_title: "Menu".to_string(),
            menu_description: "desc".to_string(),
            submenu_id: None,
            submenu_title: None,
            submenu_description: None,
            dish_id: None,
            dish_title: None,
            dish_description: None,
            dish_price: None,
            discount_id: None,
            discount_value: None,
        }
    }

    fn full_row(
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
        discount: Option<(Uuid, Decimal)>,
    ) -> HierarchyRow {
        HierarchyRow {
            menu_id,
            menu_title: "Menu".to_string(),
            menu_description: "desc".to_string(),
            submenu_id: Some(submenu_id),
            submenu_title: Some("Submenu".to_string()),
            submenu_description: Some("desc".to_string()),
            dish_id: Some(dish_id),
            dish_title: Some("Dish".to_string()),
            dish_description: Some("desc".to_string()),
            dish_price: Some(Decimal::new(1000, 2)),
            discount_id: discount.map(|(id, _)| id),
            discount_value: discount.map(|(_, value)| value),
        }
    }

    #[test]
    fn childless_menu_still_appears() {
        let m = uuid(1);
        let snapshot = fold_hierarchy(vec![menu_only_row(m)]);
        assert_eq!(snapshot.tree.menus.len(), 1);
        assert!(snapshot.tree.menus[&m].submenus.is_empty());
        assert!(snapshot.discounts.is_empty());
    }

    #[test]
    fn repeated_menu_rows_collapse_into_one_node() {
        let m = uuid(1);
        let s = uuid(2);
        let rows = vec![
            full_row(m, s, uuid(3), None),
            full_row(m, s, uuid(4), None),
        ];
        let snapshot = fold_hierarchy(rows);
        assert_eq!(snapshot.tree.menus.len(), 1);
        assert_eq!(snapshot.tree.menus[&m].submenus.len(), 1);
        assert_eq!(snapshot.tree.menus[&m].submenus[&s].dishes.len(), 2);
    }

    #[test]
    fn discount_leg_populates_the_flat_map() {
        let m = uuid(1);
        let s = uuid(2);
        let d = uuid(3);
        let discount_id = uuid(4);
        let value = Decimal::new(1050, 2);

        let snapshot = fold_hierarchy(vec![full_row(m, s, d, Some((discount_id, value)))]);
        let row = &snapshot.discounts[&d];
        assert_eq!(row.id, discount_id);
        assert_eq!(row.value, value);
        assert_eq!(row.dish_id, d);
    }
}
