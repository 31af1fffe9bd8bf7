//! Discount reconciliation: an independent pass over the two flat
//! dish-id-keyed maps gathered during parsing and snapshot loading. Runs
//! after the main apply phase so dishes referenced by new discounts exist.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::database::models::DiscountRow;

#[derive(Debug, Clone, PartialEq)]
pub enum DiscountOp {
    Create {
        dish_id: Uuid,
        value: Decimal,
    },
    Update {
        id: Uuid,
        dish_id: Uuid,
        value: Decimal,
    },
    Delete {
        id: Uuid,
        dish_id: Uuid,
        value: Decimal,
    },
}

/// Plan the discount convergence steps. BTreeMap inputs keep the plan
/// deterministic.
pub fn plan_discounts(
    in_file: &BTreeMap<Uuid, Decimal>,
    in_db: &BTreeMap<Uuid, DiscountRow>,
) -> Vec<DiscountOp> {
    let mut ops = Vec::new();

    for (dish_id, value) in in_file {
        match in_db.get(dish_id) {
            None => ops.push(DiscountOp::Create {
                dish_id: *dish_id,
                value: *value,
            }),
            Some(row) if row.value != *value => ops.push(DiscountOp::Update {
                id: row.id,
                dish_id: *dish_id,
                value: *value,
            }),
            Some(_) => {}
        }
    }

    for (dish_id, row) in in_db {
        if !in_file.contains_key(dish_id) {
            ops.push(DiscountOp::Delete {
                id: row.id,
                dish_id: *dish_id,
                value: row.value,
            });
        }
    }

    ops
}
