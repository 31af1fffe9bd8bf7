//! Row-by-row parsing of the source grid into a [`SourceTree`].
//!
//! The format is position-encoded: each entity type owns a fixed column
//! offset and the first non-empty start cell (in Menu, Submenu, Dish
//! precedence) decides what a row is. Rows that name an entity without its
//! required ancestor context are skipped, not rejected, so stray or
//! explanatory rows in the sheet do not break a run. All fatal problems are
//! collected across the whole scan and reported together.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use super::diff::EntityKind;
use super::source::Grid;
use super::tree::{DishRecord, MenuRecord, SourceMenu, SourceSubmenu, SourceTree, SubmenuRecord};

pub const MENU_OFFSET: usize = 0;
pub const SUBMENU_OFFSET: usize = 1;
pub const DISH_OFFSET: usize = 2;
/// Discount value lives in a fixed column after the dish block.
pub const DISCOUNT_COLUMN: usize = 6;

const DISCOUNT_RANGE_MESSAGE: &str = "discount value can only be between 0 and 100";

/// Aggregate of every fatal problem found in one scan.
#[derive(Debug, Error)]
#[error("{}", .errors.join("\n"))]
pub struct ParseFailure {
    pub errors: Vec<String>,
}

/// Result of a successful scan.
#[derive(Debug)]
pub struct ParsedSource {
    pub tree: SourceTree,
    /// dish id -> discount value, gathered inline with dish rows.
    pub discounts: BTreeMap<Uuid, Decimal>,
    /// 1-based numbers of rows skipped for missing ancestor context.
    pub skipped_rows: Vec<usize>,
}

/// Ancestor context of the linear scan: which menu/submenu is currently
/// open. Threaded explicitly so the parser is reentrant.
#[derive(Debug, Default)]
struct ParserState {
    current_menu: Option<Uuid>,
    current_submenu: Option<Uuid>,
}

#[derive(Default)]
struct SourceParser {
    state: ParserState,
    tree: SourceTree,
    discounts: BTreeMap<Uuid, Decimal>,
    seen_menus: HashMap<Uuid, usize>,
    seen_submenus: HashMap<Uuid, usize>,
    seen_dishes: HashMap<Uuid, usize>,
    errors: Vec<String>,
    skipped: Vec<usize>,
}

/// Scan the whole grid. Returns the parsed tree only if no fatal error was
/// recorded anywhere in the file.
pub fn parse_grid(grid: &Grid) -> Result<ParsedSource, ParseFailure> {
    let mut parser = SourceParser::default();
    for (index, row) in grid.iter().enumerate() {
        parser.process_row(index + 1, row);
    }
    parser.finish()
}

impl SourceParser {
    fn process_row(&mut self, row_no: usize, row: &[Option<String>]) {
        for kind in [EntityKind::Menu, EntityKind::Submenu, EntityKind::Dish] {
            if cell(row, entity_offset(kind)).is_none() {
                continue;
            }
            match kind {
                EntityKind::Menu => {
                    self.open_menu(row_no, row);
                    return;
                }
                EntityKind::Submenu => {
                    let Some(menu_id) = self.state.current_menu else {
                        continue;
                    };
                    self.open_submenu(row_no, row, menu_id);
                    return;
                }
                EntityKind::Dish => {
                    let (Some(menu_id), Some(submenu_id)) =
                        (self.state.current_menu, self.state.current_submenu)
                    else {
                        continue;
                    };
                    self.insert_dish(row_no, row, menu_id, submenu_id);
                    return;
                }
            }
        }
        self.skipped.push(row_no);
    }

    fn open_menu(&mut self, row_no: usize, row: &[Option<String>]) {
        let record = match parse_menu_fields(row) {
            Ok(record) => record,
            Err(message) => return self.record_error(EntityKind::Menu, row_no, message),
        };
        self.track_id(EntityKind::Menu, record.id, row_no);
        self.state.current_menu = Some(record.id);
        // The open submenu belonged to the previous menu.
        self.state.current_submenu = None;
        self.tree.menus.insert(
            record.id,
            SourceMenu {
                record,
                submenus: IndexMap::new(),
            },
        );
    }

    fn open_submenu(&mut self, row_no: usize, row: &[Option<String>], menu_id: Uuid) {
        let record = match parse_submenu_fields(row, menu_id) {
            Ok(record) => record,
            Err(message) => return self.record_error(EntityKind::Submenu, row_no, message),
        };
        self.track_id(EntityKind::Submenu, record.id, row_no);
        self.state.current_submenu = Some(record.id);
        if let Some(menu) = self.tree.menus.get_mut(&menu_id) {
            menu.submenus.insert(
                record.id,
                SourceSubmenu {
                    record,
                    dishes: IndexMap::new(),
                },
            );
        }
    }

    fn insert_dish(
        &mut self,
        row_no: usize,
        row: &[Option<String>],
        menu_id: Uuid,
        submenu_id: Uuid,
    ) {
        let record = match parse_dish_fields(row, submenu_id) {
            Ok(record) => record,
            Err(message) => return self.record_error(EntityKind::Dish, row_no, message),
        };
        self.track_id(EntityKind::Dish, record.id, row_no);

        match parse_discount_cell(row) {
            Ok(Some(value)) => {
                self.discounts.insert(record.id, value);
            }
            Ok(None) => {}
            Err(message) => self.errors.push(format!(
                "there is a parsing error for dish discount in row {row_no}: {message}"
            )),
        }

        if let Some(submenu) = self
            .tree
            .menus
            .get_mut(&menu_id)
            .and_then(|menu| menu.submenus.get_mut(&submenu_id))
        {
            submenu.dishes.insert(record.id, record);
        }
    }

    fn record_error(&mut self, kind: EntityKind, row_no: usize, message: String) {
        self.errors.push(format!(
            "there is a parsing error for {kind} in row {row_no}: {message}"
        ));
    }

    fn track_id(&mut self, kind: EntityKind, id: Uuid, row_no: usize) {
        let seen = match kind {
            EntityKind::Menu => &mut self.seen_menus,
            EntityKind::Submenu => &mut self.seen_submenus,
            EntityKind::Dish => &mut self.seen_dishes,
        };
        if let Some(first_row) = seen.get(&id) {
            self.errors
                .push(format!("duplicate {kind} id={id} in rows {first_row} and {row_no}"));
        } else {
            seen.insert(id, row_no);
        }
    }

    fn finish(self) -> Result<ParsedSource, ParseFailure> {
        if !self.skipped.is_empty() {
            let rows: Vec<String> = self.skipped.iter().map(ToString::to_string).collect();
            warn!("Parse source: missed rows: {}", rows.join(", "));
        }
        if !self.errors.is_empty() {
            for message in &self.errors {
                error!("Parse source: {}", message);
            }
            return Err(ParseFailure {
                errors: self.errors,
            });
        }
        Ok(ParsedSource {
            tree: self.tree,
            discounts: self.discounts,
            skipped_rows: self.skipped,
        })
    }
}

fn entity_offset(kind: EntityKind) -> usize {
    match kind {
        EntityKind::Menu => MENU_OFFSET,
        EntityKind::Submenu => SUBMENU_OFFSET,
        EntityKind::Dish => DISH_OFFSET,
    }
}

fn cell(row: &[Option<String>], index: usize) -> Option<&str> {
    row.get(index).and_then(|c| c.as_deref())
}

fn require<'a>(row: &'a [Option<String>], index: usize, field: &str) -> Result<&'a str, String> {
    cell(row, index).ok_or_else(|| format!("missing {field}"))
}

fn parse_id(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw).map_err(|_| format!("invalid id '{raw}'"))
}

fn parse_price(raw: &str) -> Result<Decimal, String> {
    raw.parse::<Decimal>()
        .map(|price| price.round_dp(2))
        .map_err(|_| format!("invalid price '{raw}'"))
}

fn parse_menu_fields(row: &[Option<String>]) -> Result<MenuRecord, String> {
    Ok(MenuRecord {
        id: parse_id(require(row, MENU_OFFSET, "id")?)?,
        title: require(row, MENU_OFFSET + 1, "title")?.to_string(),
        description: require(row, MENU_OFFSET + 2, "description")?.to_string(),
    })
}

fn parse_submenu_fields(row: &[Option<String>], menu_id: Uuid) -> Result<SubmenuRecord, String> {
    Ok(SubmenuRecord {
        id: parse_id(require(row, SUBMENU_OFFSET, "id")?)?,
        title: require(row, SUBMENU_OFFSET + 1, "title")?.to_string(),
        description: require(row, SUBMENU_OFFSET + 2, "description")?.to_string(),
        menu_id,
    })
}

fn parse_dish_fields(row: &[Option<String>], submenu_id: Uuid) -> Result<DishRecord, String> {
    Ok(DishRecord {
        id: parse_id(require(row, DISH_OFFSET, "id")?)?,
        title: require(row, DISH_OFFSET + 1, "title")?.to_string(),
        description: require(row, DISH_OFFSET + 2, "description")?.to_string(),
        price: parse_price(require(row, DISH_OFFSET + 3, "price")?)?,
        submenu_id,
    })
}

fn parse_discount_cell(row: &[Option<String>]) -> Result<Option<Decimal>, String> {
    let Some(raw) = cell(row, DISCOUNT_COLUMN) else {
        return Ok(None);
    };
    let value = raw
        .parse::<Decimal>()
        .map_err(|_| DISCOUNT_RANGE_MESSAGE.to_string())?
        .round_dp(2);
    if value < Decimal::ZERO || value > Decimal::from(100) {
        return Err(DISCOUNT_RANGE_MESSAGE.to_string());
    }
    Ok(Some(value))
}
