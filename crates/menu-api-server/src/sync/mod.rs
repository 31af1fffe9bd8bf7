//! Reconciliation engine keeping the persisted menu hierarchy in sync with
//! an external tabular source (local xlsx file or published Google Sheet).
//!
//! One run flows strictly left to right:
//! fetch ([`source`]) -> parse ([`rows`]) -> snapshot ([`snapshot`]) ->
//! diff ([`diff`]) -> apply ([`apply`]) -> discount pass ([`discount`]),
//! orchestrated by [`runner::SyncRunner`].

pub mod apply;
pub mod diff;
pub mod discount;
pub mod rows;
pub mod runner;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod tree;

pub use runner::SyncRunner;
pub use store::{MenuStore, StoreError};
