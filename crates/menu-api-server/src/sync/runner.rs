//! Facade orchestrating one reconciliation run:
//! fetch -> parse -> snapshot -> diff -> apply -> discount pass.
//!
//! Fetch and parse failures are recovered into a `false` ("no run
//! performed") result; apply-phase store errors propagate to the caller,
//! which owns alerting and retry scheduling. Runs are serialized by a
//! run-level lock: concurrent runs would interleave apply-phase writes
//! against diverging snapshots.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::services::cache::ResponseCache;

use super::apply::ChangeApplier;
use super::diff::diff_trees;
use super::discount::plan_discounts;
use super::rows::parse_grid;
use super::snapshot::fold_hierarchy;
use super::source::{Grid, SourceFetcher};
use super::store::{MenuStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    Idle,
    Fetching,
    Parsing,
    Diffing,
    Applying,
    ReconcilingDiscounts,
    Aborted,
}

pub struct SyncRunner {
    store: Arc<dyn MenuStore>,
    cache: Arc<dyn ResponseCache>,
    fetcher: SourceFetcher,
    run_lock: Mutex<()>,
}

impl SyncRunner {
    pub fn new(
        store: Arc<dyn MenuStore>,
        cache: Arc<dyn ResponseCache>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            store,
            cache,
            fetcher: SourceFetcher::new(http),
            run_lock: Mutex::new(()),
        }
    }

    /// Run one reconciliation of the persisted hierarchy against `source`.
    /// Returns whether the run completed; `false` means it aborted before
    /// any persistence write.
    pub async fn run(&self, source: &str) -> Result<bool, StoreError> {
        let _guard = self.run_lock.lock().await;
        info!("Menu sync started");

        enter(RunPhase::Fetching);
        let grid = match self.fetcher.fetch(source).await {
            Ok(grid) => grid,
            Err(err) => {
                warn!("Menu sync aborted, no source data: {}", err);
                enter(RunPhase::Aborted);
                return Ok(false);
            }
        };

        let completed = self.sync_grid(&grid).await?;
        if completed {
            info!("Menu sync finished");
            enter(RunPhase::Idle);
        }
        Ok(completed)
    }

    async fn sync_grid(&self, grid: &Grid) -> Result<bool, StoreError> {
        enter(RunPhase::Parsing);
        let parsed = match parse_grid(grid) {
            Ok(parsed) => parsed,
            Err(failure) => {
                warn!(
                    "Menu sync aborted, {} parse error(s)",
                    failure.errors.len()
                );
                enter(RunPhase::Aborted);
                return Ok(false);
            }
        };

        enter(RunPhase::Diffing);
        let snapshot = fold_hierarchy(self.store.hierarchy_snapshot().await?);
        let ops = diff_trees(&snapshot.tree, &parsed.tree);
        let discount_ops = plan_discounts(&parsed.discounts, &snapshot.discounts);

        let applier = ChangeApplier::new(self.store.clone(), self.cache.clone());

        enter(RunPhase::Applying);
        applier.apply(&ops).await?;

        enter(RunPhase::ReconcilingDiscounts);
        applier.apply_discounts(&discount_ops).await?;

        Ok(true)
    }
}

fn enter(phase: RunPhase) {
    debug!("Sync phase: {:?}", phase);
}
