use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRequest {
    /// Overrides the configured source for this run.
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    /// Whether the run completed; `false` means it aborted on fetch or
    /// parse and nothing was applied.
    pub completed: bool,
}
