use axum::{extract::State, Json};

use crate::models::{SyncRequest, SyncResponse};
use crate::state::AppState;
use crate::utils::ApiError;

/// On-demand reconciliation trigger. Waits for the run and reports whether
/// it completed; `false` means it aborted on fetch/parse and nothing was
/// written.
pub async fn trigger_sync(
    State(state): State<AppState>,
    Json(data): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, ApiError> {
    let source = data
        .source
        .unwrap_or_else(|| state.settings.sync.source.clone());
    let completed = state.sync_runner.run(&source).await?;
    Ok(Json(SyncResponse { completed }))
}
