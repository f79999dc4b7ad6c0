//! Catalog sync handlers
//!
//! The browser calls `POST /sync` repeatedly until `is_complete`; each call
//! runs one bounded step against the user's own cursor.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::sync::{SyncLogEntry, SyncStepResult};
use crate::services::SyncService;
use crate::AppState;
use shared::ProgressReport;

#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub full_sync: bool,
    /// Echo of the last step's token; informational, the cursor is server side
    #[serde(default)]
    pub continuation_token: Option<String>,
}

#[derive(Deserialize)]
pub struct SyncLogsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub reset: bool,
}

/// Run one sync step
pub async fn sync_step(
    State(state): State<AppState>,
    current_user: CurrentUser,
    body: Option<Json<SyncRequest>>,
) -> AppResult<Json<SyncStepResult>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();

    if let Some(token) = request.continuation_token.as_deref() {
        match shared::decode_continuation_token(token) {
            Ok(page) => tracing::debug!(page, "Continuing sync"),
            Err(e) => tracing::debug!(error = %e, "Ignoring unreadable continuation token"),
        }
    }

    let service = SyncService::new(state.db.clone(), state.store.clone(), &state.config);
    let result = service
        .step(&current_user.0.sync_owner(), request.full_sync)
        .await?;
    Ok(Json(result))
}

/// Run one step of a variable-products-only sync
pub async fn sync_variations_step(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<SyncStepResult>> {
    let service = SyncService::new(state.db.clone(), state.store.clone(), &state.config);
    let result = service.step_variables(&current_user.0.sync_owner()).await?;
    Ok(Json(result))
}

/// Progress of the user's current run
pub async fn sync_progress(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ProgressReport>> {
    let service = SyncService::new(state.db.clone(), state.store.clone(), &state.config);
    Ok(Json(service.progress(&current_user.0.sync_owner()).await?))
}

/// Abandon the user's current run
pub async fn reset_sync(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ResetResponse>> {
    let service = SyncService::new(state.db.clone(), state.store.clone(), &state.config);
    let reset = service.reset(&current_user.0.sync_owner()).await?;
    Ok(Json(ResetResponse { reset }))
}

/// Most recent sync log rows
pub async fn sync_logs(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<SyncLogsQuery>,
) -> AppResult<Json<Vec<SyncLogEntry>>> {
    let service = SyncService::new(state.db.clone(), state.store.clone(), &state.config);
    Ok(Json(service.logs(query.limit.clamp(1, 100)).await?))
}

/// The last sync log row, if any
pub async fn last_sync(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Option<SyncLogEntry>>> {
    let service = SyncService::new(state.db.clone(), state.store.clone(), &state.config);
    Ok(Json(service.last_sync().await?))
}
