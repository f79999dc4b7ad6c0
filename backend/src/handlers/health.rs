//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub store: String,
}

/// Liveness plus a database and store round trip
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (db, store) = tokio::join!(
        sqlx::query("SELECT 1").execute(&state.db),
        state.store.test_connection()
    );

    let db_status = match db {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            "disconnected"
        }
    };

    let store_status = match store {
        Ok(()) => "reachable",
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the store");
            "unreachable"
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status.to_string(),
        store: store_status.to_string(),
    })
}
