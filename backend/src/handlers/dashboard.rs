//! Dashboard handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::dashboard::{DashboardStats, Widget, WidgetResponse};
use crate::services::DashboardService;
use crate::AppState;

/// Local stats and online widgets in one payload
pub async fn get_dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DashboardStats>> {
    let service = DashboardService::new(state.db.clone(), state.store.clone(), &state.config);
    let stats = service.stats(current_user.0.lang).await?;
    Ok(Json(stats))
}

/// Refresh a single widget
pub async fn get_widget(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(widget): Path<String>,
) -> AppResult<Json<WidgetResponse>> {
    let widget: Widget = widget.parse()?;
    let service = DashboardService::new(state.db.clone(), state.store.clone(), &state.config);
    Ok(Json(service.widget(widget).await?))
}
