//! Variation stock and deletion handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::products::check_stock;
use crate::middleware::CurrentUser;
use crate::services::product::InventoryItem;
use crate::services::ProductService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VariationStockRequest {
    pub stock: i32,
}

#[derive(Serialize)]
pub struct DeletedVariation {
    pub deleted: bool,
    /// WooCommerce id now kept out of future syncs
    pub variation_id: i64,
}

async fn require_variation(service: &ProductService, id: i64) -> AppResult<InventoryItem> {
    match service.get_by_id(id).await? {
        Some(item) if item.is_variation() => Ok(item),
        _ => Err(AppError::NotFound("Variation".to_string())),
    }
}

/// Set the counted stock of a variation
pub async fn update_variation_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<VariationStockRequest>,
) -> AppResult<Json<InventoryItem>> {
    check_stock(body.stock)?;

    let service = ProductService::new(state.db.clone());
    require_variation(&service, id).await?;
    service.update_stock(id, body.stock).await?;

    Ok(Json(require_variation(&service, id).await?))
}

/// Delete a variation and keep it from being re-imported
pub async fn delete_variation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DeletedVariation>> {
    let service = ProductService::new(state.db.clone());
    let variation = require_variation(&service, id).await?;

    if !service.delete_variation(id, variation.product_id).await? {
        return Err(AppError::NotFound("Variation".to_string()));
    }

    tracing::info!(
        id,
        variation_id = variation.product_id,
        user = %current_user.0.username,
        "Variation deleted"
    );

    Ok(Json(DeletedVariation {
        deleted: true,
        variation_id: variation.product_id,
    }))
}
