//! Physical inventory handlers

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::product::{InventoryItem, ProductChanges};
use crate::services::ProductService;
use crate::AppState;
use shared::{
    validate_low_stock_threshold, validate_stock, PaginatedResponse, Pagination, PaginationMeta,
    ProductFilter,
};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub filter: ProductFilter,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListProductsQuery {
    /// Clamped `(limit, offset)`
    pub fn window(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }

    /// The search term, when there is one worth searching for
    pub fn term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    pub stock: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Counted stock as a field error
pub(crate) fn check_stock(stock: i32) -> AppResult<()> {
    validate_stock(stock).map_err(|message| {
        AppError::invalid_field(
            "stock",
            message,
            "Το απόθεμα πρέπει να είναι μηδέν ή μεγαλύτερο",
        )
    })
}

fn check_threshold(threshold: i32) -> AppResult<()> {
    validate_low_stock_threshold(threshold).map_err(|message| {
        AppError::invalid_field(
            "low_stock_threshold",
            message,
            "Το όριο χαμηλού αποθέματος πρέπει να είναι τουλάχιστον 1",
        )
    })
}

impl UpdateProductRequest {
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        if let Some(stock) = self.stock {
            check_stock(stock)?;
        }
        if let Some(threshold) = self.low_stock_threshold {
            check_threshold(threshold)?;
        }
        Ok(())
    }

    fn into_changes(self) -> ProductChanges {
        ProductChanges {
            stock: self.stock,
            low_stock_threshold: self.low_stock_threshold,
            notes: self.notes,
            ..Default::default()
        }
    }
}

#[derive(Serialize)]
pub struct ProductDetail {
    pub product: InventoryItem,
    pub variations: Vec<InventoryItem>,
    pub parent: Option<InventoryItem>,
    /// Own stock, or the sum over the variations for a variable product
    pub total_stock: i64,
}

#[derive(Serialize)]
pub struct UpdateProductResponse {
    pub updated: bool,
    pub product: InventoryItem,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

fn pagination_meta(limit: i64, offset: i64, total: i64) -> PaginationMeta {
    let pagination = Pagination {
        page: (offset / limit) as u32 + 1,
        per_page: limit as u32,
    };
    PaginationMeta::new(&pagination, total.max(0) as u64)
}

async fn require_product(service: &ProductService, id: i64) -> AppResult<InventoryItem> {
    service
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Search or list simple and variable products
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<Json<PaginatedResponse<InventoryItem>>> {
    let service = ProductService::new(state.db.clone());
    let (limit, offset) = query.window();

    let (data, total) = match (query.term(), query.filter) {
        (None, ProductFilter::All) => (
            service.list(limit, offset).await?,
            service.count_all().await?,
        ),
        (None, ProductFilter::Variable) => (
            service.variable_products(limit, offset).await?,
            service.count_variable_products().await?,
        ),
        (term, filter) => {
            let term = term.unwrap_or_default();
            (
                service.search(term, filter, limit, offset).await?,
                service.count_matching(term, filter).await?,
            )
        }
    };

    Ok(Json(PaginatedResponse {
        data,
        pagination: pagination_meta(limit, offset, total),
    }))
}

/// Whole inventory as a CSV download
pub async fn export_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let service = ProductService::new(state.db.clone());
    let csv = service.export_csv().await?;
    let filename = format!(
        "attachment; filename=\"inventory-{}.csv\"",
        Utc::now().format("%Y%m%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        csv,
    ))
}

/// One product with its variations or parent
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ProductDetail>> {
    let service = ProductService::new(state.db.clone());
    let product = require_product(&service, id).await?;

    let (variations, total_stock) = if product.is_variable() {
        (
            service.variations(product.product_id).await?,
            service.variable_total_stock(product.id).await?,
        )
    } else {
        (Vec::new(), i64::from(product.stock))
    };

    let parent = match product.parent_id {
        Some(parent_id) if product.is_variation() => service.get_by_id(parent_id).await?,
        _ => None,
    };

    Ok(Json(ProductDetail {
        product,
        variations,
        parent,
        total_stock,
    }))
}

/// Exact SKU lookup, used by the barcode scanner
pub async fn get_product_by_sku(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(sku): Path<String>,
) -> AppResult<Json<InventoryItem>> {
    let sku = sku.trim();
    if sku.is_empty() {
        return Err(AppError::invalid_field(
            "sku",
            "SKU is required",
            "Ο κωδικός SKU είναι υποχρεωτικός",
        ));
    }

    let service = ProductService::new(state.db.clone());
    service
        .get_by_sku(sku)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Update stock, threshold or notes of a product
pub async fn update_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProductRequest>,
) -> AppResult<Json<UpdateProductResponse>> {
    body.check()?;

    let service = ProductService::new(state.db.clone());
    let product = require_product(&service, id).await?;

    if !product.kind().tracks_stock() && body.stock.is_some() {
        return Err(AppError::VariableStockIsComputed);
    }

    let updated = service.update(id, body.into_changes()).await?;
    let product = require_product(&service, id).await?;

    Ok(Json(UpdateProductResponse { updated, product }))
}

/// Delete a product (admin only)
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DeleteResponse>> {
    current_user.0.require_delete_permission()?;

    let service = ProductService::new(state.db.clone());
    if !service.delete(id).await? {
        return Err(AppError::NotFound("Product".to_string()));
    }

    tracing::info!(id, user = %current_user.0.username, "Product deleted");
    Ok(Json(DeleteResponse { deleted: true }))
}

/// Variations stored under a variable product
pub async fn list_variations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = ProductService::new(state.db.clone());
    let product = require_product(&service, id).await?;
    Ok(Json(service.variations(product.product_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<i64>, offset: Option<i64>) -> ListProductsQuery {
        ListProductsQuery {
            q: Some("  ".to_string()),
            filter: ProductFilter::All,
            limit,
            offset,
        }
    }

    #[test]
    fn window_is_clamped() {
        assert_eq!(query(None, None).window(), (DEFAULT_LIMIT, 0));
        assert_eq!(query(Some(0), Some(-5)).window(), (1, 0));
        assert_eq!(query(Some(10_000), Some(40)).window(), (MAX_LIMIT, 40));
    }

    #[test]
    fn blank_search_term_is_ignored() {
        assert_eq!(query(None, None).term(), None);
    }

    #[test]
    fn filter_names_are_snake_case() {
        let query: ListProductsQuery =
            serde_json::from_value(serde_json::json!({"filter": "variable", "q": "shirt"})).unwrap();
        assert_eq!(query.filter, ProductFilter::Variable);
        assert_eq!(query.term(), Some("shirt"));

        let query: ListProductsQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(query.filter, ProductFilter::All);
    }

    #[test]
    fn pagination_counts_pages_from_offset() {
        let meta = pagination_meta(20, 40, 95);
        assert_eq!(meta.page, 3);
        assert_eq!(meta.total_pages, 5);
    }

    fn update(stock: Option<i32>, threshold: Option<i32>, notes: Option<String>) -> UpdateProductRequest {
        UpdateProductRequest {
            stock,
            low_stock_threshold: threshold,
            notes,
        }
    }

    #[test]
    fn negative_stock_fails_validation() {
        assert!(matches!(
            update(Some(-1), None, None).check(),
            Err(AppError::Validation { ref field, .. }) if field == "stock"
        ));
        assert!(matches!(
            update(Some(0), Some(0), None).check(),
            Err(AppError::Validation { ref field, .. }) if field == "low_stock_threshold"
        ));
        assert!(update(Some(0), Some(1), None).check().is_ok());
        assert!(update(None, None, None).check().is_ok());
    }

    #[test]
    fn long_notes_fail_validation() {
        assert!(update(None, None, Some("x".repeat(2001))).check().is_err());
        assert!(update(None, None, Some("x".repeat(2000))).check().is_ok());
    }
}
