//! Physical inventory service
//!
//! The `physical_inventory` table holds the in-store stock count of every
//! catalog product. Variable products are parents whose stock lives on their
//! variations; a variation's `parent_id` is always the parent's database id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};
use shared::{is_low_stock, ProductFilter, ProductType, VariationAttribute};

const ITEM_COLUMNS: &str = "id, product_id, parent_id, product_type, variation_attributes, \
     title, sku, category, price, stock, image_url, last_updated, created_at, \
     is_low_stock, low_stock_threshold, notes";

/// Notes marker used by rows imported before `parent_id` existed
const LEGACY_VARIATION_NOTE: &str = "Variation of product ID:";

/// Physical inventory service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// A row of the physical inventory
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryItem {
    pub id: i64,
    /// WooCommerce product or variation id
    pub product_id: i64,
    /// Database id of the variable parent, for variations
    pub parent_id: Option<i64>,
    pub product_type: String,
    pub variation_attributes: Option<serde_json::Value>,
    pub title: String,
    pub sku: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: String,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_low_stock: bool,
    pub low_stock_threshold: i32,
    pub notes: String,
}

impl InventoryItem {
    /// Unknown stored types are treated as simple products
    pub fn kind(&self) -> ProductType {
        self.product_type.parse().unwrap_or(ProductType::Simple)
    }

    pub fn is_variable(&self) -> bool {
        self.kind() == ProductType::Variable
    }

    pub fn is_variation(&self) -> bool {
        self.kind() == ProductType::Variation
    }

}

/// A product to insert
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub product_id: i64,
    pub parent_id: Option<i64>,
    pub product_type: ProductType,
    pub variation_attributes: Option<Vec<VariationAttribute>>,
    pub title: String,
    pub sku: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: String,
    pub low_stock_threshold: i32,
    pub notes: String,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub product_type: Option<ProductType>,
    pub parent_id: Option<i64>,
    pub title: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    pub variation_attributes: Option<Vec<VariationAttribute>>,
    pub stock: Option<i32>,
    pub low_stock_threshold: Option<i32>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.product_type.is_none()
            && self.parent_id.is_none()
            && self.title.is_none()
            && self.sku.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.notes.is_none()
            && self.variation_attributes.is_none()
            && self.stock.is_none()
            && self.low_stock_threshold.is_none()
    }

    /// Stock, threshold and low-stock flag after applying these changes
    pub fn stock_state(&self, stock: i32, threshold: i32) -> (i32, i32, bool) {
        let stock = self.stock.unwrap_or(stock);
        let threshold = self.low_stock_threshold.unwrap_or(threshold);
        (stock, threshold, is_low_stock(stock, threshold))
    }

    /// Catalog fields refreshed by a sync
    pub fn catalog(
        title: String,
        sku: String,
        category: String,
        price: Decimal,
        image_url: String,
    ) -> Self {
        Self {
            title: Some(title),
            sku: Some(sku),
            category: Some(category),
            price: Some(price),
            image_url: Some(image_url),
            ..Default::default()
        }
    }
}

/// One line of the inventory CSV export
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: i64,
    product_id: i64,
    parent_id: Option<i64>,
    product_type: &'a str,
    title: &'a str,
    sku: &'a str,
    category: &'a str,
    price: Decimal,
    stock: i32,
    low_stock_threshold: i32,
    is_low_stock: bool,
    last_updated: String,
}

/// `%term%` for ILIKE, with wildcard characters in `term` escaped
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Render inventory rows as CSV with a header line
pub fn inventory_csv(items: &[InventoryItem]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for item in items {
        writer
            .serialize(ExportRow {
                id: item.id,
                product_id: item.product_id,
                parent_id: item.parent_id,
                product_type: &item.product_type,
                title: &item.title,
                sku: &item.sku,
                category: &item.category,
                price: item.price,
                stock: item.stock,
                low_stock_threshold: item.low_stock_threshold,
                is_low_stock: item.is_low_stock,
                last_updated: item.last_updated.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
            .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM physical_inventory WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(item)
    }

    /// Look up by WooCommerce id
    pub async fn get_by_product_id(&self, product_id: i64) -> AppResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM physical_inventory WHERE product_id = $1",
            ITEM_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(item)
    }

    pub async fn get_by_sku(&self, sku: &str) -> AppResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM physical_inventory WHERE sku = $1 LIMIT 1",
            ITEM_COLUMNS
        ))
        .bind(sku)
        .fetch_optional(&self.db)
        .await?;
        Ok(item)
    }

    /// Simple and variable products whose title or SKU contains `term`
    pub async fn search(
        &self,
        term: &str,
        filter: ProductFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {}
            FROM physical_inventory
            WHERE (title ILIKE $1 OR sku ILIKE $1)
              AND product_type IN ('simple', 'variable')
              AND ($2 = FALSE OR is_low_stock)
              AND ($3 = FALSE OR product_type = 'variable')
            ORDER BY title ASC
            LIMIT $4 OFFSET $5
            "#,
            ITEM_COLUMNS
        ))
        .bind(like_pattern(term))
        .bind(filter == ProductFilter::LowStock)
        .bind(filter == ProductFilter::Variable)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn count_matching(&self, term: &str, filter: ProductFilter) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM physical_inventory
            WHERE (title ILIKE $1 OR sku ILIKE $1)
              AND product_type IN ('simple', 'variable')
              AND ($2 = FALSE OR is_low_stock)
              AND ($3 = FALSE OR product_type = 'variable')
            "#,
        )
        .bind(like_pattern(term))
        .bind(filter == ProductFilter::LowStock)
        .bind(filter == ProductFilter::Variable)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    /// Simple and variable products in title order
    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {}
            FROM physical_inventory
            WHERE product_type IN ('simple', 'variable')
            ORDER BY title ASC
            LIMIT $1 OFFSET $2
            "#,
            ITEM_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn count_all(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM physical_inventory WHERE product_type IN ('simple', 'variable')",
        )
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    /// Make sure `parent_id` names a variable row by database id
    ///
    /// Callers sometimes hand over the WooCommerce id instead; that is
    /// resolved here. An unresolvable parent is stored as NULL.
    async fn resolve_parent(&self, parent_id: i64, product_id: i64) -> AppResult<Option<i64>> {
        let by_db_id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM physical_inventory WHERE id = $1 AND product_type = 'variable'",
        )
        .bind(parent_id)
        .fetch_optional(&self.db)
        .await?;

        if by_db_id.is_some() {
            return Ok(by_db_id);
        }

        tracing::warn!(
            parent_id,
            product_id,
            "parent_id is not the database id of a variable product"
        );

        let by_wc_id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM physical_inventory WHERE product_id = $1 AND product_type = 'variable'",
        )
        .bind(parent_id)
        .fetch_optional(&self.db)
        .await?;

        match by_wc_id {
            Some(corrected) => {
                tracing::info!(product_id, corrected, "Corrected parent_id to database id");
                Ok(Some(corrected))
            }
            None => {
                tracing::warn!(product_id, "Could not find a valid parent, storing NULL");
                Ok(None)
            }
        }
    }

    /// Insert a product and return its database id
    pub async fn add(&self, product: NewProduct) -> AppResult<i64> {
        let parent_id = match product.parent_id {
            Some(parent_id) => self.resolve_parent(parent_id, product.product_id).await?,
            None => None,
        };

        let attributes = product
            .variation_attributes
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| AppError::Internal(format!("Invalid variation attributes: {}", e)))?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO physical_inventory
                (product_id, parent_id, product_type, variation_attributes, title, sku, category,
                 price, stock, image_url, is_low_stock, low_stock_threshold, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(product.product_id)
        .bind(parent_id)
        .bind(product.product_type.as_str())
        .bind(attributes)
        .bind(&product.title)
        .bind(&product.sku)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.image_url)
        .bind(is_low_stock(product.stock, product.low_stock_threshold))
        .bind(product.low_stock_threshold)
        .bind(&product.notes)
        .fetch_one(&self.db)
        .await?;

        tracing::debug!(
            id,
            product_id = product.product_id,
            product_type = product.product_type.as_str(),
            ?parent_id,
            "Added inventory row"
        );

        Ok(id)
    }

    /// Apply a partial update; returns false when there was nothing to do
    pub async fn update(&self, id: i64, changes: ProductChanges) -> AppResult<bool> {
        if changes.is_empty() {
            return Ok(false);
        }

        let Some(existing) = self.get_by_id(id).await? else {
            return Ok(false);
        };

        let (stock, threshold, low) = changes.stock_state(existing.stock, existing.low_stock_threshold);

        let attributes = match changes.variation_attributes {
            Some(ref attrs) => Some(
                serde_json::to_value(attrs)
                    .map_err(|e| AppError::Internal(format!("Invalid variation attributes: {}", e)))?,
            ),
            None => existing.variation_attributes,
        };

        sqlx::query(
            r#"
            UPDATE physical_inventory
            SET title = $1, sku = $2, category = $3, price = $4, image_url = $5, notes = $6,
                variation_attributes = $7, stock = $8, low_stock_threshold = $9,
                is_low_stock = $10, product_type = $11, parent_id = $12, last_updated = NOW()
            WHERE id = $13
            "#,
        )
        .bind(changes.title.unwrap_or(existing.title))
        .bind(changes.sku.unwrap_or(existing.sku))
        .bind(changes.category.unwrap_or(existing.category))
        .bind(changes.price.unwrap_or(existing.price))
        .bind(changes.image_url.unwrap_or(existing.image_url))
        .bind(changes.notes.unwrap_or(existing.notes))
        .bind(attributes)
        .bind(stock)
        .bind(threshold)
        .bind(low)
        .bind(changes.product_type.map_or(existing.product_type, |t| t.as_str().to_string()))
        .bind(changes.parent_id.or(existing.parent_id))
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(true)
    }

    pub async fn update_stock(&self, id: i64, stock: i32) -> AppResult<bool> {
        self.update(
            id,
            ProductChanges {
                stock: Some(stock),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn recently_updated(&self, limit: i64) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {}
            FROM physical_inventory
            WHERE product_type IN ('simple', 'variable')
            ORDER BY last_updated DESC
            LIMIT $1
            "#,
            ITEM_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    /// Low-stock rows that are not yet empty, emptiest first
    pub async fn low_stock(&self, limit: i64) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {}
            FROM physical_inventory
            WHERE is_low_stock AND stock > 0
            ORDER BY stock ASC
            LIMIT $1
            "#,
            ITEM_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    /// Σ price × stock over the whole inventory
    pub async fn total_value(&self) -> AppResult<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(price * stock), 0) FROM physical_inventory",
        )
        .fetch_one(&self.db)
        .await?;
        Ok(total)
    }

    /// Delete a row; a variable product takes its variations with it
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;

        let removed_variations = sqlx::query(
            "DELETE FROM physical_inventory WHERE parent_id = $1 AND product_type = 'variation'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deleted = sqlx::query("DELETE FROM physical_inventory WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if deleted > 0 {
            tracing::info!(id, removed_variations, "Deleted inventory row");
        }
        Ok(deleted > 0)
    }

    /// Variations of the parent with WooCommerce id `parent_product_id`
    pub async fn variations(&self, parent_product_id: i64) -> AppResult<Vec<InventoryItem>> {
        let parent = self.get_by_product_id(parent_product_id).await?;

        let items = match parent {
            Some(parent) if parent.is_variable() => {
                sqlx::query_as::<_, InventoryItem>(&format!(
                    r#"
                    SELECT {}
                    FROM physical_inventory
                    WHERE parent_id = $1 AND product_type = 'variation'
                    ORDER BY title ASC
                    "#,
                    ITEM_COLUMNS
                ))
                .bind(parent.id)
                .fetch_all(&self.db)
                .await?
            }
            _ => {
                sqlx::query_as::<_, InventoryItem>(&format!(
                    r#"
                    SELECT {}
                    FROM physical_inventory
                    WHERE notes LIKE $1
                    ORDER BY title ASC
                    "#,
                    ITEM_COLUMNS
                ))
                .bind(format!("%{} {}%", LEGACY_VARIATION_NOTE, parent_product_id))
                .fetch_all(&self.db)
                .await?
            }
        };

        Ok(items)
    }

    /// Delete a variation and tombstone its WooCommerce id
    pub async fn delete_variation(&self, id: i64, variation_id: i64) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO deleted_variations (variation_id, deleted_at)
            VALUES ($1, NOW())
            ON CONFLICT (variation_id) DO UPDATE SET deleted_at = EXCLUDED.deleted_at
            "#,
        )
        .bind(variation_id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query(
            "DELETE FROM physical_inventory WHERE id = $1 AND product_type = 'variation'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        tracing::info!(id, variation_id, "Deleted variation");
        Ok(true)
    }

    /// WooCommerce ids of tombstoned variations
    pub async fn deleted_variation_ids(&self) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT variation_id FROM deleted_variations")
            .fetch_all(&self.db)
            .await?;
        Ok(ids)
    }

    pub async fn variable_products(&self, limit: i64, offset: i64) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {}
            FROM physical_inventory
            WHERE product_type = 'variable'
            ORDER BY title ASC
            LIMIT $1 OFFSET $2
            "#,
            ITEM_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn count_variable_products(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM physical_inventory WHERE product_type = 'variable'",
        )
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    /// Sum of the stock of a variable product's variations
    pub async fn variable_total_stock(&self, id: i64) -> AppResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(stock), 0)::BIGINT
            FROM physical_inventory
            WHERE parent_id = $1 AND product_type = 'variation'
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(total)
    }

    /// The whole inventory as CSV, parents followed by their variations
    pub async fn export_csv(&self) -> AppResult<Vec<u8>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {}
            FROM physical_inventory
            ORDER BY COALESCE(parent_id, id), parent_id NULLS FIRST, title ASC
            "#,
            ITEM_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        inventory_csv(&items)
    }
}
