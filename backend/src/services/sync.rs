//! Resumable catalog sync from WooCommerce into the physical inventory
//!
//! A run is driven one bounded step at a time. Each step loads the owner's
//! cursor from `sync_sessions`, does one unit of work and stores the cursor
//! again, so neither the browser nor the cron job holds a request open for
//! the whole catalog.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config::{Config, SyncConfig};
use crate::error::{AppError, AppResult};
use crate::external::WooCommerceClient;
use crate::services::product::{NewProduct, ProductChanges, ProductService};
use shared::{
    CatalogProduct, CatalogVariation, ProductType, ProgressReport, SyncCursor, SyncPhase,
    SyncStatus, DEFAULT_TOTAL_PARENTS,
};

/// Sync service
#[derive(Clone)]
pub struct SyncService {
    db: PgPool,
    products: ProductService,
    client: WooCommerceClient,
    settings: SyncConfig,
    default_threshold: i32,
}

/// A `sync_log` row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SyncLogEntry {
    pub id: i64,
    pub run_id: Option<Uuid>,
    pub sync_date: DateTime<Utc>,
    pub products_added: i32,
    pub products_updated: i32,
    pub status: String,
    pub details: String,
}

/// What one step reports back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct SyncStepResult {
    pub run_id: Uuid,
    pub status: SyncStatus,
    pub phase: SyncPhase,
    pub is_complete: bool,
    pub progress_percent: u8,
    pub products_added: u32,
    pub products_updated: u32,
    pub variations_added: u32,
    pub variations_updated: u32,
    pub total_products: u32,
    pub processed_products: u32,
    pub processed_parents: u32,
    pub total_parents: u32,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

impl SyncStepResult {
    pub fn from_cursor(cursor: &SyncCursor, status: SyncStatus) -> Self {
        let is_complete = status == SyncStatus::Completed;
        Self {
            run_id: cursor.run_id,
            status,
            phase: cursor.phase,
            is_complete,
            progress_percent: if is_complete {
                100
            } else {
                cursor.progress_percent()
            },
            products_added: cursor.products_added + cursor.variable.products_added,
            products_updated: cursor.products_updated + cursor.variable.products_updated,
            variations_added: cursor.variable.variations_added,
            variations_updated: cursor.variable.variations_updated,
            total_products: cursor.total_products,
            processed_products: cursor.processed_products,
            processed_parents: cursor.variable.processed_parents,
            total_parents: cursor.variable.total_parents,
            errors: cursor.errors.clone(),
            continuation_token: (status == SyncStatus::InProgress)
                .then(|| cursor.continuation_token()),
        }
    }

    /// Whether a driver loop should stop calling `step`
    pub fn is_final(&self) -> bool {
        self.is_complete || self.status == SyncStatus::Error
    }
}

/// What happened to one catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Imported {
    Added,
    Updated,
    Unchanged,
}

/// Where a run stands after a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepOutcome {
    Continue,
    Complete,
}

/// Summary stored in `sync_log.details` for a finished run
pub fn completion_details(cursor: &SyncCursor) -> String {
    let mut details = format!(
        "Total products: {}, Processed: {}. Variable products sync: Added {} parents, {} variations, Updated {} parents, {} variations",
        cursor.total_products,
        cursor.processed_products,
        cursor.variable.products_added,
        cursor.variable.variations_added,
        cursor.variable.products_updated,
        cursor.variable.variations_updated,
    );
    if !cursor.errors.is_empty() {
        details.push_str(&format!(" ({} errors)", cursor.errors.len()));
    }
    details
}

/// A row for `sync_log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncLogRecord {
    pub run_id: Uuid,
    pub added: u32,
    pub updated: u32,
    pub status: SyncStatus,
    pub details: String,
}

impl SyncLogRecord {
    pub fn completed(cursor: &SyncCursor) -> Self {
        Self {
            run_id: cursor.run_id,
            added: cursor.total_added(),
            updated: cursor.total_updated(),
            status: SyncStatus::Completed,
            details: completion_details(cursor),
        }
    }

    /// A failed run logs no counts, only the reason
    pub fn failed(cursor: &SyncCursor, message: &str) -> Self {
        Self {
            run_id: cursor.run_id,
            added: 0,
            updated: 0,
            status: SyncStatus::Error,
            details: message.to_string(),
        }
    }
}

/// Errors that end the run instead of surfacing as an HTTP error
pub fn is_remote_failure(err: &AppError) -> bool {
    matches!(err, AppError::WooCommerce(_))
}

/// Result reported for a run that was abandoned with `message`
pub fn failed_step(mut cursor: SyncCursor, message: String) -> SyncStepResult {
    cursor.errors.push(message);
    SyncStepResult::from_cursor(&cursor, SyncStatus::Error)
}

/// How a fetched products page moves the run along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductsPage {
    Items,
    EndOfCatalog,
}

/// An empty first page means the store gave us nothing to sync
pub fn classify_products_page(page: u32, count: usize) -> AppResult<ProductsPage> {
    match (page, count) {
        (1, 0) => Err(AppError::WooCommerce(
            "Failed to retrieve products from WooCommerce API".to_string(),
        )),
        (_, 0) => Ok(ProductsPage::EndOfCatalog),
        _ => Ok(ProductsPage::Items),
    }
}

/// What the products phase does with one catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAction {
    Insert,
    /// Refresh catalog fields of the row with this database id
    Refresh(i64),
    Keep,
}

/// Existing rows are only touched on a full sync; stock is never part of it
pub fn import_action(existing_id: Option<i64>, full_sync: bool) -> ImportAction {
    match existing_id {
        None => ImportAction::Insert,
        Some(id) if full_sync => ImportAction::Refresh(id),
        Some(_) => ImportAction::Keep,
    }
}

/// Variations to import, leaving out the ones staff deleted
pub fn pending_variations<'a>(
    variations: &'a [CatalogVariation],
    tombstones: &HashSet<i64>,
) -> Vec<&'a CatalogVariation> {
    variations
        .iter()
        .filter(|v| !tombstones.contains(&v.id))
        .collect()
}

impl SyncService {
    pub fn new(db: PgPool, client: WooCommerceClient, config: &Config) -> Self {
        Self {
            products: ProductService::new(db.clone()),
            client,
            db,
            settings: config.sync.clone(),
            default_threshold: config.inventory.default_low_stock_threshold,
        }
    }

    // ========================================================================
    // Cursor persistence
    // ========================================================================

    async fn load_cursor(&self, owner: &str) -> AppResult<Option<SyncCursor>> {
        let stored = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT cursor FROM sync_sessions WHERE owner = $1",
        )
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;

        let Some(stored) = stored else {
            return Ok(None);
        };

        let cursor = match serde_json::from_value::<SyncCursor>(stored) {
            Ok(cursor) => cursor,
            Err(e) => {
                tracing::warn!(owner, error = %e, "Discarding unreadable sync cursor");
                self.clear_cursor(owner).await?;
                return Ok(None);
            }
        };

        let timeout = Duration::minutes(self.settings.timeout_minutes);
        if cursor.is_expired(Utc::now(), timeout) {
            tracing::info!(owner, run_id = %cursor.run_id, "Sync cursor timed out, starting over");
            self.clear_cursor(owner).await?;
            return Ok(None);
        }

        Ok(Some(cursor))
    }

    async fn save_cursor(&self, owner: &str, cursor: &SyncCursor) -> AppResult<()> {
        let value = serde_json::to_value(cursor)
            .map_err(|e| AppError::Internal(format!("Failed to store sync cursor: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO sync_sessions (owner, cursor, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (owner) DO UPDATE SET cursor = EXCLUDED.cursor, updated_at = NOW()
            "#,
        )
        .bind(owner)
        .bind(value)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn clear_cursor(&self, owner: &str) -> AppResult<bool> {
        let removed = sqlx::query("DELETE FROM sync_sessions WHERE owner = $1")
            .bind(owner)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(removed > 0)
    }

    async fn log_sync(&self, record: &SyncLogRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_log (run_id, products_added, products_updated, status, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.run_id)
        .bind(record.added as i32)
        .bind(record.updated as i32)
        .bind(record.status.as_str())
        .bind(&record.details)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    // ========================================================================
    // Driving a run
    // ========================================================================

    /// Run one unit of work for `owner`, starting a new run when idle
    pub async fn step(&self, owner: &str, full_sync: bool) -> AppResult<SyncStepResult> {
        if let Some(cursor) = self.load_cursor(owner).await? {
            return self.advance(owner, cursor).await;
        }

        let now = Utc::now();
        let cursor = SyncCursor::start(
            Uuid::new_v4(),
            full_sync,
            self.settings.per_page,
            self.settings.variable_per_page,
            self.settings.estimated_total,
            now,
        );
        tracing::info!(owner, run_id = %cursor.run_id, full_sync, "Starting catalog sync");

        if let Err(err) = self.client.test_connection().await {
            return self.fail(owner, cursor, err).await;
        }

        self.advance(owner, cursor).await
    }

    /// Like `step`, but a new run only walks variable products
    pub async fn step_variables(&self, owner: &str) -> AppResult<SyncStepResult> {
        if let Some(cursor) = self.load_cursor(owner).await? {
            return self.advance(owner, cursor).await;
        }

        let mut cursor =
            SyncCursor::start_variables(Uuid::new_v4(), self.settings.variable_per_page, Utc::now());
        tracing::info!(owner, run_id = %cursor.run_id, "Starting variable products sync");

        if let Err(err) = self.client.test_connection().await {
            return self.fail(owner, cursor, err).await;
        }

        match self.enter_variable_phase(&mut cursor).await {
            Ok(StepOutcome::Continue) => self.advance(owner, cursor).await,
            Ok(StepOutcome::Complete) => self.complete(owner, cursor).await,
            Err(err) => self.fail(owner, cursor, err).await,
        }
    }

    /// Keep stepping until the run completes or fails
    pub async fn run_to_completion(&self, owner: &str, full_sync: bool) -> AppResult<SyncStepResult> {
        loop {
            let result = self.step(owner, full_sync).await?;
            tracing::debug!(
                owner,
                phase = ?result.phase,
                percent = result.progress_percent,
                "Sync step finished"
            );
            if result.is_final() {
                return Ok(result);
            }
        }
    }

    async fn advance(&self, owner: &str, mut cursor: SyncCursor) -> AppResult<SyncStepResult> {
        let outcome = match cursor.phase {
            SyncPhase::Products => self.products_step(&mut cursor).await,
            SyncPhase::VariableProducts => self.variables_step(&mut cursor).await,
        };

        match outcome {
            Ok(StepOutcome::Continue) => {
                cursor.touch(Utc::now());
                self.save_cursor(owner, &cursor).await?;
                Ok(SyncStepResult::from_cursor(&cursor, SyncStatus::InProgress))
            }
            Ok(StepOutcome::Complete) => self.complete(owner, cursor).await,
            Err(err) if is_remote_failure(&err) => self.fail(owner, cursor, err).await,
            Err(err) => Err(err),
        }
    }

    async fn complete(&self, owner: &str, cursor: SyncCursor) -> AppResult<SyncStepResult> {
        self.log_sync(&SyncLogRecord::completed(&cursor)).await?;
        self.clear_cursor(owner).await?;

        tracing::info!(
            owner,
            run_id = %cursor.run_id,
            added = cursor.total_added(),
            updated = cursor.total_updated(),
            errors = cursor.errors.len(),
            "Catalog sync completed"
        );

        Ok(SyncStepResult::from_cursor(&cursor, SyncStatus::Completed))
    }

    async fn fail(&self, owner: &str, cursor: SyncCursor, err: AppError) -> AppResult<SyncStepResult> {
        let message = err.to_string();
        tracing::error!(owner, run_id = %cursor.run_id, error = %message, "Catalog sync failed");

        self.log_sync(&SyncLogRecord::failed(&cursor, &message)).await?;
        self.clear_cursor(owner).await?;

        Ok(failed_step(cursor, message))
    }

    // ========================================================================
    // Products phase
    // ========================================================================

    async fn products_step(&self, cursor: &mut SyncCursor) -> AppResult<StepOutcome> {
        let page = cursor.page;
        let wc_products = self.client.get_products(cursor.per_page, page).await?;

        if classify_products_page(page, wc_products.len())? == ProductsPage::EndOfCatalog {
            return self.enter_variable_phase(cursor).await;
        }

        let count = wc_products.len() as u32;
        cursor.record_page(count);
        tracing::debug!(page, count, estimated_total = cursor.estimated_total, "Processing products page");

        for wc_product in wc_products.iter().filter(|p| !p.is_variable()) {
            let Some(product) = wc_product.to_catalog() else {
                cursor.errors.push("Invalid product data received".to_string());
                continue;
            };

            match self.import_product(&product, cursor.full_sync).await {
                Ok(Imported::Added) => cursor.products_added += 1,
                Ok(Imported::Updated) => cursor.products_updated += 1,
                Ok(Imported::Unchanged) => {}
                Err(e) => {
                    tracing::error!(product_id = product.id, error = %e, "Failed to import product");
                    cursor
                        .errors
                        .push(format!("Error processing product {}: {}", product.id, e));
                }
            }
            cursor.processed_products += 1;
        }

        cursor.total_products += count;

        if cursor.should_continue(count) {
            cursor.page += 1;
            Ok(StepOutcome::Continue)
        } else {
            self.enter_variable_phase(cursor).await
        }
    }

    async fn import_product(&self, product: &CatalogProduct, full_sync: bool) -> AppResult<Imported> {
        let existing = self.products.get_by_product_id(product.id).await?;

        match import_action(existing.map(|item| item.id), full_sync) {
            ImportAction::Refresh(id) => {
                // stock is counted in the shop, never taken from the catalog
                let changes = ProductChanges::catalog(
                    product.name.clone(),
                    product.sku.clone(),
                    product.category.clone(),
                    product.price,
                    product.image_url.clone(),
                );
                if self.products.update(id, changes).await? {
                    Ok(Imported::Updated)
                } else {
                    Ok(Imported::Unchanged)
                }
            }
            ImportAction::Keep => Ok(Imported::Unchanged),
            ImportAction::Insert => {
                self.products
                    .add(NewProduct {
                        product_id: product.id,
                        parent_id: None,
                        product_type: ProductType::Simple,
                        variation_attributes: None,
                        title: product.name.clone(),
                        sku: product.sku.clone(),
                        category: product.category.clone(),
                        price: product.price,
                        stock: 0,
                        image_url: product.image_url.clone(),
                        low_stock_threshold: self.default_threshold,
                        notes: String::new(),
                    })
                    .await?;
                Ok(Imported::Added)
            }
        }
    }

    // ========================================================================
    // Variable products phase
    // ========================================================================

    async fn enter_variable_phase(&self, cursor: &mut SyncCursor) -> AppResult<StepOutcome> {
        let total_parents = match self.client.get_variable_products_count().await {
            Ok(Some(total)) => total,
            Ok(None) => DEFAULT_TOTAL_PARENTS,
            Err(e) => {
                tracing::warn!(error = %e, "Could not count variable products, assuming default");
                DEFAULT_TOTAL_PARENTS
            }
        };

        let first_page = self
            .client
            .get_variable_products(cursor.variable.per_page, 1)
            .await?;

        if first_page.is_empty() {
            cursor.phase = SyncPhase::VariableProducts;
            return Ok(StepOutcome::Complete);
        }

        tracing::debug!(total_parents, "Entering variable products phase");
        cursor.enter_variable_phase(total_parents, first_page);
        Ok(StepOutcome::Continue)
    }

    async fn variables_step(&self, cursor: &mut SyncCursor) -> AppResult<StepOutcome> {
        let tombstones: HashSet<i64> = self
            .products
            .deleted_variation_ids()
            .await?
            .into_iter()
            .collect();

        for _ in 0..self.settings.parents_per_step.max(1) {
            let Some(parent) = cursor.variable.next_parent().cloned() else {
                break;
            };

            match self.import_variable_product(&parent, &tombstones).await {
                Ok(counts) => {
                    let variable = &mut cursor.variable;
                    match counts.parent {
                        Imported::Added => variable.products_added += 1,
                        Imported::Updated => variable.products_updated += 1,
                        Imported::Unchanged => {}
                    }
                    variable.variations_added += counts.variations_added;
                    variable.variations_updated += counts.variations_updated;
                }
                Err(e) => {
                    tracing::error!(product_id = parent.id, error = %e, "Failed to import variable product");
                    cursor
                        .errors
                        .push(format!("Error processing product {}: {}", parent.id, e));
                }
            }

            cursor.variable.advance(parent.id);
        }

        if cursor.variable.page_exhausted() {
            let next_page = cursor.variable.page + 1;
            let parents = self
                .client
                .get_variable_products(cursor.variable.per_page, next_page)
                .await?;

            if parents.is_empty() {
                return Ok(StepOutcome::Complete);
            }
            cursor.variable.load_page(next_page, parents);
        }

        Ok(StepOutcome::Continue)
    }

    async fn import_variable_product(
        &self,
        parent: &CatalogProduct,
        tombstones: &HashSet<i64>,
    ) -> AppResult<VariableImport> {
        let (parent_db_id, parent_outcome) =
            match self.products.get_by_product_id(parent.id).await? {
                Some(existing) => {
                    let changes = ProductChanges {
                        product_type: Some(ProductType::Variable),
                        notes: Some("Variable product".to_string()),
                        ..ProductChanges::catalog(
                            parent.name.clone(),
                            parent.sku.clone(),
                            parent.category.clone(),
                            parent.price,
                            parent.image_url.clone(),
                        )
                    };
                    let updated = self.products.update(existing.id, changes).await?;
                    let outcome = if updated {
                        Imported::Updated
                    } else {
                        Imported::Unchanged
                    };
                    (existing.id, outcome)
                }
                None => {
                    let id = self
                        .products
                        .add(NewProduct {
                            product_id: parent.id,
                            parent_id: None,
                            product_type: ProductType::Variable,
                            variation_attributes: None,
                            title: parent.name.clone(),
                            sku: parent.sku.clone(),
                            category: parent.category.clone(),
                            price: parent.price,
                            stock: 0,
                            image_url: parent.image_url.clone(),
                            low_stock_threshold: self.default_threshold,
                            notes: "Variable product".to_string(),
                        })
                        .await?;
                    (id, Imported::Added)
                }
            };

        let mut import = VariableImport {
            parent: parent_outcome,
            variations_added: 0,
            variations_updated: 0,
        };

        let variations = self.client.get_published_product_variations(parent.id).await?;

        for variation in pending_variations(&variations, tombstones) {
            let attributes_text = variation.attributes_text();
            let title = variation.title_for(parent);
            let image_url = variation.image_or_parent(parent);
            let attributes = (!variation.attributes.is_empty()).then(|| variation.attributes.clone());

            match self.products.get_by_product_id(variation.id).await? {
                Some(existing) => {
                    let changes = ProductChanges {
                        product_type: Some(ProductType::Variation),
                        parent_id: Some(parent_db_id),
                        variation_attributes: attributes,
                        notes: Some(attributes_text),
                        ..ProductChanges::catalog(
                            title,
                            variation.sku.clone(),
                            parent.category.clone(),
                            variation.price,
                            image_url,
                        )
                    };
                    if self.products.update(existing.id, changes).await? {
                        import.variations_updated += 1;
                    }
                }
                None => {
                    self.products
                        .add(NewProduct {
                            product_id: variation.id,
                            parent_id: Some(parent_db_id),
                            product_type: ProductType::Variation,
                            variation_attributes: attributes,
                            title,
                            sku: variation.sku.clone(),
                            category: parent.category.clone(),
                            price: variation.price,
                            stock: 0,
                            image_url,
                            low_stock_threshold: self.default_threshold,
                            notes: attributes_text,
                        })
                        .await?;
                    import.variations_added += 1;
                }
            }
        }

        Ok(import)
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    pub async fn progress(&self, owner: &str) -> AppResult<ProgressReport> {
        Ok(self
            .load_cursor(owner)
            .await?
            .map(|cursor| ProgressReport::from(&cursor))
            .unwrap_or_else(ProgressReport::idle))
    }

    /// Abandon the owner's run; returns whether one existed
    pub async fn reset(&self, owner: &str) -> AppResult<bool> {
        let removed = self.clear_cursor(owner).await?;
        if removed {
            tracing::info!(owner, "Sync cursor reset");
        }
        Ok(removed)
    }

    pub async fn last_sync(&self) -> AppResult<Option<SyncLogEntry>> {
        Ok(self.logs(1).await?.into_iter().next())
    }

    pub async fn logs(&self, limit: i64) -> AppResult<Vec<SyncLogEntry>> {
        let entries = sqlx::query_as::<_, SyncLogEntry>(
            r#"
            SELECT id, run_id, sync_date, products_added, products_updated, status, details
            FROM sync_log
            ORDER BY sync_date DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(entries)
    }
}

/// Counts from importing one variable parent
#[derive(Debug, Clone, Copy)]
struct VariableImport {
    parent: Imported,
    variations_added: u32,
    variations_updated: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn cursor() -> SyncCursor {
        SyncCursor::start(Uuid::nil(), false, 20, 5, 5000, Utc::now())
    }

    fn parent(id: i64) -> CatalogProduct {
        CatalogProduct {
            id,
            name: format!("Parent {}", id),
            sku: String::new(),
            price: Decimal::ZERO,
            category: String::new(),
            image_url: String::new(),
            is_variable: true,
        }
    }

    #[test]
    fn in_progress_result_carries_token() {
        let mut cursor = cursor();
        cursor.page = 3;
        cursor.products_added = 4;
        cursor.variable.products_added = 1;
        let result = SyncStepResult::from_cursor(&cursor, SyncStatus::InProgress);
        assert!(!result.is_complete);
        assert!(!result.is_final());
        assert_eq!(result.products_added, 5);
        assert_eq!(
            result.continuation_token.as_deref().map(shared::decode_continuation_token),
            Some(Ok(3))
        );
    }

    #[test]
    fn completed_result_reports_full_progress() {
        let mut cursor = cursor();
        cursor.enter_variable_phase(2, vec![parent(1), parent(2)]);
        let result = SyncStepResult::from_cursor(&cursor, SyncStatus::Completed);
        assert!(result.is_complete);
        assert!(result.is_final());
        assert_eq!(result.progress_percent, 100);
        assert_eq!(result.continuation_token, None);
    }

    #[test]
    fn error_result_is_final_but_not_complete() {
        let result = SyncStepResult::from_cursor(&cursor(), SyncStatus::Error);
        assert!(!result.is_complete);
        assert!(result.is_final());
    }

    #[test]
    fn completion_details_summarise_both_phases() {
        let mut cursor = cursor();
        cursor.total_products = 45;
        cursor.processed_products = 40;
        cursor.variable.products_added = 2;
        cursor.variable.variations_added = 9;
        cursor.variable.variations_updated = 1;
        assert_eq!(
            completion_details(&cursor),
            "Total products: 45, Processed: 40. Variable products sync: Added 2 parents, 9 variations, Updated 0 parents, 1 variations"
        );

        cursor.errors.push("Invalid product data received".into());
        assert!(completion_details(&cursor).ends_with("(1 errors)"));
    }
}
