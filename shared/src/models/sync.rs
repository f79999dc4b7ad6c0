//! Resumable catalog sync cursor
//!
//! A sync run is split into small units of work (one catalog page, or a few
//! variable parents). Between units the cursor below is persisted so the next
//! request picks up where the previous one stopped.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::catalog::CatalogProduct;

/// Page size for the products phase
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Page size when listing variable parents
pub const DEFAULT_VARIABLE_PER_PAGE: u32 = 5;

/// Largest page WooCommerce will return; bigger requests are cut down to it
pub const MAX_PER_PAGE: u32 = 100;

/// Catalog size assumed before the end of the catalog has been seen
pub const DEFAULT_ESTIMATED_TOTAL: u32 = 5000;

/// Parent count assumed when the shop does not report one
pub const DEFAULT_TOTAL_PARENTS: u32 = 100;

/// Cursors untouched for longer than this are abandoned
pub const DEFAULT_TIMEOUT_MINUTES: i64 = 60;

/// Overall state of a sync run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    InProgress,
    Completed,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Completed => "success",
            SyncStatus::Error => "error",
        }
    }
}

/// Which part of the catalog a run is walking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Paging through the product list, importing non-variable products
    Products,
    /// Walking variable parents and their variations
    VariableProducts,
}

/// Resume point of the variable-products phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariableCursor {
    pub page: u32,
    pub per_page: u32,
    pub processed_parents: u32,
    pub total_parents: u32,
    /// Index of the next parent to process in `pending_parents`
    pub current_parent_index: usize,
    /// Parents of the current page, kept so a step does not refetch them
    pub pending_parents: Vec<CatalogProduct>,
    pub products_added: u32,
    pub products_updated: u32,
    pub variations_added: u32,
    pub variations_updated: u32,
    pub processed_parent_ids: Vec<i64>,
}

impl VariableCursor {
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            processed_parents: 0,
            total_parents: 0,
            current_parent_index: 0,
            pending_parents: Vec::new(),
            products_added: 0,
            products_updated: 0,
            variations_added: 0,
            variations_updated: 0,
            processed_parent_ids: Vec::new(),
        }
    }

    /// Replace the pending list with a freshly fetched page of parents
    pub fn load_page(&mut self, page: u32, parents: Vec<CatalogProduct>) {
        self.page = page;
        self.pending_parents = parents;
        self.current_parent_index = 0;
    }

    /// The next parent waiting to be processed
    pub fn next_parent(&self) -> Option<&CatalogProduct> {
        self.pending_parents.get(self.current_parent_index)
    }

    /// Mark the current parent as done
    pub fn advance(&mut self, parent_id: i64) {
        self.current_parent_index += 1;
        self.processed_parents += 1;
        self.processed_parent_ids.push(parent_id);
    }

    /// Whether every parent of the current page has been processed
    pub fn page_exhausted(&self) -> bool {
        self.current_parent_index >= self.pending_parents.len()
    }

    pub fn progress_percent(&self) -> u8 {
        capped_percent(u64::from(self.processed_parents), u64::from(self.total_parents))
    }
}

/// Persisted state of one sync run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncCursor {
    pub run_id: Uuid,
    pub phase: SyncPhase,
    /// Whether existing rows get their catalog fields refreshed
    pub full_sync: bool,
    pub page: u32,
    pub per_page: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub products_added: u32,
    pub products_updated: u32,
    pub total_products: u32,
    pub processed_products: u32,
    pub estimated_total: u32,
    pub last_count: u32,
    pub errors: Vec<String>,
    pub variable: VariableCursor,
}

impl SyncCursor {
    /// A run that starts with the products phase
    pub fn start(
        run_id: Uuid,
        full_sync: bool,
        per_page: u32,
        variable_per_page: u32,
        estimated_total: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            phase: SyncPhase::Products,
            full_sync,
            page: 1,
            // must match what the store actually returns, or every page looks short
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            started_at: now,
            updated_at: now,
            products_added: 0,
            products_updated: 0,
            total_products: 0,
            processed_products: 0,
            estimated_total,
            last_count: 0,
            errors: Vec::new(),
            variable: VariableCursor::new(variable_per_page),
        }
    }

    /// A run that only walks variable products and their variations
    pub fn start_variables(run_id: Uuid, variable_per_page: u32, now: DateTime<Utc>) -> Self {
        let mut cursor = Self::start(run_id, true, DEFAULT_PER_PAGE, variable_per_page, 0, now);
        cursor.phase = SyncPhase::VariableProducts;
        cursor
    }

    /// Refine the catalog size estimate after fetching `count` products
    pub fn record_page(&mut self, count: u32) {
        if count < self.per_page {
            self.estimated_total = (self.page - 1) * self.per_page + count;
        } else if self.page > 1 {
            // still seeing full pages: assume 20% more is out there
            let projected = (self.page * self.per_page * 6).div_ceil(5);
            self.estimated_total = self.estimated_total.max(projected);
        }
        self.last_count = count;
    }

    /// Whether another products page should be requested after `count` items
    pub fn should_continue(&self, count: u32) -> bool {
        if count != self.per_page {
            return false;
        }
        let nothing_changed = self.products_added + self.products_updated == 0;
        let nearly_done =
            u64::from(self.processed_products) * 10 > u64::from(self.estimated_total) * 9;
        !(self.page > 10 && nothing_changed && nearly_done)
    }

    /// Progress of the current phase, never reporting 100 before completion
    pub fn progress_percent(&self) -> u8 {
        match self.phase {
            SyncPhase::Products => capped_percent(
                u64::from(self.processed_products),
                u64::from(self.estimated_total),
            ),
            SyncPhase::VariableProducts => self.variable.progress_percent(),
        }
    }

    /// Whether the cursor has been abandoned for longer than `timeout`
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.updated_at > timeout
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Move on to the variable-products phase
    pub fn enter_variable_phase(&mut self, total_parents: u32, first_page: Vec<CatalogProduct>) {
        self.phase = SyncPhase::VariableProducts;
        self.variable.total_parents = total_parents;
        self.variable.load_page(1, first_page);
    }

    /// Rows inserted across both phases
    pub fn total_added(&self) -> u32 {
        self.products_added + self.variable.products_added + self.variable.variations_added
    }

    /// Rows refreshed across both phases
    pub fn total_updated(&self) -> u32 {
        self.products_updated + self.variable.products_updated + self.variable.variations_updated
    }

    /// Opaque token handed to the client while a run is in progress
    pub fn continuation_token(&self) -> String {
        encode_continuation_token(self.page)
    }
}

#[derive(Serialize, Deserialize)]
struct TokenBody {
    page: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContinuationTokenError {
    #[error("continuation token is not valid base64")]
    Encoding,
    #[error("continuation token has an unexpected payload")]
    Payload,
}

pub fn encode_continuation_token(page: u32) -> String {
    let body = serde_json::json!({ "page": page }).to_string();
    BASE64.encode(body)
}

pub fn decode_continuation_token(token: &str) -> Result<u32, ContinuationTokenError> {
    let raw = BASE64
        .decode(token.trim())
        .map_err(|_| ContinuationTokenError::Encoding)?;
    serde_json::from_slice::<TokenBody>(&raw)
        .map(|body| body.page)
        .map_err(|_| ContinuationTokenError::Payload)
}

/// `round(part / whole * 100)` capped at 99; 0 when `whole` is 0
pub fn capped_percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let rounded = (part * 100 + whole / 2) / whole;
    rounded.min(99) as u8
}

/// Snapshot returned by the progress endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressReport {
    pub in_progress: bool,
    pub phase: Option<SyncPhase>,
    pub percent: u8,
    pub products_added: u32,
    pub products_updated: u32,
    pub processed: u32,
    pub total: u32,
    pub page: u32,
    pub last_count: u32,
}

impl ProgressReport {
    pub fn idle() -> Self {
        Self {
            in_progress: false,
            phase: None,
            percent: 0,
            products_added: 0,
            products_updated: 0,
            processed: 0,
            total: 0,
            page: 1,
            last_count: 0,
        }
    }
}

impl From<&SyncCursor> for ProgressReport {
    fn from(cursor: &SyncCursor) -> Self {
        let (processed, total, page) = match cursor.phase {
            SyncPhase::Products => (
                cursor.processed_products,
                cursor.estimated_total,
                cursor.page,
            ),
            SyncPhase::VariableProducts => (
                cursor.variable.processed_parents,
                cursor.variable.total_parents,
                cursor.variable.page,
            ),
        };
        Self {
            in_progress: true,
            phase: Some(cursor.phase),
            percent: cursor.progress_percent(),
            products_added: cursor.total_added(),
            products_updated: cursor.total_updated(),
            processed,
            total,
            page,
            last_count: cursor.last_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor() -> SyncCursor {
        SyncCursor::start(
            Uuid::nil(),
            false,
            DEFAULT_PER_PAGE,
            DEFAULT_VARIABLE_PER_PAGE,
            DEFAULT_ESTIMATED_TOTAL,
            Utc::now(),
        )
    }

    #[test]
    fn full_first_page_keeps_default_estimate() {
        let mut c = cursor();
        c.record_page(20);
        assert_eq!(c.estimated_total, DEFAULT_ESTIMATED_TOTAL);
        assert_eq!(c.last_count, 20);
    }

    #[test]
    fn page_size_is_capped_at_store_maximum() {
        let mut c = SyncCursor::start(Uuid::nil(), false, 150, 500, DEFAULT_ESTIMATED_TOTAL, Utc::now());
        assert_eq!(c.per_page, MAX_PER_PAGE);
        assert_eq!(c.variable.per_page, MAX_PER_PAGE);

        c.record_page(MAX_PER_PAGE);
        assert!(c.should_continue(MAX_PER_PAGE));
        assert_eq!(c.estimated_total, DEFAULT_ESTIMATED_TOTAL);
    }

    #[test]
    fn short_page_pins_exact_total() {
        let mut c = cursor();
        c.page = 4;
        c.record_page(7);
        assert_eq!(c.estimated_total, 3 * 20 + 7);
    }

    #[test]
    fn full_later_page_grows_estimate_with_buffer() {
        let mut c = cursor();
        c.estimated_total = 10;
        c.page = 3;
        c.record_page(20);
        assert_eq!(c.estimated_total, 72);
    }

    #[test]
    fn short_page_stops_the_run() {
        let c = cursor();
        assert!(!c.should_continue(19));
        assert!(c.should_continue(20));
    }

    #[test]
    fn stalled_run_past_page_ten_stops_early() {
        let mut c = cursor();
        c.page = 11;
        c.estimated_total = 220;
        c.processed_products = 210;
        assert!(!c.should_continue(20));

        c.products_added = 1;
        assert!(c.should_continue(20));
    }

    #[test]
    fn percent_is_capped_below_completion() {
        assert_eq!(capped_percent(0, 0), 0);
        assert_eq!(capped_percent(1, 3), 33);
        assert_eq!(capped_percent(1, 2), 50);
        assert_eq!(capped_percent(500, 100), 99);
    }

    #[test]
    fn continuation_token_round_trips() {
        let token = encode_continuation_token(7);
        assert_eq!(decode_continuation_token(&token), Ok(7));
        assert_eq!(
            decode_continuation_token("not base64!"),
            Err(ContinuationTokenError::Encoding)
        );
    }

    #[test]
    fn cursor_expires_after_inactivity() {
        let mut c = cursor();
        let now = c.updated_at;
        assert!(!c.is_expired(now + Duration::minutes(59), Duration::minutes(60)));
        assert!(c.is_expired(now + Duration::minutes(61), Duration::minutes(60)));
        c.touch(now + Duration::minutes(61));
        assert!(!c.is_expired(now + Duration::minutes(62), Duration::minutes(60)));
    }

    #[test]
    fn idle_progress_reports_nothing_running() {
        let idle = ProgressReport::idle();
        assert!(!idle.in_progress);
        assert_eq!(idle.percent, 0);
        assert_eq!(idle.page, 1);
    }
}
