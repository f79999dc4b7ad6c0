//! Catalog sync tests
//!
//! Cursor arithmetic and step reporting. The database-backed procedure is
//! exercised through these pure pieces; nothing here needs a live store.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::{
    decode_continuation_token, CatalogProduct, CatalogVariation, ProgressReport, SyncCursor,
    SyncPhase, SyncStatus, DEFAULT_ESTIMATED_TOTAL, DEFAULT_PER_PAGE, DEFAULT_VARIABLE_PER_PAGE,
    MAX_PER_PAGE,
};
use stockroom_backend::services::sync::{
    classify_products_page, completion_details, failed_step, import_action, is_remote_failure,
    pending_variations, ImportAction, ProductsPage, SyncLogRecord, SyncStepResult,
};
use stockroom_backend::AppError;

// ============================================================================
// Helpers
// ============================================================================

fn cursor() -> SyncCursor {
    SyncCursor::start(
        Uuid::new_v4(),
        false,
        DEFAULT_PER_PAGE,
        DEFAULT_VARIABLE_PER_PAGE,
        DEFAULT_ESTIMATED_TOTAL,
        Utc::now(),
    )
}

fn parents(ids: std::ops::Range<i64>) -> Vec<CatalogProduct> {
    ids.map(|id| CatalogProduct {
        id,
        name: format!("Parent {}", id),
        sku: String::new(),
        price: Decimal::ZERO,
        category: String::new(),
        image_url: String::new(),
        is_variable: true,
    })
    .collect()
}

fn variations(ids: &[i64]) -> Vec<CatalogVariation> {
    ids.iter()
        .map(|&id| CatalogVariation {
            id,
            sku: format!("V-{}", id),
            price: Decimal::ONE,
            image_url: None,
            attributes: Vec::new(),
        })
        .collect()
}

/// Walk the products phase over a catalog of `catalog_size` products
///
/// The simulated store serves at most `MAX_PER_PAGE` items per page, whatever
/// page size the run was configured with.
fn walk_products(catalog_size: u32, per_page: u32) -> SyncCursor {
    let mut c = SyncCursor::start(Uuid::nil(), true, per_page, 5, DEFAULT_ESTIMATED_TOTAL, Utc::now());
    let served = per_page.clamp(1, MAX_PER_PAGE);
    loop {
        let fetched_before = (c.page - 1) * served;
        let count = catalog_size.saturating_sub(fetched_before).min(served);
        c.record_page(count);
        c.processed_products += count;
        c.products_added += count;
        c.total_products += count;
        if c.should_continue(count) {
            c.page += 1;
        } else {
            return c;
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_products_phase_stops_on_short_page() {
    let c = walk_products(45, 20);
    assert_eq!(c.page, 3);
    assert_eq!(c.estimated_total, 45);
    assert_eq!(c.processed_products, 45);
    assert_eq!(c.progress_percent(), 99);
}

#[test]
fn test_exact_multiple_needs_an_empty_page() {
    let c = walk_products(40, 20);
    assert_eq!(c.page, 3);
    assert_eq!(c.last_count, 0);
    assert_eq!(c.estimated_total, 40);
}

#[test]
fn test_oversized_page_setting_still_reaches_end_of_catalog() {
    let c = walk_products(350, 150);
    assert_eq!(c.per_page, MAX_PER_PAGE);
    assert_eq!(c.processed_products, 350);
    assert_eq!(c.page, 4);
}

#[test]
fn test_empty_first_page_is_an_error() {
    let err = classify_products_page(1, 0).unwrap_err();
    assert!(matches!(err, AppError::WooCommerce(_)));
    assert!(is_remote_failure(&err));

    assert_eq!(classify_products_page(3, 0).unwrap(), ProductsPage::EndOfCatalog);
    assert_eq!(classify_products_page(1, 20).unwrap(), ProductsPage::Items);
}

#[test]
fn test_existing_rows_only_refreshed_on_full_sync() {
    assert_eq!(import_action(None, false), ImportAction::Insert);
    assert_eq!(import_action(None, true), ImportAction::Insert);
    assert_eq!(import_action(Some(42), false), ImportAction::Keep);
    assert_eq!(import_action(Some(42), true), ImportAction::Refresh(42));
}

#[test]
fn test_tombstoned_variations_are_skipped() {
    let all = variations(&[501, 502, 503, 504]);
    let tombstones: HashSet<i64> = [502, 504, 999].into_iter().collect();

    let ids: Vec<i64> = pending_variations(&all, &tombstones)
        .iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(ids, vec![501, 503]);

    assert_eq!(pending_variations(&all, &HashSet::new()).len(), 4);
}

#[test]
fn test_remote_failure_is_logged_and_ends_the_run() {
    let mut c = cursor();
    c.page = 3;
    c.products_added = 12;

    let err = AppError::WooCommerce("503 Service Unavailable - ".to_string());
    assert!(is_remote_failure(&err));
    assert!(!is_remote_failure(&AppError::Internal("disk full".to_string())));

    let message = err.to_string();
    let record = SyncLogRecord::failed(&c, &message);
    assert_eq!(record.status, SyncStatus::Error);
    assert_eq!(record.status.as_str(), "error");
    assert_eq!((record.added, record.updated), (0, 0));
    assert_eq!(record.details, message);
    assert_eq!(record.run_id, c.run_id);

    let result = failed_step(c, message.clone());
    assert_eq!(result.status, SyncStatus::Error);
    assert!(result.is_final());
    assert!(!result.is_complete);
    assert!(result.continuation_token.is_none());
    assert_eq!(result.errors.last(), Some(&message));
}

#[test]
fn test_completed_run_log_record() {
    let mut c = walk_products(45, 20);
    c.variable.products_added = 2;
    c.variable.variations_added = 5;
    c.variable.variations_updated = 1;

    let record = SyncLogRecord::completed(&c);
    assert_eq!(record.status.as_str(), "success");
    assert_eq!(record.added, 45 + 2 + 5);
    assert_eq!(record.updated, 1);
    assert_eq!(record.details, completion_details(&c));
}

#[test]
fn test_variable_phase_walks_every_parent() {
    let mut c = cursor();
    c.enter_variable_phase(7, parents(1..6));
    assert_eq!(c.phase, SyncPhase::VariableProducts);

    let mut seen = Vec::new();
    while let Some(parent) = c.variable.next_parent().cloned() {
        seen.push(parent.id);
        c.variable.advance(parent.id);
        if c.variable.page_exhausted() && c.variable.page == 1 {
            c.variable.load_page(2, parents(6..8));
        }
    }

    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(c.variable.processed_parents, 7);
    assert_eq!(c.variable.processed_parent_ids, seen);
    assert_eq!(c.progress_percent(), 99);
}

#[test]
fn test_progress_report_follows_phase() {
    let mut c = cursor();
    c.page = 2;
    c.processed_products = 20;
    c.products_added = 3;

    let report = ProgressReport::from(&c);
    assert!(report.in_progress);
    assert_eq!(report.phase, Some(SyncPhase::Products));
    assert_eq!(report.processed, 20);
    assert_eq!(report.page, 2);
    assert_eq!(report.products_added, 3);

    c.enter_variable_phase(10, parents(1..6));
    c.variable.advance(1);
    c.variable.variations_added = 4;

    let report = ProgressReport::from(&c);
    assert_eq!(report.phase, Some(SyncPhase::VariableProducts));
    assert_eq!(report.processed, 1);
    assert_eq!(report.total, 10);
    assert_eq!(report.percent, 10);
    assert_eq!(report.products_added, 7);
}

#[test]
fn test_step_result_serialization() {
    let mut c = cursor();
    c.page = 4;
    c.errors.push("Invalid product data received".to_string());

    let value = serde_json::to_value(SyncStepResult::from_cursor(&c, SyncStatus::InProgress)).unwrap();
    assert_eq!(value["status"], "in_progress");
    assert_eq!(value["phase"], "products");
    assert_eq!(value["is_complete"], false);
    assert_eq!(value["errors"][0], "Invalid product data received");

    let token = value["continuation_token"].as_str().unwrap();
    assert_eq!(decode_continuation_token(token), Ok(4));

    let done = serde_json::to_value(SyncStepResult::from_cursor(&c, SyncStatus::Completed)).unwrap();
    assert_eq!(done["is_complete"], true);
    assert_eq!(done["progress_percent"], 100);
    assert!(done.get("continuation_token").is_none());
}

#[test]
fn test_completion_details_text() {
    let mut c = walk_products(45, 20);
    c.variable.products_added = 1;
    c.variable.variations_added = 3;
    assert_eq!(
        completion_details(&c),
        "Total products: 45, Processed: 45. Variable products sync: Added 1 parents, 3 variations, Updated 0 parents, 0 variations"
    );
}

#[test]
fn test_cursor_survives_storage() {
    let mut c = cursor();
    c.enter_variable_phase(3, parents(10..13));
    c.variable.advance(10);

    let stored = serde_json::to_value(&c).unwrap();
    let restored: SyncCursor = serde_json::from_value(stored).unwrap();
    assert_eq!(restored, c);
    assert_eq!(restored.variable.next_parent().map(|p| p.id), Some(11));
}

#[test]
fn test_stale_cursor_expires() {
    let mut c = cursor();
    c.touch(Utc::now() - Duration::minutes(90));
    assert!(c.is_expired(Utc::now(), Duration::minutes(60)));
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Progress never reports completion while a run is still going
    #[test]
    fn prop_progress_below_hundred(processed in 0u32..100_000, estimate in 0u32..100_000) {
        let mut c = cursor();
        c.processed_products = processed;
        c.estimated_total = estimate;
        prop_assert!(c.progress_percent() <= 99);
    }

    /// Every product of the catalog is seen exactly once, whatever the page setting
    #[test]
    fn prop_products_phase_covers_catalog(size in 0u32..1000, per_page in 1u32..300) {
        let c = walk_products(size, per_page);
        prop_assert_eq!(c.processed_products, size);
        prop_assert_eq!(c.estimated_total, size);
        prop_assert!(c.last_count < c.per_page);
    }

    /// Only tombstoned ids are ever dropped
    #[test]
    fn prop_pending_variations_drop_only_tombstones(
        ids in proptest::collection::hash_set(1i64..500, 0..30),
        deleted in proptest::collection::hash_set(1i64..500, 0..30),
    ) {
        let ids: Vec<i64> = ids.into_iter().collect();
        let all = variations(&ids);
        let kept = pending_variations(&all, &deleted);
        prop_assert!(kept.iter().all(|v| !deleted.contains(&v.id)));
        prop_assert_eq!(kept.len(), ids.iter().filter(|id| !deleted.contains(id)).count());
    }

    /// The estimate never shrinks while pages keep coming back full
    #[test]
    fn prop_full_pages_never_shrink_estimate(pages in 1u32..30, start in 0u32..10_000) {
        let mut c = cursor();
        c.estimated_total = start;
        let mut previous = start;
        for page in 1..=pages {
            c.page = page;
            c.record_page(c.per_page);
            prop_assert!(c.estimated_total >= previous);
            previous = c.estimated_total;
        }
    }

    /// Totals across phases add up
    #[test]
    fn prop_totals_sum_phases(
        added in 0u32..1000,
        updated in 0u32..1000,
        parents_added in 0u32..100,
        variations_added in 0u32..1000,
        variations_updated in 0u32..1000,
    ) {
        let mut c = cursor();
        c.products_added = added;
        c.products_updated = updated;
        c.variable.products_added = parents_added;
        c.variable.variations_added = variations_added;
        c.variable.variations_updated = variations_updated;

        prop_assert_eq!(c.total_added(), added + parents_added + variations_added);
        prop_assert_eq!(c.total_updated(), updated + variations_updated);

        let result = SyncStepResult::from_cursor(&c, SyncStatus::InProgress);
        prop_assert_eq!(result.products_added, added + parents_added);
    }
}
