//! WebAssembly module for the stockroom dashboard
//!
//! Provides client-side helpers for:
//! - Stock level colouring and low stock flags
//! - Relative times and prices in the user's language
//! - Sync progress labels and shortened product names

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

use shared::{Language, StockLevel, SyncPhase};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("stockroom wasm loaded"));
}

/// CSS class for a stock count (`text-danger`, `text-warning`, `text-success`)
#[wasm_bindgen]
pub fn stock_level_class(stock: i32) -> String {
    StockLevel::from_stock(stock).css_class().to_string()
}

#[wasm_bindgen]
pub fn is_low_stock(stock: i32, threshold: i32) -> bool {
    shared::is_low_stock(stock, threshold)
}

fn parse_instant(iso: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(iso.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp '{}': {}", iso, e))
}

/// Relative time between two RFC 3339 instants
pub fn time_ago_between(iso: &str, now: DateTime<Utc>, lang: &str) -> Result<String, String> {
    let then = parse_instant(iso)?;
    Ok(shared::time_ago(then, now, Language::from_code(lang)))
}

/// Relative time such as `3 hours ago` for an RFC 3339 timestamp
#[wasm_bindgen]
pub fn time_ago(iso: &str, lang: &str) -> Result<String, JsValue> {
    let now = DateTime::from_timestamp_millis(js_sys::Date::now() as i64)
        .ok_or_else(|| JsValue::from_str("Clock out of range"))?;
    time_ago_between(iso, now, lang).map_err(|e| JsValue::from_str(&e))
}

/// Euro price from a decimal string such as `"1234.5"`
#[wasm_bindgen]
pub fn format_price(amount: &str) -> Result<String, JsValue> {
    let amount = Decimal::from_str(amount.trim())
        .map_err(|e| JsValue::from_str(&format!("Invalid amount: {}", e)))?;
    Ok(shared::format_price(amount))
}

/// Shorten a product name for table cells
#[wasm_bindgen]
pub fn truncate_name(name: &str, max: usize) -> String {
    shared::truncate(name, max)
}

#[wasm_bindgen]
pub fn translate(lang: &str, key: &str) -> String {
    shared::translate(Language::from_code(lang), key).to_string()
}

/// Label under the sync progress bar, e.g. `Importing products... 42%`
#[wasm_bindgen]
pub fn progress_label(percent: u8, phase: &str, lang: &str) -> String {
    let lang = Language::from_code(lang);
    let phase = serde_json::from_value::<SyncPhase>(serde_json::Value::String(phase.to_string()))
        .unwrap_or(SyncPhase::Products);
    let key = match phase {
        SyncPhase::Products => "importing_products",
        SyncPhase::VariableProducts => "importing_variations",
    };
    // catalog strings already end with an ellipsis
    format!("{} {}%", shared::translate(lang, key), percent.min(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_classes() {
        assert_eq!(stock_level_class(0), "text-danger");
        assert_eq!(stock_level_class(8), "text-warning");
        assert_eq!(stock_level_class(40), "text-success");
    }

    #[test]
    fn low_stock_flag_matches_threshold() {
        assert!(is_low_stock(3, 3));
        assert!(!is_low_stock(4, 3));
    }

    #[test]
    fn relative_time_in_greek() {
        let now = parse_instant("2024-05-01T12:00:00Z").unwrap();
        let label = time_ago_between("2024-05-01T09:00:00Z", now, "el").unwrap();
        assert!(label.starts_with("3 "));
        assert!(time_ago_between("yesterday", now, "en").is_err());
    }

    #[test]
    fn progress_label_per_phase() {
        assert_eq!(progress_label(42, "products", "en"), "Importing products... 42%");
        assert_eq!(
            progress_label(7, "variable_products", "en"),
            "Importing variable products and variations... 7%"
        );
        assert_eq!(progress_label(250, "products", "el"), "Εισαγωγή προϊόντων... 100%");
        assert!(!progress_label(0, "products", "el").contains("......"));
    }

    #[test]
    fn unknown_keys_fall_back_to_key() {
        assert_eq!(translate("el", "no_such_key"), "no_such_key");
    }
}
