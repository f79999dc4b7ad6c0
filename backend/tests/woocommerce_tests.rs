//! WooCommerce client tests
//!
//! Request signing and the mapping from the (messy) wire format into the
//! normalised catalog types. No network access is needed.

use proptest::prelude::*;
use rust_decimal::Decimal;

use stockroom_backend::external::woocommerce::{
    has_next_page, oauth_signature, percent_encode, select_low_stock, WcProduct, WcVariation,
    MAX_LOW_STOCK_SCAN_PAGES, MAX_VARIATION_PAGES,
};
use shared::{CatalogProduct, MAX_PER_PAGE};

fn product(json: serde_json::Value) -> WcProduct {
    serde_json::from_value(json).unwrap()
}

fn parent() -> CatalogProduct {
    CatalogProduct {
        id: 500,
        name: "Linen Shirt".to_string(),
        sku: "LS".to_string(),
        price: Decimal::new(3900, 2),
        category: "Clothing".to_string(),
        image_url: "https://shop.example.gr/shirt.jpg".to_string(),
        is_variable: true,
    }
}

// ============================================================================
// OAuth 1.0a signing
// ============================================================================

#[test]
fn test_percent_encoding_is_rfc3986() {
    assert_eq!(percent_encode("café & tea"), "caf%C3%A9%20%26%20tea");
    assert_eq!(percent_encode("a+b/c~"), "a%2Bb%2Fc~");
    assert_eq!(percent_encode("Az09-._~"), "Az09-._~");
}

#[test]
fn test_oauth_signature_known_vector() {
    let params: Vec<(String, String)> = [
        ("oauth_consumer_key", "ck_test"),
        ("oauth_nonce", "abc123"),
        ("oauth_signature_method", "HMAC-SHA256"),
        ("oauth_timestamp", "1700000000"),
        ("per_page", "20"),
        ("page", "1"),
        ("status", "publish"),
        ("search", "café & tea"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let signature = oauth_signature(
        "GET",
        "http://shop.local/wp-json/wc/v3/products",
        &params,
        "cs_test",
    )
    .unwrap();

    assert_eq!(signature, "uN/EcH2ZT6ybNBs0SrUBMX9qAPntFD+BjNMkKEIqefk=");
}

#[test]
fn test_oauth_signature_ignores_parameter_order() {
    let forward = vec![
        ("page".to_string(), "2".to_string()),
        ("per_page".to_string(), "20".to_string()),
    ];
    let reversed: Vec<_> = forward.iter().rev().cloned().collect();

    let url = "http://shop.local/wp-json/wc/v3/products";
    assert_eq!(
        oauth_signature("GET", url, &forward, "secret").unwrap(),
        oauth_signature("get", url, &reversed, "secret").unwrap()
    );
}

// ============================================================================
// Wire format
// ============================================================================

#[test]
fn test_product_maps_to_catalog_entry() {
    let wc = product(serde_json::json!({
        "id": 101,
        "name": "Olive Oil 1L",
        "type": "simple",
        "sku": "OIL-1L",
        "price": "12.50",
        "categories": [{"name": "Pantry"}, {"name": "Oils"}],
        "images": [{"src": "https://shop.example.gr/oil.jpg"}]
    }));

    let catalog = wc.to_catalog().unwrap();
    assert_eq!(catalog.id, 101);
    assert_eq!(catalog.price, Decimal::new(1250, 2));
    assert_eq!(catalog.category, "Pantry");
    assert_eq!(catalog.image_url, "https://shop.example.gr/oil.jpg");
    assert!(!catalog.is_variable);
}

#[test]
fn test_lenient_prices_and_missing_fields() {
    let empty_price = product(serde_json::json!({"id": 1, "name": "Gift card", "price": ""}));
    assert_eq!(empty_price.price, Decimal::ZERO);
    assert_eq!(empty_price.to_catalog().unwrap().sku, "");

    let numeric_price = product(serde_json::json!({"id": 2, "name": "Soap", "price": 3.2}));
    assert_eq!(numeric_price.price, Decimal::new(32, 1));

    let null_price = product(serde_json::json!({"id": 3, "name": "Tea", "price": null}));
    assert_eq!(null_price.price, Decimal::ZERO);
}

#[test]
fn test_invalid_products_have_no_catalog_entry() {
    assert!(product(serde_json::json!({"name": "No id"})).to_catalog().is_none());
    assert!(product(serde_json::json!({"id": 0, "name": "Zero"})).to_catalog().is_none());
    assert!(product(serde_json::json!({"id": 9, "name": "   "})).to_catalog().is_none());
    assert!(product(serde_json::json!({"id": 9})).to_catalog().is_none());
}

#[test]
fn test_variable_products_are_flagged() {
    let wc = product(serde_json::json!({"id": 500, "name": "Linen Shirt", "type": "variable"}));
    assert!(wc.is_variable());
    assert!(wc.to_catalog().unwrap().is_variable);
}

#[test]
fn test_variation_mapping_and_titles() {
    let variation: WcVariation = serde_json::from_value(serde_json::json!({
        "id": 501,
        "status": "publish",
        "sku": "LS-XL-RED",
        "price": "41.00",
        "image": {"src": ""},
        "attributes": [
            {"name": "Size", "option": "XL"},
            {"name": "", "option": "Red"},
            {"name": "Fit", "option": null}
        ]
    }))
    .unwrap();

    assert!(variation.is_published());
    let catalog = variation.to_catalog().unwrap();
    let parent = parent();

    assert_eq!(catalog.attributes_text(), "Size: XL, Red");
    assert_eq!(catalog.title_for(&parent), "Linen Shirt - Size: XL, Red");
    // empty variation image falls back to the parent's
    assert_eq!(catalog.image_or_parent(&parent), parent.image_url);
}

#[test]
fn test_draft_variations_are_not_published() {
    let draft: WcVariation =
        serde_json::from_value(serde_json::json!({"id": 7, "status": "private"})).unwrap();
    assert!(!draft.is_published());

    let unknown: WcVariation = serde_json::from_value(serde_json::json!({"id": 8})).unwrap();
    assert!(unknown.is_published());
}

#[test]
fn test_low_stock_selection() {
    let products: Vec<WcProduct> = vec![
        product(serde_json::json!({"id": 1, "name": "A", "manage_stock": true, "stock_quantity": 4})),
        product(serde_json::json!({"id": 2, "name": "B", "manage_stock": true, "stock_quantity": 9})),
        product(serde_json::json!({"id": 3, "name": "C", "manage_stock": false, "stock_quantity": 0})),
        product(serde_json::json!({"id": 4, "name": "D", "manage_stock": true, "stock_quantity": "1"})),
        product(serde_json::json!({"id": 5, "name": "E", "manage_stock": true})),
        product(serde_json::json!({"id": 6, "name": "F", "manage_stock": true, "stock_quantity": 5})),
    ];

    let low = select_low_stock(&products, 5, 2);
    let ids: Vec<i64> = low.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![4, 1]);
}

#[test]
fn test_low_stock_found_past_the_first_page() {
    // two scanned pages, the only low item sits on the second
    let products: Vec<WcProduct> = (1..=150)
        .map(|id| {
            let quantity = if id == 140 { 2 } else { 50 };
            product(serde_json::json!({
                "id": id,
                "name": format!("P{}", id),
                "manage_stock": true,
                "stock_quantity": quantity
            }))
        })
        .collect();

    let low = select_low_stock(&products, 5, 5);
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].id, 140);
}

#[test]
fn test_paging_stops_on_short_page_or_page_limit() {
    let full = MAX_PER_PAGE as usize;
    assert!(has_next_page(full, 1, MAX_VARIATION_PAGES));
    assert!(!has_next_page(full - 1, 1, MAX_VARIATION_PAGES));
    assert!(!has_next_page(0, 3, MAX_VARIATION_PAGES));
    assert!(!has_next_page(full, MAX_VARIATION_PAGES, MAX_VARIATION_PAGES));
    assert!(has_next_page(full, MAX_LOW_STOCK_SCAN_PAGES - 1, MAX_LOW_STOCK_SCAN_PAGES));
}

#[test]
fn test_creation_date_prefers_gmt() {
    let wc = product(serde_json::json!({
        "id": 1,
        "name": "A",
        "date_created": "2024-03-01T12:15:00",
        "date_created_gmt": "2024-03-01T10:15:00"
    }));
    assert_eq!(
        wc.created_at().unwrap().to_rfc3339(),
        "2024-03-01T10:15:00+00:00"
    );
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Encoded strings only contain unreserved characters and escapes
    #[test]
    fn prop_percent_encoding_output_alphabet(input in ".{0,40}") {
        let encoded = percent_encode(&input);
        prop_assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-._~%".contains(c)));
    }

    /// A store that answers every page with a full batch still ends the loop
    #[test]
    fn prop_paging_terminates(max_pages in 1u32..200) {
        let mut page = 1u32;
        let mut requests = 1u32;
        while has_next_page(MAX_PER_PAGE as usize, page, max_pages) {
            page += 1;
            requests += 1;
        }
        prop_assert_eq!(requests, max_pages);
    }

    /// Signatures are 32-byte HMACs in base64
    #[test]
    fn prop_signature_shape(value in "[a-zA-Z0-9 &=]{0,30}", secret in "[a-z0-9_]{1,20}") {
        let params = vec![("search".to_string(), value)];
        let signature = oauth_signature("GET", "http://shop.local/p", &params, &secret).unwrap();
        prop_assert_eq!(signature.len(), 44);
        prop_assert!(signature.ends_with('='));
    }
}
