//! WooCommerce REST API client
//!
//! Reads the online catalog (products, variable parents, variations) and the
//! figures shown on the dashboard widgets. Only the read endpoints the
//! dashboard needs are covered.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{header::HeaderMap, Client, Response};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use sha2::Sha256;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::config::WooCommerceConfig;
use crate::error::{AppError, AppResult};
use shared::{CatalogProduct, CatalogVariation, VariationAttribute, MAX_PER_PAGE};

const API_PATH: &str = "/wp-json/wc/v3";

/// Upper bound on variation pages fetched for one parent
pub const MAX_VARIATION_PAGES: u32 = 50;

/// Upper bound on catalog pages scanned for the online low stock widget
pub const MAX_LOW_STOCK_SCAN_PAGES: u32 = 20;

/// How requests are authenticated against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// HTTP basic auth with key/secret, only safe over HTTPS
    Basic,
    /// One-legged OAuth 1.0a with HMAC-SHA256 query signing, for plain HTTP
    OAuth,
}

impl AuthMode {
    pub fn for_url(store_url: &str) -> Self {
        if store_url.trim().to_ascii_lowercase().starts_with("https://") {
            AuthMode::Basic
        } else {
            AuthMode::OAuth
        }
    }
}

/// WooCommerce API client
#[derive(Clone)]
pub struct WooCommerceClient {
    client: Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    auth: AuthMode,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WcTerm {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WcImage {
    #[serde(default)]
    pub src: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WcAttribute {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub option: Option<String>,
}

/// A product as returned by `/products`
///
/// Every field is optional on the wire: broken or half-migrated products are
/// common and must not fail a whole page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WcProduct {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub product_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Decimal,
    #[serde(default)]
    pub categories: Vec<WcTerm>,
    #[serde(default)]
    pub images: Vec<WcImage>,
    #[serde(default)]
    pub manage_stock: serde_json::Value,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub stock_quantity: Option<i64>,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub total_sales: Option<i64>,
    #[serde(default)]
    pub date_created_gmt: Option<String>,
    #[serde(default)]
    pub date_created: Option<String>,
}

/// A variation as returned by `/products/{id}/variations`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WcVariation {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<WcImage>,
    #[serde(default)]
    pub attributes: Vec<WcAttribute>,
}

/// Product summary shown on the online dashboard widgets
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OnlineProduct {
    pub id: i64,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub stock_quantity: Option<i64>,
    pub total_sales: i64,
    pub image_url: String,
    pub date_created: Option<DateTime<Utc>>,
}

fn lenient_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or_default(),
        Some(serde_json::Value::Number(n)) => n.to_string().parse().unwrap_or_default(),
        _ => Decimal::ZERO,
    })
}

fn lenient_integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl WcProduct {
    pub fn is_variable(&self) -> bool {
        self.product_type.as_deref() == Some("variable")
    }

    /// Stock is only meaningful when the shop manages it for this product
    pub fn manages_stock(&self) -> bool {
        self.manage_stock.as_bool().unwrap_or(false)
    }

    pub fn primary_category(&self) -> String {
        self.categories
            .first()
            .and_then(|c| c.name.clone())
            .unwrap_or_default()
    }

    pub fn featured_image(&self) -> String {
        self.images
            .first()
            .and_then(|i| i.src.clone())
            .unwrap_or_default()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self
            .date_created_gmt
            .as_deref()
            .or(self.date_created.as_deref())?;
        parse_wc_datetime(raw)
    }

    /// Normalised catalog entry; `None` when the id or name is missing
    pub fn to_catalog(&self) -> Option<CatalogProduct> {
        let id = self.id.filter(|id| *id > 0)?;
        let name = non_empty(self.name.clone())?;
        Some(CatalogProduct {
            id,
            name,
            sku: self.sku.clone().unwrap_or_default(),
            price: self.price,
            category: self.primary_category(),
            image_url: self.featured_image(),
            is_variable: self.is_variable(),
        })
    }

    pub fn to_online(&self) -> Option<OnlineProduct> {
        let id = self.id?;
        Some(OnlineProduct {
            id,
            name: self.name.clone().unwrap_or_default(),
            sku: self.sku.clone().unwrap_or_default(),
            price: self.price,
            stock_quantity: self.stock_quantity,
            total_sales: self.total_sales.unwrap_or(0),
            image_url: self.featured_image(),
            date_created: self.created_at(),
        })
    }
}

impl WcVariation {
    pub fn is_published(&self) -> bool {
        matches!(self.status.as_deref(), None | Some("publish"))
    }

    pub fn to_catalog(&self) -> Option<CatalogVariation> {
        let id = self.id.filter(|id| *id > 0)?;
        Some(CatalogVariation {
            id,
            sku: self.sku.clone().unwrap_or_default(),
            price: self.price,
            image_url: self.image.as_ref().and_then(|i| non_empty(i.src.clone())),
            attributes: self
                .attributes
                .iter()
                .map(|a| VariationAttribute {
                    name: non_empty(a.name.clone()),
                    option: non_empty(a.option.clone()),
                })
                .collect(),
        })
    }
}

/// WooCommerce dates come without an offset (`2024-03-01T10:15:00`)
pub fn parse_wc_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

// ============================================================================
// OAuth 1.0a signing
// ============================================================================

/// RFC 3986 percent-encoding: everything but unreserved characters
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// HMAC-SHA256 signature over the OAuth signature base string
pub fn oauth_signature(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
) -> AppResult<String> {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&normalized)
    );

    type HmacSha256 = Hmac<Sha256>;
    let key = format!("{}&", consumer_secret);
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|_| AppError::Internal("Failed to create HMAC".to_string()))?;
    mac.update(base.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

impl WooCommerceClient {
    /// Create a client for the configured store
    pub fn new(config: &WooCommerceConfig) -> AppResult<Self> {
        if config.store_url.trim().is_empty() {
            return Err(AppError::Configuration(
                "woocommerce.store_url is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;

        let store_url = config.store_url.trim().trim_end_matches('/');

        Ok(Self {
            client,
            base_url: format!("{}{}", store_url, API_PATH),
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
            auth: AuthMode::for_url(store_url),
        })
    }

    /// Issue a signed GET against `endpoint` (relative to `/wp-json/wc/v3`)
    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> AppResult<Response> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        let request = match self.auth {
            AuthMode::Basic => self
                .client
                .get(&url)
                .basic_auth(&self.consumer_key, Some(&self.consumer_secret)),
            AuthMode::OAuth => {
                query.push(("oauth_consumer_key".into(), self.consumer_key.clone()));
                query.push((
                    "oauth_nonce".into(),
                    uuid::Uuid::new_v4().simple().to_string(),
                ));
                query.push(("oauth_signature_method".into(), "HMAC-SHA256".into()));
                query.push(("oauth_timestamp".into(), Utc::now().timestamp().to_string()));
                let signature = oauth_signature("GET", &url, &query, &self.consumer_secret)?;
                query.push(("oauth_signature".into(), signature));
                self.client.get(&url)
            }
        };

        tracing::debug!(endpoint, "WooCommerce request");

        let response = request
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::WooCommerce(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::WooCommerce(format!("{} - {}", status, body)));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> AppResult<(T, HeaderMap)> {
        let response = self.get(endpoint, params).await?;
        let headers = response.headers().clone();
        let data = response
            .json::<T>()
            .await
            .map_err(|e| AppError::WooCommerce(format!("failed to parse response: {}", e)))?;
        Ok((data, headers))
    }

    /// Cheap authenticated request proving the store answers
    pub async fn test_connection(&self) -> AppResult<()> {
        self.get("products", &[("per_page", "1".to_string())])
            .await
            .map(|_| ())
    }

    /// One page of published products of every type
    pub async fn get_products(&self, per_page: u32, page: u32) -> AppResult<Vec<WcProduct>> {
        let (products, _) = self
            .get_json::<Vec<WcProduct>>(
                "products",
                &[
                    ("per_page", per_page.min(MAX_PER_PAGE).to_string()),
                    ("page", page.to_string()),
                    ("status", "publish".to_string()),
                ],
            )
            .await?;
        Ok(products)
    }

    /// One page of published variable products
    pub async fn get_variable_products(
        &self,
        per_page: u32,
        page: u32,
    ) -> AppResult<Vec<CatalogProduct>> {
        let (products, _) = self
            .get_json::<Vec<WcProduct>>(
                "products",
                &[
                    ("per_page", per_page.min(MAX_PER_PAGE).to_string()),
                    ("page", page.to_string()),
                    ("type", "variable".to_string()),
                    ("status", "publish".to_string()),
                ],
            )
            .await?;
        Ok(products.iter().filter_map(WcProduct::to_catalog).collect())
    }

    /// Number of published variable products, read from `X-WP-Total`
    pub async fn get_variable_products_count(&self) -> AppResult<Option<u32>> {
        let (_, headers) = self
            .get_json::<Vec<serde_json::Value>>(
                "products",
                &[
                    ("per_page", "1".to_string()),
                    ("type", "variable".to_string()),
                    ("status", "publish".to_string()),
                ],
            )
            .await?;
        Ok(total_from_headers(&headers))
    }

    /// Every published variation of a variable product
    pub async fn get_published_product_variations(
        &self,
        parent_id: i64,
    ) -> AppResult<Vec<CatalogVariation>> {
        let endpoint = format!("products/{}/variations", parent_id);
        let mut variations = Vec::new();
        let mut page = 1u32;

        loop {
            let (batch, _) = self
                .get_json::<Vec<WcVariation>>(
                    &endpoint,
                    &[
                        ("per_page", MAX_PER_PAGE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            let fetched = batch.len();
            variations.extend(
                batch
                    .iter()
                    .filter(|v| v.is_published())
                    .filter_map(WcVariation::to_catalog),
            );

            if !has_next_page(fetched, page, MAX_VARIATION_PAGES) {
                if fetched >= MAX_PER_PAGE as usize {
                    tracing::warn!(parent_id, page, "Stopped paging variations at the page limit");
                }
                break;
            }
            page += 1;
        }

        Ok(variations)
    }

    /// Best sellers by all-time sales
    pub async fn get_top_selling_products(&self, limit: u32) -> AppResult<Vec<OnlineProduct>> {
        let (products, _) = self
            .get_json::<Vec<WcProduct>>(
                "products",
                &[
                    ("per_page", limit.clamp(1, MAX_PER_PAGE).to_string()),
                    ("orderby", "popularity".to_string()),
                    ("order", "desc".to_string()),
                    ("status", "publish".to_string()),
                ],
            )
            .await?;
        Ok(products.iter().filter_map(WcProduct::to_online).collect())
    }

    /// Managed-stock products at or under `threshold`, lowest first
    ///
    /// The store cannot filter on stock, so the catalog is scanned page by
    /// page up to `MAX_LOW_STOCK_SCAN_PAGES`.
    pub async fn get_low_stock_products(
        &self,
        threshold: i64,
        limit: usize,
    ) -> AppResult<Vec<OnlineProduct>> {
        let mut products = Vec::new();
        let mut page = 1u32;

        loop {
            let (batch, _) = self
                .get_json::<Vec<WcProduct>>(
                    "products",
                    &[
                        ("per_page", MAX_PER_PAGE.to_string()),
                        ("page", page.to_string()),
                        ("status", "publish".to_string()),
                    ],
                )
                .await?;

            let fetched = batch.len();
            products.extend(batch);

            if !has_next_page(fetched, page, MAX_LOW_STOCK_SCAN_PAGES) {
                break;
            }
            page += 1;
        }

        Ok(select_low_stock(&products, threshold, limit))
    }

    /// Products published within the last `days` days, newest first
    pub async fn get_recently_added_products(
        &self,
        days: i64,
        limit: u32,
    ) -> AppResult<Vec<OnlineProduct>> {
        let after = (Utc::now() - Duration::days(days))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        let (products, _) = self
            .get_json::<Vec<WcProduct>>(
                "products",
                &[
                    ("per_page", limit.clamp(1, MAX_PER_PAGE).to_string()),
                    ("after", after),
                    ("orderby", "date".to_string()),
                    ("order", "desc".to_string()),
                    ("status", "publish".to_string()),
                ],
            )
            .await?;
        Ok(products.iter().filter_map(WcProduct::to_online).collect())
    }
}

/// Whether a paged listing should fetch the page after `page`
///
/// A short page ends the listing; `max_pages` stops a store that ignores
/// the `page` parameter from keeping the loop alive.
pub fn has_next_page(fetched: usize, page: u32, max_pages: u32) -> bool {
    fetched >= MAX_PER_PAGE as usize && page < max_pages
}

fn total_from_headers(headers: &HeaderMap) -> Option<u32> {
    headers
        .get("x-wp-total")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Pick managed-stock products with `stock_quantity <= threshold`
pub fn select_low_stock(products: &[WcProduct], threshold: i64, limit: usize) -> Vec<OnlineProduct> {
    let mut low: Vec<OnlineProduct> = products
        .iter()
        .filter(|p| p.manages_stock())
        .filter(|p| p.stock_quantity.is_some_and(|q| q <= threshold))
        .filter_map(WcProduct::to_online)
        .collect();
    low.sort_by_key(|p| p.stock_quantity);
    low.truncate(limit);
    low
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn auth_mode_follows_scheme() {
        assert_eq!(AuthMode::for_url("https://shop.example.gr"), AuthMode::Basic);
        assert_eq!(AuthMode::for_url("HTTPS://shop.example.gr"), AuthMode::Basic);
        assert_eq!(AuthMode::for_url("http://shop.local"), AuthMode::OAuth);
    }

    #[test]
    fn reads_total_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(total_from_headers(&headers), None);
        headers.insert("X-WP-Total", HeaderValue::from_static("42"));
        assert_eq!(total_from_headers(&headers), Some(42));
    }

    #[test]
    fn parses_dates_without_offset() {
        let dt = parse_wc_datetime("2024-03-01T10:15:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T10:15:00+00:00");
        assert!(parse_wc_datetime("yesterday").is_none());
    }

    #[test]
    fn client_requires_store_url() {
        let config = WooCommerceConfig {
            store_url: "  ".into(),
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            timeout_secs: 5,
        };
        assert!(matches!(
            WooCommerceClient::new(&config),
            Err(AppError::Configuration(_))
        ));
    }
}
