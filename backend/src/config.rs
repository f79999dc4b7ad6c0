//! Configuration management for the stockroom dashboard
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with STOCKROOM__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Log output format: "pretty" or "json"
    pub log_format: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT session configuration
    pub jwt: JwtConfig,

    /// WooCommerce REST API configuration
    pub woocommerce: WooCommerceConfig,

    /// Physical inventory defaults
    pub inventory: InventoryConfig,

    /// Catalog sync tuning
    pub sync: SyncConfig,

    /// Login throttling and bootstrap account
    pub security: SecurityConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing session tokens
    pub secret: String,

    /// Session lifetime in seconds
    pub session_lifetime: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WooCommerceConfig {
    /// Store base URL, e.g. https://shop.example.com
    pub store_url: String,

    /// REST API consumer key
    pub consumer_key: String,

    /// REST API consumer secret
    pub consumer_secret: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Threshold given to newly imported products
    pub default_low_stock_threshold: i32,

    /// Threshold used by the "low stock online" dashboard widget
    pub online_low_stock_threshold: i64,

    /// Days looked back by the "recently added online" widget
    pub recently_added_days: i64,

    /// Rows shown per dashboard widget
    pub dashboard_widget_limit: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Products fetched per step in the products phase
    pub per_page: u32,

    /// Variable parents fetched per page in the variations phase
    pub variable_per_page: u32,

    /// Variable parents processed per step
    pub parents_per_step: u32,

    /// Catalog size assumed until the end of the catalog is seen
    pub estimated_total: u32,

    /// Minutes after which an untouched cursor is abandoned
    pub timeout_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    /// Failed logins tolerated within the lockout window
    pub max_failed_attempts: i64,

    /// Lockout window in minutes
    pub lockout_minutes: i64,

    /// Password given to the bootstrap `admin` account
    pub bootstrap_admin_password: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("STOCKROOM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("log_format", "pretty")?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.session_lifetime", 86400)?
            .set_default("woocommerce.timeout_secs", 30)?
            .set_default(
                "inventory.default_low_stock_threshold",
                i64::from(shared::DEFAULT_LOW_STOCK_THRESHOLD),
            )?
            .set_default("inventory.online_low_stock_threshold", 5)?
            .set_default("inventory.recently_added_days", 7)?
            .set_default("inventory.dashboard_widget_limit", 5)?
            .set_default("sync.per_page", i64::from(shared::DEFAULT_PER_PAGE))?
            .set_default(
                "sync.variable_per_page",
                i64::from(shared::DEFAULT_VARIABLE_PER_PAGE),
            )?
            .set_default("sync.parents_per_step", 1)?
            .set_default(
                "sync.estimated_total",
                i64::from(shared::DEFAULT_ESTIMATED_TOTAL),
            )?
            .set_default("sync.timeout_minutes", shared::DEFAULT_TIMEOUT_MINUTES)?
            .set_default("security.max_failed_attempts", 5)?
            .set_default("security.lockout_minutes", 15)?
            .set_default("security.bootstrap_admin_password", "securepassword")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (STOCKROOM__ prefix)
            .add_source(
                Environment::with_prefix("STOCKROOM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
