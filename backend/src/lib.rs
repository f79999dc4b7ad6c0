//! Stockroom backend
//!
//! Physical inventory dashboard for a WooCommerce shop: staff count stock in
//! the store while the catalog itself is synced from the online shop.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

use external::WooCommerceClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    /// One HTTP client for the whole process; clones share its pool
    pub store: WooCommerceClient,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> AppResult<Self> {
        let store = WooCommerceClient::new(&config.woocommerce)?;
        Ok(Self {
            db,
            config: Arc::new(config),
            store,
        })
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Stockroom API v1"
}
