//! Route definitions for the stockroom API

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Interface strings (public, needed on the login page)
        .route("/i18n/:lang", get(handlers::get_catalog))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/dashboard", dashboard_routes(state.clone()))
        .nest("/products", product_routes(state.clone()))
        .nest("/variations", variation_routes(state.clone()))
        .nest("/sync", sync_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
        .route("/password", post(handlers::change_password))
        .route("/language", put(handlers::set_language))
        .route("/security-log", get(handlers::security_log))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/login", post(handlers::login))
        .merge(protected)
}

/// Dashboard routes (protected)
fn dashboard_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_dashboard))
        .route("/widgets/:widget", get(handlers::get_widget))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Physical inventory routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products))
        .route("/export", get(handlers::export_products))
        .route("/sku/:sku", get(handlers::get_product_by_sku))
        .route(
            "/:id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:id/variations", get(handlers::list_variations))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Variation routes (protected)
fn variation_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:id", delete(handlers::delete_variation))
        .route("/:id/stock", post(handlers::update_variation_stock))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Catalog sync routes (protected)
fn sync_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::sync_step).delete(handlers::reset_sync))
        .route("/variations", post(handlers::sync_variations_step))
        .route("/progress", get(handlers::sync_progress))
        .route("/logs", get(handlers::sync_logs))
        .route("/last", get(handlers::last_sync))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
