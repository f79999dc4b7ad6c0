//! Business logic services for the stockroom dashboard

pub mod auth;
pub mod dashboard;
pub mod product;
pub mod security;
pub mod sync;

pub use auth::AuthService;
pub use dashboard::DashboardService;
pub use product::ProductService;
pub use security::SecurityService;
pub use sync::SyncService;
