//! HTTP handlers for the stockroom API

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod i18n;
pub mod products;
pub mod sync;
pub mod variations;

pub use auth::*;
pub use dashboard::*;
pub use health::*;
pub use i18n::*;
pub use products::*;
pub use sync::*;
pub use variations::*;
