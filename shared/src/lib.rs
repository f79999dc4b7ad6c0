//! Shared types and logic for the stockroom dashboard
//!
//! This crate holds everything that does not need a database or network:
//! product kinds and stock levels, the sync cursor arithmetic, interface
//! strings, and formatting helpers. It is used by the backend and by the
//! browser (via WASM).

pub mod format;
pub mod i18n;
pub mod models;
pub mod types;
pub mod validation;

pub use format::*;
pub use i18n::*;
pub use models::*;
pub use types::*;
pub use validation::*;
