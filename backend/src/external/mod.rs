//! External API integrations

pub mod woocommerce;

pub use woocommerce::{OnlineProduct, WooCommerceClient};
