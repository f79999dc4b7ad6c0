//! Domain models for the stockroom dashboard

mod catalog;
mod product;
mod sync;
mod user;

pub use catalog::*;
pub use product::*;
pub use sync::*;
pub use user::*;
