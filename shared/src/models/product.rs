//! Physical inventory product models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Threshold applied to newly imported products
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

/// Stock at or below this is shown as critical on the dashboard
pub const CRITICAL_STOCK_LEVEL: i32 = 5;

/// Stock at or below this (and above critical) is shown as a warning
pub const WARNING_STOCK_LEVEL: i32 = 10;

/// Kind of row in the physical inventory
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// Stand-alone product with its own stock
    #[default]
    Simple,
    /// Parent of variations; carries no stock of its own
    Variable,
    /// SKU-bearing child of a variable product
    Variation,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Simple => "simple",
            ProductType::Variable => "variable",
            ProductType::Variation => "variation",
        }
    }

    /// Whether rows of this kind hold a stock count that staff may edit
    pub fn tracks_stock(&self) -> bool {
        !matches!(self, ProductType::Variable)
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown product type: {0}")]
pub struct UnknownProductType(pub String);

impl FromStr for ProductType {
    type Err = UnknownProductType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(ProductType::Simple),
            "variable" => Ok(ProductType::Variable),
            "variation" => Ok(ProductType::Variation),
            other => Err(UnknownProductType(other.to_string())),
        }
    }
}

/// Low stock flag as stored on each inventory row
pub fn is_low_stock(stock: i32, threshold: i32) -> bool {
    stock <= threshold
}

/// Colour band used when listing stock counts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Critical,
    Warning,
    Healthy,
}

impl StockLevel {
    pub fn from_stock(stock: i32) -> Self {
        if stock <= CRITICAL_STOCK_LEVEL {
            StockLevel::Critical
        } else if stock <= WARNING_STOCK_LEVEL {
            StockLevel::Warning
        } else {
            StockLevel::Healthy
        }
    }

    /// CSS class used by the dashboard tables
    pub fn css_class(&self) -> &'static str {
        match self {
            StockLevel::Critical => "text-danger",
            StockLevel::Warning => "text-warning",
            StockLevel::Healthy => "text-success",
        }
    }
}

/// Search filter accepted by the product listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductFilter {
    #[default]
    All,
    LowStock,
    /// Variable parents only
    Variable,
}
