//! Normalised view of the online catalog
//!
//! The e-commerce client maps its wire format into these types so the sync
//! procedure and its stored cursor never depend on the remote API's quirks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product as listed by the online shop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogProduct {
    /// Remote product id
    pub id: i64,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    /// Primary category name, empty when the product has none
    pub category: String,
    /// Featured image URL, empty when the product has none
    pub image_url: String,
    pub is_variable: bool,
}

/// One attribute/option pair of a variation (e.g. `Size: XL`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariationAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
}

/// A published variation of a variable product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogVariation {
    pub id: i64,
    pub sku: String,
    pub price: Decimal,
    /// Variation-specific image, if the shop has one
    pub image_url: Option<String>,
    pub attributes: Vec<VariationAttribute>,
}

impl CatalogVariation {
    /// Human readable attribute summary, e.g. `Size: XL, Colour: Red`
    pub fn attributes_text(&self) -> String {
        attributes_text(&self.attributes)
    }

    /// Title stored locally for the variation
    pub fn title_for(&self, parent: &CatalogProduct) -> String {
        variation_title(&parent.name, &self.attributes_text())
    }

    /// Variation image, falling back to the parent's featured image
    pub fn image_or_parent(&self, parent: &CatalogProduct) -> String {
        match &self.image_url {
            Some(src) if !src.is_empty() => src.clone(),
            _ => parent.image_url.clone(),
        }
    }
}

/// Join attributes as `name: option`, or the bare option when unnamed
pub fn attributes_text(attributes: &[VariationAttribute]) -> String {
    attributes
        .iter()
        .filter_map(|attr| match (&attr.name, &attr.option) {
            (Some(name), Some(option)) => Some(format!("{}: {}", name, option)),
            (None, Some(option)) => Some(option.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `Parent - attributes`, or just the parent name without attributes
pub fn variation_title(parent_name: &str, attributes_text: &str) -> String {
    if attributes_text.is_empty() {
        parent_name.to_string()
    } else {
        format!("{} - {}", parent_name, attributes_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: Option<&str>, option: Option<&str>) -> VariationAttribute {
        VariationAttribute {
            name: name.map(str::to_string),
            option: option.map(str::to_string),
        }
    }

    #[test]
    fn attribute_text_skips_entries_without_option() {
        let attrs = vec![
            attr(Some("Size"), Some("XL")),
            attr(None, Some("Red")),
            attr(Some("Material"), None),
        ];
        assert_eq!(attributes_text(&attrs), "Size: XL, Red");
    }

    #[test]
    fn title_without_attributes_is_parent_name() {
        assert_eq!(variation_title("Olive Oil", ""), "Olive Oil");
        assert_eq!(variation_title("Olive Oil", "Size: 1L"), "Olive Oil - Size: 1L");
    }
}
