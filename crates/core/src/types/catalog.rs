//! Catalog records: products, categories and brands.
//!
//! These are the document shapes stored in the `products`, `categories` and
//! `brands` collections. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::id::{AttributeId, BrandId, CategoryId, ProductId};
use super::price::Price;

/// Stock level below which a product is flagged as running out.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    /// Whole-number percentage off `original_price`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<u32>,
    pub category_id: CategoryId,
    pub brand_id: BrandId,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<ProductAttribute>,
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews_count: u32,
    pub created_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

impl Product {
    /// The product price in the store currency.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::rub(self.price)
    }

    /// Whether the product can currently be put into a cart.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.is_active && !self.is_archived && self.stock_quantity > 0
    }

    /// Whether the remaining stock is low enough to warn about.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock_quantity > 0 && self.stock_quantity < LOW_STOCK_THRESHOLD
    }

    /// Recompute `discount` from `original_price` and `price`.
    pub fn refresh_discount(&mut self) {
        self.discount = self
            .original_price
            .and_then(|original| discount_percent(original, self.price));
    }
}

/// Percentage discount of `price` relative to `original_price`, rounded.
///
/// Returns `None` when there is no positive original price or the product
/// is not actually cheaper.
#[must_use]
pub fn discount_percent(original_price: Decimal, price: Decimal) -> Option<u32> {
    if original_price <= Decimal::ZERO {
        return None;
    }
    let percent = ((original_price - price) / original_price * Decimal::ONE_HUNDRED).round();
    percent.to_u32().filter(|p| *p > 0)
}

/// A free-form product attribute such as "Память: 256 ГБ".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttribute {
    pub id: AttributeId,
    pub name: String,
    pub value: String,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}
