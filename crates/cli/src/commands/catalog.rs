//! Catalog commands.

use rust_decimal::Decimal;
use tracing::info;

use techshop_core::{BrandId, CategoryId};
use techshop_storefront::catalog::{ProductFilters, SortBy};
use techshop_storefront::{AppState, StorefrontError};

/// Build search filters from command-line flags.
#[must_use]
pub fn filters(
    query: Option<String>,
    category: Option<String>,
    brand: Option<String>,
    min: Option<Decimal>,
    max: Option<Decimal>,
    sort: SortBy,
) -> ProductFilters {
    ProductFilters {
        search: query,
        category_id: category.map(CategoryId::new),
        brand_id: brand.map(BrandId::new),
        min_price: min,
        max_price: max,
        sort_by: sort,
    }
}

/// Print the products matching `filters`.
///
/// # Errors
///
/// Returns the store error if the catalog cannot be read.
pub async fn search(state: &AppState, filters: &ProductFilters) -> Result<(), StorefrontError> {
    let products = state.catalog().search(filters).await?;
    info!("Found {} product(s)", products.len());
    for product in &products {
        let stock = if product.is_low_stock() {
            format!("{} left", product.stock_quantity)
        } else if product.stock_quantity == 0 {
            "out of stock".to_owned()
        } else {
            "in stock".to_owned()
        };
        match product.discount {
            Some(discount) => info!(
                "  {} | {} | {} (-{discount}%) | {stock}",
                product.id,
                product.name,
                product.unit_price().display()
            ),
            None => info!(
                "  {} | {} | {} | {stock}",
                product.id,
                product.name,
                product.unit_price().display()
            ),
        }
    }
    Ok(())
}
