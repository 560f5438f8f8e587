//! Cart commands.

use tracing::info;

use techshop_core::Price;
use techshop_storefront::session::Session;
use techshop_storefront::{AppState, StorefrontError};

use super::product_id;

/// Print the cart lines, total and delivery quote.
pub fn list(session: &Session) {
    let cart = session.cart();
    if cart.is_empty() {
        info!("Cart is empty");
        return;
    }
    for line in cart.lines() {
        info!(
            "  {} x{} @ {} = {}",
            line.display_name,
            line.quantity,
            line.price().display(),
            Price::rub(line.line_total()).display()
        );
    }
    info!("Items: {}", cart.item_count());
    info!("Total: {}", Price::rub(cart.total()).display());
    info!("Delivery: {}", Price::rub(cart.delivery_fee()).display());
}

/// Add `quantity` units of a catalog product.
///
/// # Errors
///
/// Returns `StorefrontError::NotFound` if the product does not exist.
pub async fn add(
    state: &AppState,
    session: &mut Session,
    product: &str,
    quantity: u32,
) -> Result<(), StorefrontError> {
    let id = product_id(product)?;
    let product = state
        .catalog()
        .product(&id)
        .await?
        .ok_or_else(|| StorefrontError::NotFound(format!("product {id}")))?;

    let before = session.cart().line(&id).map_or(0, |line| line.quantity);
    session.cart_mut().add_item(&product, quantity).await;
    let after = session.cart().line(&id).map_or(0, |line| line.quantity);

    if after == before {
        info!(
            stock = product.stock_quantity,
            "Not added: only {} in stock",
            product.stock_quantity
        );
    } else {
        info!("{} in cart: {after}", product.name);
    }
    Ok(())
}

/// Remove a product's line.
///
/// # Errors
///
/// Returns `StorefrontError::BadRequest` for a malformed id.
pub async fn remove(session: &mut Session, product: &str) -> Result<(), StorefrontError> {
    let id = product_id(product)?;
    session.cart_mut().remove_item(&id).await;
    info!("Removed {id}");
    Ok(())
}

/// Set a line's quantity. Quantities above the product's stock are refused.
///
/// # Errors
///
/// Returns `StorefrontError::BadRequest` for a malformed id, or
/// `StorefrontError::NotFound` if a positive quantity names an unknown
/// product.
pub async fn set(
    state: &AppState,
    session: &mut Session,
    product: &str,
    quantity: i64,
) -> Result<(), StorefrontError> {
    let id = product_id(product)?;
    if quantity <= 0 {
        session.cart_mut().update_quantity(&id, quantity).await;
        info!("Removed {id}");
        return Ok(());
    }

    let product = state
        .catalog()
        .product(&id)
        .await?
        .ok_or_else(|| StorefrontError::NotFound(format!("product {id}")))?;
    if quantity > i64::from(product.stock_quantity) {
        info!(
            stock = product.stock_quantity,
            "Not changed: only {} in stock",
            product.stock_quantity
        );
        return Ok(());
    }

    session.cart_mut().set_quantity(&product, quantity).await;
    match session.cart().line(&id) {
        Some(line) => info!("{} in cart: {}", line.display_name, line.quantity),
        None => info!("{id} not in cart"),
    }
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns the store error if the batch delete fails.
pub async fn clear(session: &mut Session) -> Result<(), StorefrontError> {
    session.cart_mut().clear_cart().await?;
    info!("Cart cleared");
    Ok(())
}
