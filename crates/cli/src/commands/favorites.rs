//! Favorites commands.

use tracing::info;

use techshop_storefront::session::Session;
use techshop_storefront::{AppState, StorefrontError};

use super::product_id;

/// Print the favorite products that still exist in the catalog.
///
/// # Errors
///
/// Returns the store error if the catalog cannot be read.
pub async fn list(state: &AppState, session: &Session) -> Result<(), StorefrontError> {
    let ids = session.favorites().favorites();
    if ids.is_empty() {
        info!("No favorites");
        return Ok(());
    }
    for product in state.catalog().favorites_of(&ids).await? {
        info!("  {} | {} | {}", product.id, product.name, product.unit_price().display());
    }
    Ok(())
}

/// Flip a product in or out of the favorites.
///
/// # Errors
///
/// Returns `StorefrontError::BadRequest` for a malformed id.
pub async fn toggle(session: &mut Session, product: &str) -> Result<(), StorefrontError> {
    let id = product_id(product)?;
    if session.favorites_mut().toggle_favorite(&id).await {
        info!("Added {id} to favorites");
    } else {
        info!("Removed {id} from favorites");
    }
    Ok(())
}
