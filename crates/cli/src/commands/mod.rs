//! Command implementations.

pub mod cart;
pub mod catalog;
pub mod favorites;
pub mod orders;
pub mod seed;

use techshop_core::{ProductId, UserRecord};
use techshop_storefront::session::Session;
use techshop_storefront::{AppState, StorefrontError};

/// Sign-in flags shared by the per-user commands.
#[derive(Debug, Default)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Sign in and load the user's cart and favorites.
///
/// # Errors
///
/// Returns `StorefrontError::Unauthorized` if either flag is missing, or the
/// auth error if sign-in fails.
pub async fn sign_in(
    state: &AppState,
    credentials: &Credentials,
) -> Result<(UserRecord, Session), StorefrontError> {
    let (Some(email), Some(password)) = (&credentials.email, &credentials.password) else {
        return Err(StorefrontError::Unauthorized(
            "--email and --password are required".to_owned(),
        ));
    };

    let user = state.auth().sign_in(email, password).await?;
    let mut session = state.session();
    session.on_auth_change(state.auth().current_user()).await;
    tracing::debug!(user_id = %user.id, "Session ready");
    Ok((user, session))
}

/// Parse a product id argument.
fn product_id(raw: &str) -> Result<ProductId, StorefrontError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.contains('/') {
        return Err(StorefrontError::BadRequest(format!(
            "invalid product id: {raw:?}"
        )));
    }
    Ok(ProductId::new(raw))
}
