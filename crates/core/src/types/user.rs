//! User records as stored under `users/{id}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AddressId, ProductId, UserId};
use super::status::UserRole;

/// Field holding the favorites array on a user document.
pub const FAVORITES_FIELD: &str = "favoriteProducts";

/// A storefront user profile.
///
/// The cart lives in a sub-collection of this document; favorites are an
/// array field on the document itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub addresses: Vec<DeliveryAddress>,
    #[serde(default)]
    pub favorite_products: Vec<ProductId>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Build a fresh profile with no addresses or favorites.
    #[must_use]
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        role: UserRole,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            phone: None,
            role,
            addresses: Vec::new(),
            favorite_products: Vec::new(),
            created_at,
        }
    }

    /// The address marked as default, or the first one.
    #[must_use]
    pub fn default_address(&self) -> Option<&DeliveryAddress> {
        self.addresses
            .iter()
            .find(|a| a.is_default)
            .or_else(|| self.addresses.first())
    }

    /// Look up an address by id.
    #[must_use]
    pub fn address(&self, id: &AddressId) -> Option<&DeliveryAddress> {
        self.addresses.iter().find(|a| &a.id == id)
    }
}

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub id: AddressId,
    /// Short label such as "Дом" or "Работа".
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
    #[serde(default)]
    pub is_default: bool,
}
