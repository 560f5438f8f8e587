//! Typed document and collection paths.
//!
//! A collection path has an odd number of segments (`users`,
//! `users/u1/cart`), a document path an even number (`users/u1`,
//! `users/u1/cart/p1`). Segments are non-empty and contain no `/`.

use core::fmt;

use techshop_core::{OrderId, ProductId, UserId};

use super::StoreError;

/// Path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath(String);

/// Path of a collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(String);

fn segment_count(path: &str) -> Result<usize, StoreError> {
    let mut count = 0;
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(StoreError::InvalidPath(path.to_owned()));
        }
        count += 1;
    }
    Ok(count)
}

fn check_segment(segment: &str) -> Result<(), StoreError> {
    if segment.is_empty() || segment.contains('/') {
        return Err(StoreError::InvalidPath(segment.to_owned()));
    }
    Ok(())
}

impl DocumentPath {
    /// Parse a document path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if a segment is empty or the path
    /// has an odd number of segments.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        if segment_count(path)? % 2 != 0 {
            return Err(StoreError::InvalidPath(path.to_owned()));
        }
        Ok(Self(path.to_owned()))
    }

    /// The last segment.
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// The collection containing this document.
    #[must_use]
    pub fn parent(&self) -> CollectionPath {
        let parent = self.0.rsplit_once('/').map_or("", |(parent, _)| parent);
        CollectionPath(parent.to_owned())
    }

    /// A sub-collection of this document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if `name` is not a single segment.
    pub fn collection(&self, name: &str) -> Result<CollectionPath, StoreError> {
        check_segment(name)?;
        Ok(CollectionPath(format!("{}/{name}", self.0)))
    }

    /// The path as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl CollectionPath {
    /// Parse a collection path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if a segment is empty or the path
    /// has an even number of segments.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        if segment_count(path)? % 2 == 0 {
            return Err(StoreError::InvalidPath(path.to_owned()));
        }
        Ok(Self(path.to_owned()))
    }

    /// A document inside this collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if `id` is not a single segment.
    pub fn doc(&self, id: &str) -> Result<DocumentPath, StoreError> {
        check_segment(id)?;
        Ok(DocumentPath(format!("{}/{id}", self.0)))
    }

    /// The path as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Storefront layout
// =============================================================================

/// `users`
#[must_use]
pub fn users() -> CollectionPath {
    CollectionPath("users".to_owned())
}

/// `users/{uid}`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` if the id contains a `/` or is empty.
pub fn user(user_id: &UserId) -> Result<DocumentPath, StoreError> {
    users().doc(user_id.as_str())
}

/// `users/{uid}/cart`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` if the id contains a `/` or is empty.
pub fn cart(user_id: &UserId) -> Result<CollectionPath, StoreError> {
    user(user_id)?.collection("cart")
}

/// `users/{uid}/cart/{productId}`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` if either id contains a `/` or is empty.
pub fn cart_line(user_id: &UserId, product_id: &ProductId) -> Result<DocumentPath, StoreError> {
    cart(user_id)?.doc(product_id.as_str())
}

/// `products`
#[must_use]
pub fn products() -> CollectionPath {
    CollectionPath("products".to_owned())
}

/// `products/{id}`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` if the id contains a `/` or is empty.
pub fn product(product_id: &ProductId) -> Result<DocumentPath, StoreError> {
    products().doc(product_id.as_str())
}

/// `categories`
#[must_use]
pub fn categories() -> CollectionPath {
    CollectionPath("categories".to_owned())
}

/// `brands`
#[must_use]
pub fn brands() -> CollectionPath {
    CollectionPath("brands".to_owned())
}

/// `orders`
#[must_use]
pub fn orders() -> CollectionPath {
    CollectionPath("orders".to_owned())
}

/// `orders/{id}`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` if the id contains a `/` or is empty.
pub fn order(order_id: &OrderId) -> Result<DocumentPath, StoreError> {
    orders().doc(order_id.as_str())
}

/// `auth_accounts` - sign-in credentials keyed by normalized email.
#[must_use]
pub fn auth_accounts() -> CollectionPath {
    CollectionPath("auth_accounts".to_owned())
}
