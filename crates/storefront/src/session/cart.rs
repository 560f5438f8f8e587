//! Cart state manager.
//!
//! Lines are kept in memory in insertion order and mirrored to
//! `users/{uid}/cart/{productId}`, one document per product.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use techshop_core::{Price, Product, ProductId, UserId};

use super::{SyncPolicy, SyncState};
use crate::config::DeliveryRates;
use crate::store::{DocumentStore, Fields, SetOptions, StoreError, WriteBatch, encode, paths};

/// One product in the cart.
///
/// Price, name and image are captured when the line is created and are not
/// refreshed from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub display_name: String,
    pub image_ref: String,
}

impl CartLine {
    fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            quantity,
            unit_price: product.price,
            display_name: product.name.clone(),
            image_ref: product.image_url.clone(),
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    #[must_use]
    pub const fn price(&self) -> Price {
        Price::rub(self.unit_price)
    }
}

/// Persisted shape of a cart line.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartLineRecord {
    id: ProductId,
    product_id: ProductId,
    quantity: u32,
    price: Decimal,
    #[serde(default)]
    name: String,
    #[serde(default)]
    image: String,
}

impl From<&CartLine> for CartLineRecord {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.product_id.clone(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            price: line.unit_price,
            name: line.display_name.clone(),
            image: line.image_ref.clone(),
        }
    }
}

impl From<CartLineRecord> for CartLine {
    fn from(record: CartLineRecord) -> Self {
        Self {
            product_id: record.product_id,
            quantity: record.quantity,
            unit_price: record.price,
            display_name: record.name,
            image_ref: record.image,
        }
    }
}

fn quantity_fields(quantity: u32) -> Fields {
    let mut fields = Fields::new();
    fields.insert("quantity".to_owned(), Value::from(quantity));
    fields
}

/// Holds the signed-in user's cart and keeps the remote copy in sync.
#[derive(Debug)]
pub struct CartManager {
    store: Arc<dyn DocumentStore>,
    policy: SyncPolicy,
    rates: DeliveryRates,
    user: Option<UserId>,
    state: SyncState,
    lines: Vec<CartLine>,
}

impl CartManager {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, policy: SyncPolicy) -> Self {
        Self {
            store,
            policy,
            rates: DeliveryRates::default(),
            user: None,
            state: SyncState::Uninitialized,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_delivery_rates(mut self, rates: DeliveryRates) -> Self {
        self.rates = rates;
        self
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Replace local state with the user's remote cart.
    ///
    /// Without a user the cart is emptied. A failed fetch is logged and
    /// leaves the cart empty but usable.
    #[instrument(skip(self), fields(user_id = user.map_or("-", UserId::as_str)))]
    pub async fn load(&mut self, user: Option<&UserId>) {
        let Some(user) = user else {
            self.user = None;
            self.lines.clear();
            self.state = SyncState::Uninitialized;
            return;
        };

        self.user = Some(user.clone());
        self.state = SyncState::Loading;
        self.lines = match self.fetch(user).await {
            Ok(lines) => lines,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to fetch cart");
                Vec::new()
            }
        };
        self.state = SyncState::Ready;
        tracing::debug!(lines = self.lines.len(), "Cart loaded");
    }

    async fn fetch(&self, user: &UserId) -> Result<Vec<CartLine>, StoreError> {
        let documents = self.store.list(&paths::cart(user)?).await?;
        Ok(documents
            .into_iter()
            .filter_map(|doc| match doc.decode::<CartLineRecord>() {
                Ok(record) => Some(CartLine::from(record)),
                Err(error) => {
                    tracing::warn!(line = %doc.id, error = %error, "Skipping malformed cart line");
                    None
                }
            })
            .collect())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product`.
    pub async fn add_one(&mut self, product: &Product) {
        self.add_item(product, 1).await;
    }

    /// Add `quantity` units of `product`.
    ///
    /// If the resulting quantity would exceed `product.stock_quantity` the
    /// call does nothing and reports nothing.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(&mut self, product: &Product, quantity: u32) {
        let Some(user) = self.active_user() else {
            return;
        };
        if quantity == 0 {
            return;
        }
        let path = match paths::cart_line(&user, &product.id) {
            Ok(path) => path,
            Err(error) => {
                tracing::warn!(error = %error, "Cannot address cart line");
                return;
            }
        };

        let snapshot = self.snapshot();
        let (data, options) =
            if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
                let new_quantity = line.quantity.saturating_add(quantity);
                if new_quantity > product.stock_quantity {
                    tracing::debug!(
                        requested = new_quantity,
                        stock = product.stock_quantity,
                        "Quantity exceeds stock, ignoring"
                    );
                    return;
                }
                line.quantity = new_quantity;
                (quantity_fields(new_quantity), SetOptions::MERGE)
            } else {
                if quantity > product.stock_quantity {
                    tracing::debug!(
                        requested = quantity,
                        stock = product.stock_quantity,
                        "Quantity exceeds stock, ignoring"
                    );
                    return;
                }
                let line = CartLine::from_product(product, quantity);
                let data = match encode(&CartLineRecord::from(&line)) {
                    Ok(data) => data,
                    Err(error) => {
                        tracing::warn!(error = %error, "Cannot encode cart line");
                        return;
                    }
                };
                self.lines.push(line);
                (data, SetOptions::REPLACE)
            };

        let outcome = self.store.set(&path, data, options).await;
        self.settle(outcome, snapshot, "add_item");
    }

    /// Remove a product from the cart. Removing an absent product only
    /// re-issues the remote delete.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&mut self, product_id: &ProductId) {
        let Some(user) = self.active_user() else {
            return;
        };
        let path = match paths::cart_line(&user, product_id) {
            Ok(path) => path,
            Err(error) => {
                tracing::warn!(error = %error, "Cannot address cart line");
                return;
            }
        };

        let snapshot = self.snapshot();
        self.lines.retain(|line| &line.product_id != product_id);
        let outcome = self.store.delete(&path).await;
        self.settle(outcome, snapshot, "remove_item");
    }

    /// Set the quantity of a line. Zero or less removes it; unknown products
    /// are ignored. Not capped by stock.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(product_id).await;
            return;
        }
        let Some(user) = self.active_user() else {
            return;
        };
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let path = match paths::cart_line(&user, product_id) {
            Ok(path) => path,
            Err(error) => {
                tracing::warn!(error = %error, "Cannot address cart line");
                return;
            }
        };

        let snapshot = self.snapshot();
        let Some(line) = self.lines.iter_mut().find(|l| &l.product_id == product_id) else {
            tracing::debug!("Product not in cart, ignoring");
            return;
        };
        line.quantity = quantity;

        let outcome = self
            .store
            .set(&path, quantity_fields(quantity), SetOptions::MERGE)
            .await;
        self.settle(outcome, snapshot, "update_quantity");
    }

    /// Set the quantity of `product`'s line, refusing quantities above its
    /// stock.
    ///
    /// Same as [`CartManager::update_quantity`] otherwise. An over-stock
    /// request changes nothing and reports nothing, like an over-stock add.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn set_quantity(&mut self, product: &Product, quantity: i64) {
        if quantity > i64::from(product.stock_quantity) {
            tracing::debug!(
                requested = quantity,
                stock = product.stock_quantity,
                "Quantity exceeds stock, ignoring"
            );
            return;
        }
        self.update_quantity(&product.id, quantity).await;
    }

    /// Delete every remote line in one batch, then empty the cart.
    ///
    /// Local state is only emptied after the batch commits.
    ///
    /// # Errors
    ///
    /// Returns the store error if listing or committing fails; the local
    /// cart is left untouched in that case.
    #[instrument(skip(self))]
    pub async fn clear_cart(&mut self) -> Result<(), StoreError> {
        let Some(user) = self.active_user() else {
            return Ok(());
        };

        let remote = self.store.list(&paths::cart(&user)?).await?;
        if !remote.is_empty() {
            let collection = paths::cart(&user)?;
            let mut batch = WriteBatch::new();
            for doc in &remote {
                batch.delete(collection.doc(&doc.id)?);
            }
            self.store.commit(batch).await.inspect_err(|error| {
                tracing::warn!(error = %error, "Failed to clear cart");
            })?;
        }

        self.lines.clear();
        tracing::debug!(deleted = remote.len(), "Cart cleared");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of `unit_price × quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0, |count, line| count.saturating_add(line.quantity))
    }

    /// Delivery quote for the current total.
    #[must_use]
    pub fn delivery_fee(&self) -> Decimal {
        self.rates.cart_fee(self.total())
    }

    #[must_use]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, SyncState::Loading)
    }

    #[must_use]
    pub const fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// The user to write for, if mutations are currently accepted.
    fn active_user(&self) -> Option<UserId> {
        match (&self.user, self.state) {
            (Some(user), SyncState::Ready) => Some(user.clone()),
            _ => None,
        }
    }

    fn snapshot(&self) -> Option<Vec<CartLine>> {
        (self.policy == SyncPolicy::RevertOnFailure).then(|| self.lines.clone())
    }

    fn settle(
        &mut self,
        outcome: Result<(), StoreError>,
        snapshot: Option<Vec<CartLine>>,
        operation: &'static str,
    ) {
        let Err(error) = outcome else {
            return;
        };
        tracing::warn!(error = %error, operation, "Cart write failed");
        if let Some(previous) = snapshot {
            self.lines = previous;
            tracing::debug!(operation, "Reverted local cart");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use techshop_core::{BrandId, CategoryId};

    use super::*;
    use crate::store::MemoryStore;

    fn product(id: &str, price: i64, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Товар {id}"),
            description: String::new(),
            price: Decimal::from(price),
            original_price: None,
            discount: None,
            category_id: CategoryId::new("smartphones"),
            brand_id: BrandId::new("apple"),
            image_url: format!("https://img.example/{id}.jpg"),
            images: Vec::new(),
            attributes: Vec::new(),
            stock_quantity: stock,
            is_active: true,
            is_archived: false,
            rating: 0.0,
            reviews_count: 0,
            created_at: Utc::now(),
        }
    }

    async fn ready_cart(store: &Arc<MemoryStore>, policy: SyncPolicy) -> CartManager {
        let mut cart = CartManager::new(Arc::clone(store) as Arc<dyn DocumentStore>, policy);
        cart.load(Some(&UserId::new("u1"))).await;
        cart
    }

    #[tokio::test]
    async fn test_add_respects_stock_then_zero_removes() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = ready_cart(&store, SyncPolicy::Optimistic).await;
        let p1 = product("p1", 1000, 3);

        cart.add_one(&p1).await;
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 1);
        assert_eq!(cart.total(), Decimal::from(1000));

        cart.add_item(&p1, 5).await;
        assert_eq!(cart.lines()[0].quantity, 1);

        cart.update_quantity(&p1.id, 0).await;
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
        assert_eq!(store.document_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_one_stops_at_stock() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = ready_cart(&store, SyncPolicy::Optimistic).await;
        let p1 = product("p1", 1000, 3);
        let path = paths::cart_line(&UserId::new("u1"), &p1.id).unwrap();

        for expected in 1..=3 {
            cart.add_one(&p1).await;
            assert_eq!(cart.line(&p1.id).unwrap().quantity, expected);
            let doc = store.get(&path).await.unwrap().unwrap();
            assert_eq!(doc.field("quantity"), Some(&Value::from(expected)));
        }

        cart.add_one(&p1).await;
        assert_eq!(cart.line(&p1.id).unwrap().quantity, 3);
        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.field("quantity"), Some(&Value::from(3)));
        assert_eq!(cart.total(), Decimal::from(3000));
    }

    #[tokio::test]
    async fn test_set_quantity_respects_stock() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = ready_cart(&store, SyncPolicy::Optimistic).await;
        let p1 = product("p1", 1000, 3);
        let path = paths::cart_line(&UserId::new("u1"), &p1.id).unwrap();
        cart.add_one(&p1).await;

        cart.set_quantity(&p1, 999).await;
        assert_eq!(cart.line(&p1.id).unwrap().quantity, 1);
        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.field("quantity"), Some(&Value::from(1)));

        cart.set_quantity(&p1, 3).await;
        assert_eq!(cart.line(&p1.id).unwrap().quantity, 3);
        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.field("quantity"), Some(&Value::from(3)));

        cart.set_quantity(&p1, 0).await;
        assert!(cart.is_empty());
        assert_eq!(store.document_count().await, 0);
    }

    #[tokio::test]
    async fn test_existing_line_writes_quantity_only() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = ready_cart(&store, SyncPolicy::Optimistic).await;
        let p1 = product("p1", 1000, 10);
        cart.add_item(&p1, 2).await;

        // A later catalog price change must not reach the stored line.
        let mut repriced = p1.clone();
        repriced.price = Decimal::from(1500);
        cart.add_item(&repriced, 3).await;

        let path = paths::cart_line(&UserId::new("u1"), &p1.id).unwrap();
        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.field("quantity"), Some(&Value::from(5)));
        assert_eq!(doc.field("price"), Some(&Value::from("1000")));
        assert_eq!(cart.lines()[0].unit_price, Decimal::from(1000));
        assert_eq!(cart.total(), Decimal::from(5000));
    }

    #[tokio::test]
    async fn test_new_line_over_stock_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = ready_cart(&store, SyncPolicy::Optimistic).await;
        cart.add_item(&product("p1", 1000, 2), 3).await;
        assert!(cart.is_empty());
        assert_eq!(store.document_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = ready_cart(&store, SyncPolicy::Optimistic).await;
        cart.add_one(&product("p1", 1000, 3)).await;
        cart.add_one(&product("p2", 250, 3)).await;

        cart.remove_item(&ProductId::new("p1")).await;
        let once = cart.lines().to_vec();
        cart.remove_item(&ProductId::new("p1")).await;
        assert_eq!(cart.lines(), once.as_slice());
        assert_eq!(cart.total(), Decimal::from(250));
    }

    #[tokio::test]
    async fn test_update_quantity_unknown_product_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = ready_cart(&store, SyncPolicy::Optimistic).await;
        cart.update_quantity(&ProductId::new("ghost"), 4).await;
        assert!(cart.is_empty());
        assert_eq!(store.document_count().await, 0);
    }

    #[tokio::test]
    async fn test_reload_replaces_local_state() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = ready_cart(&store, SyncPolicy::Optimistic).await;
        cart.add_item(&product("p1", 1000, 5), 2).await;
        cart.add_item(&product("p2", 300, 5), 1).await;

        let mut fresh = ready_cart(&store, SyncPolicy::Optimistic).await;
        assert_eq!(fresh.lines(), cart.lines());
        assert_eq!(fresh.item_count(), 3);

        fresh.clear_cart().await.unwrap();
        assert!(fresh.is_empty());
        let reloaded = ready_cart(&store, SyncPolicy::Optimistic).await;
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_ignored_without_user() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = CartManager::new(store.clone(), SyncPolicy::Optimistic);
        cart.add_one(&product("p1", 1000, 3)).await;
        assert!(cart.is_empty());
        assert!(cart.clear_cart().await.is_ok());

        cart.load(None).await;
        assert_eq!(cart.state(), SyncState::Uninitialized);
        assert_eq!(store.document_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_write_kept_when_optimistic() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = ready_cart(&store, SyncPolicy::Optimistic).await;
        store.set_offline(true);

        cart.add_one(&product("p1", 1000, 3)).await;
        assert_eq!(cart.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_reverted_when_requested() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = ready_cart(&store, SyncPolicy::RevertOnFailure).await;
        let p1 = product("p1", 1000, 3);
        cart.add_one(&p1).await;
        store.set_offline(true);

        cart.add_one(&p1).await;
        cart.add_one(&product("p2", 10, 3)).await;
        cart.remove_item(&p1.id).await;
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 1);

        assert!(cart.clear_cart().await.is_err());
        assert_eq!(cart.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_empty_ready_cart() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let cart = ready_cart(&store, SyncPolicy::Optimistic).await;
        assert_eq!(cart.state(), SyncState::Ready);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_fee() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = ready_cart(&store, SyncPolicy::Optimistic).await;
        cart.add_one(&product("p1", 1000, 3)).await;
        assert_eq!(cart.delivery_fee(), Decimal::from(500));

        cart.add_one(&product("p2", 89_990, 3)).await;
        assert_eq!(cart.delivery_fee(), Decimal::ZERO);
    }
}
