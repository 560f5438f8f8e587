//! Integration tests for TechShop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p techshop-integration-tests
//! ```
//!
//! Every test builds its own [`TestContext`] over a fresh in-memory store,
//! so tests never share state. File-backed tests write under the system temp
//! directory with a random file name.
//!
//! # Test Categories
//!
//! - `cart_sync` - Cart mutations mirrored to the store
//! - `favorites_sync` - Favorite toggles mirrored to the store
//! - `checkout_flow` - Order placement end to end
//! - `admin_management` - Product, order and user management
//! - `file_store` - Persistence across process restarts

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use techshop_core::{BrandId, CategoryId, Product, ProductId, UserRecord, UserRole};
use techshop_storefront::AppState;
use techshop_storefront::config::StorefrontConfig;
use techshop_storefront::session::Session;
use techshop_storefront::store::{DocumentStore, MemoryStore, SetOptions, encode, paths};

/// Password used for every account created by the helpers.
pub const TEST_PASSWORD: &str = "secret123";

/// A wired application over an in-memory store.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Context with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StorefrontConfig::default())
    }

    /// Context with a custom configuration. `data_path` is ignored.
    #[must_use]
    pub fn with_config(config: StorefrontConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone());
        Self { store, state }
    }

    /// Write an active product straight to the store.
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the write.
    pub async fn seed_product(&self, id: &str, price: i64, stock: u32) -> Product {
        let product = product(id, price, stock);
        self.store
            .set(
                &paths::product(&product.id).expect("valid product path"),
                encode(&product).expect("encodable product"),
                SetOptions::REPLACE,
            )
            .await
            .expect("product written");
        self.state.catalog().invalidate().await;
        product
    }

    /// Register a customer, sign them in and load their session.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn customer(&self, email: &str) -> (UserRecord, Session) {
        let user = self
            .state
            .auth()
            .sign_up("Покупатель", email, TEST_PASSWORD)
            .await
            .expect("customer registered");
        let mut session = self.state.session();
        session.on_auth_change(Some(user.id.clone())).await;
        (user, session)
    }

    /// Register a staff account without signing it in.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn staff(&self, email: &str, role: UserRole) -> UserRecord {
        self.state
            .auth()
            .create_account("Сотрудник", email, TEST_PASSWORD, role)
            .await
            .expect("staff registered")
    }

    /// Current stock of a product as stored.
    ///
    /// # Panics
    ///
    /// Panics if the product is missing.
    pub async fn stored_stock(&self, id: &str) -> u32 {
        self.store
            .get(&paths::product(&ProductId::new(id)).expect("valid product path"))
            .await
            .expect("store online")
            .expect("product exists")
            .decode::<Product>()
            .expect("decodable product")
            .stock_quantity
    }
}

/// An active product in the `smartphones` category.
#[must_use]
pub fn product(id: &str, price: i64, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Товар {id}"),
        description: String::new(),
        price: Decimal::from(price),
        original_price: None,
        discount: None,
        category_id: CategoryId::new("smartphones"),
        brand_id: BrandId::new("apple"),
        image_url: format!("https://images.techshop.example/{id}.jpg"),
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

/// A unique, not yet existing data file path.
#[must_use]
pub fn temp_data_path() -> PathBuf {
    std::env::temp_dir().join(format!("techshop-test-{}.json", uuid::Uuid::new_v4()))
}
