//! Seed the data file with catalog fixtures and demo accounts.
//!
//! Reads categories, brands, products and customers from a YAML file (the
//! bundled `fixtures/catalog.yaml` by default). Catalog records are written
//! in one batch; accounts go through the auth service so passwords are
//! hashed. The administrator from `TECHSHOP_ADMIN_EMAIL` /
//! `TECHSHOP_ADMIN_PASSWORD` is created as well when configured.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{info, warn};

use techshop_core::{
    AttributeId, Brand, BrandId, Category, CategoryId, Product, ProductAttribute, ProductId,
    UserId, UserRole,
};
use techshop_storefront::profile::AddressInput;
use techshop_storefront::services::auth::AuthError;
use techshop_storefront::store::{DocumentStore, SetOptions, StoreError, WriteBatch, encode, paths};
use techshop_storefront::{AppState, StorefrontError};

const BUNDLED_FIXTURE: &str = include_str!("../../fixtures/catalog.yaml");

// =============================================================================
// Fixture format
// =============================================================================

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    brands: Vec<Brand>,
    #[serde(default)]
    products: Vec<FixtureProduct>,
    #[serde(default)]
    customers: Vec<FixtureCustomer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureProduct {
    id: ProductId,
    name: String,
    #[serde(default)]
    description: String,
    price: Decimal,
    #[serde(default)]
    original_price: Option<Decimal>,
    category_id: CategoryId,
    brand_id: BrandId,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    attributes: Vec<FixtureAttribute>,
    #[serde(default)]
    stock_quantity: u32,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    reviews_count: u32,
}

#[derive(Debug, Deserialize)]
struct FixtureAttribute {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureCustomer {
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    role: UserRole,
    #[serde(default)]
    addresses: Vec<FixtureAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureAddress {
    name: String,
    address: String,
    city: String,
    postal_code: String,
    phone: String,
    #[serde(default)]
    is_default: bool,
}

const fn default_true() -> bool {
    true
}

impl FixtureProduct {
    fn into_product(self) -> Product {
        let mut product = Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            original_price: self.original_price,
            discount: None,
            category_id: self.category_id,
            brand_id: self.brand_id,
            image_url: self.image_url,
            images: self.images,
            attributes: self
                .attributes
                .into_iter()
                .map(|attr| ProductAttribute {
                    id: AttributeId::generate(),
                    name: attr.name,
                    value: attr.value,
                })
                .collect(),
            stock_quantity: self.stock_quantity,
            is_active: self.is_active,
            is_archived: false,
            rating: self.rating,
            reviews_count: self.reviews_count,
            created_at: Utc::now(),
        };
        product.refresh_discount();
        product
    }
}

impl From<FixtureAddress> for AddressInput {
    fn from(address: FixtureAddress) -> Self {
        Self {
            name: address.name,
            address: address.address,
            city: address.city,
            postal_code: address.postal_code,
            phone: address.phone,
            is_default: address.is_default,
        }
    }
}

fn parse_fixture(content: &str) -> Result<Fixture, StorefrontError> {
    serde_yaml::from_str(content)
        .map_err(|e| StorefrontError::BadRequest(format!("invalid fixture: {e}")))
}

// =============================================================================
// Command
// =============================================================================

/// Seed the store from `fixture`, or from the bundled catalog.
///
/// # Errors
///
/// Returns an error if the fixture cannot be read or parsed, or if a store
/// write fails. Accounts that already exist are skipped.
pub async fn run(
    state: &AppState,
    fixture: Option<&Path>,
    reset: bool,
) -> Result<(), StorefrontError> {
    let fixture = match fixture {
        Some(path) => {
            info!(path = %path.display(), "Loading fixture");
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| StorefrontError::NotFound(format!("{}: {e}", path.display())))?;
            parse_fixture(&content)?
        }
        None => parse_fixture(BUNDLED_FIXTURE)?,
    };

    if reset {
        let deleted = reset_store(state.store()).await?;
        info!(deleted, "Existing data removed");
    }

    let mut batch = WriteBatch::new();
    for category in &fixture.categories {
        batch.set(
            paths::categories().doc(category.id.as_str())?,
            encode(category)?,
            SetOptions::REPLACE,
        );
    }
    for brand in &fixture.brands {
        batch.set(
            paths::brands().doc(brand.id.as_str())?,
            encode(brand)?,
            SetOptions::REPLACE,
        );
    }
    let product_count = fixture.products.len();
    for product in fixture.products {
        let product = product.into_product();
        batch.set(paths::product(&product.id)?, encode(&product)?, SetOptions::REPLACE);
    }
    state.store().commit(batch).await?;
    state.catalog().invalidate().await;
    info!(
        categories = fixture.categories.len(),
        brands = fixture.brands.len(),
        products = product_count,
        "Catalog seeded"
    );

    for customer in fixture.customers {
        seed_customer(state, customer).await?;
    }

    if let Some(admin) = &state.config().seed_admin {
        let created = create_if_missing(
            state,
            "Администратор",
            &admin.email,
            admin.password.expose_secret(),
            UserRole::Admin,
        )
        .await?;
        if created.is_some() {
            info!(email = %admin.email, "Administrator created");
        }
    }

    info!("Seeding complete!");
    Ok(())
}

async fn seed_customer(state: &AppState, customer: FixtureCustomer) -> Result<(), StorefrontError> {
    let Some(user_id) = create_if_missing(
        state,
        &customer.name,
        &customer.email,
        &customer.password,
        customer.role,
    )
    .await?
    else {
        return Ok(());
    };

    for address in customer.addresses {
        state.profile().add_address(&user_id, address.into()).await?;
    }
    info!(email = %customer.email, role = %customer.role, "Account created");
    Ok(())
}

async fn create_if_missing(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
    role: UserRole,
) -> Result<Option<UserId>, StorefrontError> {
    match state.auth().create_account(name, email, password, role).await {
        Ok(user) => Ok(Some(user.id)),
        Err(AuthError::UserAlreadyExists) => {
            warn!(email, "Account already exists, skipping");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete every document the seed command manages, carts included.
async fn reset_store(store: &Arc<dyn DocumentStore>) -> Result<usize, StoreError> {
    let mut batch = WriteBatch::new();
    for user in store.list(&paths::users()).await? {
        let user_id = UserId::new(user.id);
        for line in store.list(&paths::cart(&user_id)?).await? {
            batch.delete(paths::cart_line(&user_id, &ProductId::new(line.id))?);
        }
        batch.delete(paths::user(&user_id)?);
    }
    for collection in [
        paths::products(),
        paths::categories(),
        paths::brands(),
        paths::orders(),
        paths::auth_accounts(),
    ] {
        for doc in store.list(&collection).await? {
            batch.delete(collection.doc(&doc.id)?);
        }
    }

    let deleted = batch.len();
    store.commit(batch).await?;
    Ok(deleted)
}
