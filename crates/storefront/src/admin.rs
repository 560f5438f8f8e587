//! Store management for managers and admins.
//!
//! Every operation takes the acting user's record and checks its role
//! first. Managers may edit products and orders; user management and
//! deletions need an admin.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use techshop_core::{
    BrandId, CategoryId, Email, EmailError, Order, OrderId, OrderStatus, Product,
    ProductAttribute, ProductId, UserId, UserRecord, UserRole,
};

use crate::catalog::Catalog;
use crate::services::auth::{self, AuthError, AuthService};
use crate::store::{DocumentStore, SetOptions, StoreError, WriteBatch, encode, paths};

/// Errors from management operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The acting user's role does not allow the operation.
    #[error("{role} may not {action}")]
    Forbidden { role: UserRole, action: &'static str },

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error("product {product_id} is referenced by {orders} order(s)")]
    ProductInOrders { product_id: ProductId, orders: usize },

    #[error("user {user_id} has {orders} order(s)")]
    UserHasOrders { user_id: UserId, orders: usize },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    InvalidEmail(#[from] EmailError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

// =============================================================================
// Inputs and outputs
// =============================================================================

/// Product form contents. `id: None` creates a new product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub id: Option<ProductId>,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub category_id: CategoryId,
    pub brand_id: BrandId,
    pub image_url: String,
    pub images: Vec<String>,
    pub attributes: Vec<ProductAttribute>,
    pub stock_quantity: u32,
    pub is_active: bool,
    pub is_archived: bool,
}

/// User form contents. `id: None` creates a new account, which requires a
/// password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub id: Option<UserId>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub password: Option<String>,
}

/// Headline numbers for the management screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub products: usize,
    pub active_products: usize,
    pub orders: usize,
    /// Sum of all order totals.
    pub revenue: Decimal,
}

// =============================================================================
// Service
// =============================================================================

/// Management operations over the document store.
#[derive(Debug, Clone)]
pub struct AdminService {
    store: Arc<dyn DocumentStore>,
    catalog: Catalog,
    auth: Arc<AuthService>,
}

impl AdminService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, catalog: Catalog, auth: Arc<AuthService>) -> Self {
        Self {
            store,
            catalog,
            auth,
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Create or update a product.
    ///
    /// New products start with no rating or reviews. Updates keep the
    /// stored rating, review count and creation time. The discount is
    /// recomputed either way.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for customers,
    /// `AdminError::ProductNotFound` when updating a missing product, and
    /// `AdminError::Validation` for a blank name or a negative price.
    #[instrument(skip(self, actor, draft), fields(actor = %actor.id))]
    pub async fn save_product(
        &self,
        actor: &UserRecord,
        draft: ProductDraft,
    ) -> Result<Product, AdminError> {
        require_manager(actor, "edit products")?;
        let name = draft.name.trim().to_owned();
        if name.is_empty() {
            return Err(AdminError::Validation("product name is empty".to_owned()));
        }
        if draft.price < Decimal::ZERO {
            return Err(AdminError::Validation("price is negative".to_owned()));
        }

        let (id, rating, reviews_count, created_at) = match draft.id {
            Some(id) => {
                let existing = self
                    .product(&id)
                    .await?
                    .ok_or_else(|| AdminError::ProductNotFound(id.clone()))?;
                (id, existing.rating, existing.reviews_count, existing.created_at)
            }
            None => (ProductId::generate(), 0.0, 0, Utc::now()),
        };

        let mut product = Product {
            id,
            name,
            description: draft.description,
            price: draft.price,
            original_price: draft.original_price,
            discount: None,
            category_id: draft.category_id,
            brand_id: draft.brand_id,
            image_url: draft.image_url,
            images: draft.images,
            attributes: draft.attributes,
            stock_quantity: draft.stock_quantity,
            is_active: draft.is_active,
            is_archived: draft.is_archived,
            rating,
            reviews_count,
            created_at,
        };
        product.refresh_discount();

        self.store
            .set(&paths::product(&product.id)?, encode(&product)?, SetOptions::REPLACE)
            .await?;
        self.catalog.invalidate().await;
        tracing::info!(product_id = %product.id, "Product saved");
        Ok(product)
    }

    /// Delete a product that no order references.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::ProductInOrders` if any order contains it.
    #[instrument(skip(self, actor), fields(actor = %actor.id, product_id = %product_id))]
    pub async fn delete_product(
        &self,
        actor: &UserRecord,
        product_id: &ProductId,
    ) -> Result<(), AdminError> {
        require_admin(actor, "delete products")?;
        let orders = self
            .catalog
            .orders()
            .await?
            .iter()
            .filter(|order| order.contains_product(product_id))
            .count();
        if orders > 0 {
            return Err(AdminError::ProductInOrders {
                product_id: product_id.clone(),
                orders,
            });
        }

        self.store.delete(&paths::product(product_id)?).await?;
        self.catalog.invalidate().await;
        tracing::info!("Product deleted");
        Ok(())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Move an order to `status`, stamping the delivery time the first time
    /// it reaches delivered.
    ///
    /// Any status may follow any other, so a mistaken status can be
    /// corrected. The delivery stamp is never cleared or moved.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::OrderNotFound` for an unknown order.
    #[instrument(skip(self, actor), fields(actor = %actor.id, order_id = %order_id, status = %status))]
    pub async fn update_order_status(
        &self,
        actor: &UserRecord,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, AdminError> {
        require_manager(actor, "edit orders")?;
        let path = paths::order(order_id)?;
        let mut order: Order = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| AdminError::OrderNotFound(order_id.clone()))?
            .decode()?;

        order.status = status;
        if status == OrderStatus::Delivered && order.delivered_at.is_none() {
            order.delivered_at = Some(Utc::now());
        }

        self.store
            .set(&path, encode(&order)?, SetOptions::MERGE)
            .await?;
        tracing::info!("Order status updated");
        Ok(order)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create an account or update a profile.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` when creating without a password,
    /// `AdminError::Auth` if account creation fails or the new email belongs
    /// to another account, and `AdminError::UserNotFound` when updating a
    /// missing user. A changed email moves the sign-in account with it.
    #[instrument(skip(self, actor, draft), fields(actor = %actor.id))]
    pub async fn save_user(
        &self,
        actor: &UserRecord,
        draft: UserDraft,
    ) -> Result<UserRecord, AdminError> {
        require_admin(actor, "manage users")?;

        let Some(id) = draft.id else {
            let password = draft
                .password
                .ok_or_else(|| AdminError::Validation("password is required".to_owned()))?;
            let mut user = self
                .auth
                .create_account(&draft.name, &draft.email, &password, draft.role)
                .await?;
            if let Some(phone) = draft.phone.filter(|p| !p.trim().is_empty()) {
                user.phone = Some(phone);
                self.write_user(&user).await?;
            }
            return Ok(user);
        };

        let mut user = self
            .user(&id)
            .await?
            .ok_or_else(|| AdminError::UserNotFound(id.clone()))?;
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(AdminError::Validation("name is empty".to_owned()));
        }
        let email = Email::parse(&draft.email)?;
        let mut batch = WriteBatch::new();
        if !auth::stage_email_change(self.store.as_ref(), &id, &email, &mut batch).await? {
            return Err(AuthError::UserAlreadyExists.into());
        }
        user.name = name.to_owned();
        user.email = email.as_str().to_owned();
        user.phone = draft.phone.filter(|p| !p.trim().is_empty());
        user.role = draft.role;
        batch.set(paths::user(&id)?, encode(&user)?, SetOptions::MERGE);
        self.store.commit(batch).await?;
        tracing::info!(user_id = %user.id, "User updated");
        Ok(user)
    }

    /// Delete a user without orders, along with their cart and sign-in
    /// account.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::UserHasOrders` if the user has placed orders.
    #[instrument(skip(self, actor), fields(actor = %actor.id, user_id = %user_id))]
    pub async fn delete_user(&self, actor: &UserRecord, user_id: &UserId) -> Result<(), AdminError> {
        require_admin(actor, "delete users")?;
        let orders = self.catalog.orders_for(user_id).await?.len();
        if orders > 0 {
            return Err(AdminError::UserHasOrders {
                user_id: user_id.clone(),
                orders,
            });
        }
        if self.user(user_id).await?.is_none() {
            return Err(AdminError::UserNotFound(user_id.clone()));
        }

        let mut batch = WriteBatch::new();
        for line in self.store.list(&paths::cart(user_id)?).await? {
            batch.delete(paths::cart_line(user_id, &ProductId::new(line.id))?);
        }
        if let Some(account) = auth::account_of(self.store.as_ref(), user_id).await? {
            batch.delete(account);
        }
        batch.delete(paths::user(user_id)?);
        self.store.commit(batch).await?;
        tracing::info!("User deleted");
        Ok(())
    }

    /// Every user profile, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admins.
    pub async fn users(&self, actor: &UserRecord) -> Result<Vec<UserRecord>, AdminError> {
        require_admin(actor, "list users")?;
        self.all_users().await
    }

    // =========================================================================
    // Dashboard and search
    // =========================================================================

    /// Counts and revenue across the whole store.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for customers.
    pub async fn dashboard(&self, actor: &UserRecord) -> Result<DashboardStats, AdminError> {
        require_manager(actor, "view the dashboard")?;
        let products = self.catalog.products().await?;
        let orders = self.catalog.orders().await?;
        Ok(DashboardStats {
            products: products.len(),
            active_products: products.iter().filter(|p| p.is_active).count(),
            orders: orders.len(),
            revenue: orders.iter().map(|o| o.total).sum(),
        })
    }

    /// Products whose name contains `query`, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for customers.
    pub async fn search_products(
        &self,
        actor: &UserRecord,
        query: &str,
    ) -> Result<Vec<Product>, AdminError> {
        require_manager(actor, "search products")?;
        let query = query.trim().to_lowercase();
        Ok(self
            .catalog
            .products()
            .await?
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }

    /// Orders whose id or customer name contains `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for customers.
    pub async fn search_orders(
        &self,
        actor: &UserRecord,
        query: &str,
    ) -> Result<Vec<Order>, AdminError> {
        require_manager(actor, "search orders")?;
        let query = query.trim().to_lowercase();
        let mut orders = self.catalog.orders().await?;
        if query.is_empty() {
            return Ok(orders);
        }
        let users = self.all_users().await?;
        orders.retain(|order| {
            order.id.as_str().to_lowercase().contains(&query)
                || users
                    .iter()
                    .find(|u| u.id == order.user_id)
                    .is_some_and(|u| u.name.to_lowercase().contains(&query))
        });
        Ok(orders)
    }

    /// Users whose name or email contains `query`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admins.
    pub async fn search_users(
        &self,
        actor: &UserRecord,
        query: &str,
    ) -> Result<Vec<UserRecord>, AdminError> {
        require_admin(actor, "search users")?;
        let query = query.trim().to_lowercase();
        let mut users = self.all_users().await?;
        users.retain(|u| {
            u.name.to_lowercase().contains(&query) || u.email.to_lowercase().contains(&query)
        });
        Ok(users)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        self.store
            .get(&paths::product(id)?)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    async fn user(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        self.store
            .get(&paths::user(id)?)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    async fn write_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        self.store
            .set(&paths::user(&user.id)?, encode(user)?, SetOptions::MERGE)
            .await
    }

    async fn all_users(&self) -> Result<Vec<UserRecord>, AdminError> {
        let documents = self.store.list(&paths::users()).await?;
        Ok(documents
            .into_iter()
            .filter_map(|doc| doc.decode().ok())
            .collect())
    }
}

fn require_manager(actor: &UserRecord, action: &'static str) -> Result<(), AdminError> {
    if actor.role.can_manage_store() {
        Ok(())
    } else {
        Err(AdminError::Forbidden {
            role: actor.role,
            action,
        })
    }
}

fn require_admin(actor: &UserRecord, action: &'static str) -> Result<(), AdminError> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(AdminError::Forbidden {
            role: actor.role,
            action,
        })
    }
}
