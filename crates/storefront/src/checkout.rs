//! Order placement.
//!
//! Turns the session's cart into an order: validate, write
//! `orders/{id}`, decrement stock, clear the cart, notify. This is the one
//! flow where store failures reach the caller; everything else in the
//! session logs and carries on.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use techshop_core::{
    AddressId, DeliveryAddress, DeliveryOption, NotificationKind, Order, OrderId, OrderItem,
    OrderStatus, PaymentMethod, Price, Product, ProductId, UserRecord,
};

use crate::catalog::Catalog;
use crate::config::DeliveryRates;
use crate::services::notifications::{Notification, NotificationCenter, ToastRequest};
use crate::session::{CartLine, Session};
use crate::store::{DocumentStore, SetOptions, StoreError, encode, paths};

/// Field decremented on each product when an order is placed.
const STOCK_FIELD: &str = "stockQuantity";

/// Errors that abort order placement.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The session is not loaded for the ordering user.
    #[error("not signed in")]
    NotSignedIn,

    #[error("cart is empty")]
    EmptyCart,

    /// No address was chosen and the user has none on file.
    #[error("delivery address required")]
    AddressRequired,

    #[error("unknown delivery address: {0}")]
    AddressNotFound(AddressId),

    #[error("product no longer exists: {0}")]
    ProductNotFound(ProductId),

    #[error("only {available} of {product_id} in stock, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Document store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Message shown to the customer.
    #[must_use]
    pub const fn toast_title(&self) -> &'static str {
        match self {
            Self::NotSignedIn => "Вы должны быть авторизованы для оформления заказа",
            Self::EmptyCart => "Корзина пуста",
            Self::AddressRequired | Self::AddressNotFound(_) => "Выберите адрес доставки",
            Self::ProductNotFound(_) | Self::InsufficientStock { .. } => {
                "Недостаточно товара на складе"
            }
            Self::Store(_) => "Ошибка оформления заказа",
        }
    }
}

/// What the customer chose on the checkout screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderRequest {
    /// Falls back to the user's default address when unset.
    pub address_id: Option<AddressId>,
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryOption,
}

/// Amounts shown before the order is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderQuote {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

impl OrderQuote {
    #[must_use]
    pub const fn total_price(&self) -> Price {
        Price::rub(self.total)
    }
}

/// Places orders against a document store.
#[derive(Debug, Clone)]
pub struct Checkout {
    store: Arc<dyn DocumentStore>,
    catalog: Catalog,
    rates: DeliveryRates,
}

impl Checkout {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, catalog: Catalog, rates: DeliveryRates) -> Self {
        Self {
            store,
            catalog,
            rates,
        }
    }

    /// Delivery fee for the chosen option. Standard delivery is free at
    /// checkout.
    #[must_use]
    pub fn delivery_fee(&self, delivery: DeliveryOption) -> Decimal {
        match delivery {
            DeliveryOption::Standard => Decimal::ZERO,
            DeliveryOption::Express => self.rates.express_fee,
        }
    }

    /// Price the current cart.
    #[must_use]
    pub fn quote(&self, session: &Session, delivery: DeliveryOption) -> OrderQuote {
        let subtotal = session.cart().total();
        let delivery_fee = self.delivery_fee(delivery);
        OrderQuote {
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
        }
    }

    /// Place an order for everything in the session's cart.
    ///
    /// On success the cart is empty, stock has been decremented, and a
    /// toast and inbox entry announce the order. On failure a destructive
    /// toast is shown and nothing further is attempted; writes already made
    /// are not undone.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if validation fails or any store call fails.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn place_order(
        &self,
        session: &mut Session,
        user: &UserRecord,
        request: &OrderRequest,
        notifications: &mut NotificationCenter,
    ) -> Result<Order, CheckoutError> {
        match self.try_place_order(session, user, request).await {
            Ok(order) => {
                tracing::info!(order_id = %order.id, total = %order.total, "Order placed");
                notifications
                    .toasts
                    .push(ToastRequest::new("Заказ успешно оформлен!"));
                notifications.inbox.push(Notification::new(
                    user.id.clone(),
                    NotificationKind::Order,
                    "Заказ оформлен",
                    format!(
                        "Ваш заказ #{} успешно оформлен и отправлен в обработку",
                        order.id
                    ),
                ));
                Ok(order)
            }
            Err(error) => {
                tracing::warn!(error = %error, "Order placement failed");
                notifications
                    .toasts
                    .push(ToastRequest::destructive(error.toast_title()));
                Err(error)
            }
        }
    }

    async fn try_place_order(
        &self,
        session: &mut Session,
        user: &UserRecord,
        request: &OrderRequest,
    ) -> Result<Order, CheckoutError> {
        if session.user() != Some(&user.id) {
            return Err(CheckoutError::NotSignedIn);
        }
        let lines = session.cart().lines().to_vec();
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let address = select_address(user, request.address_id.as_ref())?;

        for line in &lines {
            self.check_stock(line).await?;
        }

        let order = self.build_order(user, address, request, &lines);
        self.store
            .set(&paths::order(&order.id)?, encode(&order)?, SetOptions::REPLACE)
            .await?;

        for line in &lines {
            let delta = -i64::from(line.quantity);
            self.store
                .increment(&paths::product(&line.product_id)?, STOCK_FIELD, delta)
                .await?;
        }
        self.catalog.invalidate().await;

        session.cart_mut().clear_cart().await?;
        Ok(order)
    }

    async fn check_stock(&self, line: &CartLine) -> Result<(), CheckoutError> {
        let product: Product = self
            .store
            .get(&paths::product(&line.product_id)?)
            .await?
            .ok_or_else(|| CheckoutError::ProductNotFound(line.product_id.clone()))?
            .decode()?;
        if line.quantity > product.stock_quantity {
            return Err(CheckoutError::InsufficientStock {
                product_id: line.product_id.clone(),
                requested: line.quantity,
                available: product.stock_quantity,
            });
        }
        Ok(())
    }

    fn build_order(
        &self,
        user: &UserRecord,
        address: DeliveryAddress,
        request: &OrderRequest,
        lines: &[CartLine],
    ) -> Order {
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|line| OrderItem {
                id: line.product_id.to_string(),
                product_id: line.product_id.clone(),
                product_name: line.display_name.clone(),
                product_image: line.image_ref.clone(),
                quantity: line.quantity,
                price: line.unit_price,
                total: line.line_total(),
            })
            .collect();
        let subtotal: Decimal = items.iter().map(|item| item.total).sum();
        let delivery_fee = self.delivery_fee(request.delivery);

        Order {
            id: OrderId::generate(),
            user_id: user.id.clone(),
            items,
            delivery_address: address,
            payment_method: request.payment_method,
            status: OrderStatus::New,
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
            created_at: Utc::now(),
            delivered_at: None,
        }
    }
}

fn select_address(
    user: &UserRecord,
    address_id: Option<&AddressId>,
) -> Result<DeliveryAddress, CheckoutError> {
    match address_id {
        Some(id) => user
            .address(id)
            .cloned()
            .ok_or_else(|| CheckoutError::AddressNotFound(id.clone())),
        None => user
            .default_address()
            .cloned()
            .ok_or(CheckoutError::AddressRequired),
    }
}
