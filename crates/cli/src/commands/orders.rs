//! Order commands, including the management ones.

use tracing::info;

use techshop_core::{
    AddressId, DeliveryOption, OrderId, OrderStatus, PaymentMethod, Price, UserRecord,
};
use techshop_storefront::checkout::OrderRequest;
use techshop_storefront::services::notifications::NotificationCenter;
use techshop_storefront::session::Session;
use techshop_storefront::{AppState, StorefrontError};

/// Print the user's orders, newest first.
///
/// # Errors
///
/// Returns the store error if orders cannot be listed.
pub async fn list(state: &AppState, user: &UserRecord) -> Result<(), StorefrontError> {
    let orders = state.catalog().orders_for(&user.id).await?;
    if orders.is_empty() {
        info!("No orders");
        return Ok(());
    }
    for order in &orders {
        info!(
            "  {} | {} | {} | {} item(s) | {}",
            order.id,
            order.created_at.format("%d.%m.%Y %H:%M"),
            order.status,
            order.unit_count(),
            Price::rub(order.total).display()
        );
    }
    Ok(())
}

/// Place an order for the cart contents.
///
/// # Errors
///
/// Returns the checkout error if the order cannot be placed.
pub async fn place(
    state: &AppState,
    session: &mut Session,
    user: &UserRecord,
    address: Option<String>,
    payment_method: PaymentMethod,
    express: bool,
) -> Result<(), StorefrontError> {
    let request = OrderRequest {
        address_id: address.map(AddressId::new),
        payment_method,
        delivery: if express {
            DeliveryOption::Express
        } else {
            DeliveryOption::Standard
        },
    };
    let quote = state.checkout().quote(session, request.delivery);
    info!(
        "Subtotal {}, delivery {}",
        Price::rub(quote.subtotal).display(),
        Price::rub(quote.delivery_fee).display()
    );

    let mut notifications = NotificationCenter::new();
    let order = state
        .checkout()
        .place_order(session, user, &request, &mut notifications)
        .await?;

    for toast in notifications.toasts.active() {
        info!("{}", toast.title);
    }
    info!("Order {} total {}", order.id, Price::rub(order.total).display());
    Ok(())
}

/// Print dashboard totals.
///
/// # Errors
///
/// Returns `StorefrontError::Admin` if the user may not view the dashboard.
pub async fn stats(state: &AppState, user: &UserRecord) -> Result<(), StorefrontError> {
    let stats = state.admin().dashboard(user).await?;
    info!("Products: {} ({} active)", stats.products, stats.active_products);
    info!("Orders: {}", stats.orders);
    info!("Revenue: {}", Price::rub(stats.revenue).display());
    Ok(())
}

/// Move an order to `status`.
///
/// # Errors
///
/// Returns `StorefrontError::Admin` if the role or lifecycle forbids it.
pub async fn set_status(
    state: &AppState,
    user: &UserRecord,
    order: &str,
    status: OrderStatus,
) -> Result<(), StorefrontError> {
    let order = state
        .admin()
        .update_order_status(user, &OrderId::new(order.trim()), status)
        .await?;
    info!("Order {} is now {}", order.id, order.status.label());
    Ok(())
}
