//! Product, order and user management against a populated store.

use rust_decimal::Decimal;

use techshop_core::{Order, OrderStatus, UserRecord, UserRole};
use techshop_integration_tests::{TEST_PASSWORD, TestContext};
use techshop_storefront::admin::{AdminError, ProductDraft};
use techshop_storefront::checkout::OrderRequest;
use techshop_storefront::profile::{AddressInput, ProfileError, ProfileUpdate};
use techshop_storefront::services::auth::AuthError;
use techshop_storefront::services::notifications::NotificationCenter;

/// Place a one-item order for a fresh customer.
async fn placed_order(ctx: &TestContext, email: &str, product: &str) -> (UserRecord, Order) {
    let product = ctx.seed_product(product, 1000, 10).await;
    let (user, mut session) = ctx.customer(email).await;
    ctx.state
        .profile()
        .add_address(
            &user.id,
            AddressInput {
                name: "Работа".to_string(),
                address: "Невский пр., 1".to_string(),
                city: "Санкт-Петербург".to_string(),
                postal_code: "191186".to_string(),
                phone: "+7 911 000-00-00".to_string(),
                is_default: false,
            },
        )
        .await
        .expect("address added");
    let user = ctx.state.profile().load(&user.id).await.expect("user loaded");

    session.cart_mut().add_one(&product).await;
    let order = ctx
        .state
        .checkout()
        .place_order(
            &mut session,
            &user,
            &OrderRequest::default(),
            &mut NotificationCenter::new(),
        )
        .await
        .expect("order placed");
    (user, order)
}

#[tokio::test]
async fn test_ordered_product_cannot_be_deleted() {
    let ctx = TestContext::new();
    let admin = ctx.staff("admin@example.com", UserRole::Admin).await;
    let (_, order) = placed_order(&ctx, "anna@example.com", "p1").await;
    let unsold = ctx.seed_product("p2", 500, 1).await;

    let result = ctx
        .state
        .admin()
        .delete_product(&admin, &order.items[0].product_id)
        .await;
    assert!(matches!(
        result,
        Err(AdminError::ProductInOrders { orders: 1, .. })
    ));

    ctx.state
        .admin()
        .delete_product(&admin, &unsold.id)
        .await
        .expect("unsold product deleted");
    let remaining = ctx.state.catalog().products().await.expect("catalog");
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn test_order_lifecycle_stamps_delivery_once() {
    let ctx = TestContext::new();
    let manager = ctx.staff("manager@example.com", UserRole::Manager).await;
    let (_, order) = placed_order(&ctx, "anna@example.com", "p1").await;
    let admin = ctx.state.admin();

    for status in [OrderStatus::Paid, OrderStatus::Shipping] {
        let updated = admin
            .update_order_status(&manager, &order.id, status)
            .await
            .expect("status updated");
        assert!(updated.delivered_at.is_none());
    }
    let delivered = admin
        .update_order_status(&manager, &order.id, OrderStatus::Delivered)
        .await
        .expect("delivered");
    let stamped = delivered.delivered_at.expect("delivery time set");

    let again = admin
        .update_order_status(&manager, &order.id, OrderStatus::Delivered)
        .await
        .expect("same status is allowed");
    assert_eq!(again.delivered_at, Some(stamped));
    assert_eq!(again.items, order.items);
}

#[tokio::test]
async fn test_any_status_can_be_corrected() {
    let ctx = TestContext::new();
    let manager = ctx.staff("manager@example.com", UserRole::Manager).await;
    let (_, order) = placed_order(&ctx, "anna@example.com", "p1").await;
    let admin = ctx.state.admin();

    let shipped = admin
        .update_order_status(&manager, &order.id, OrderStatus::Shipping)
        .await
        .expect("new order can ship directly");
    assert_eq!(shipped.status, OrderStatus::Shipping);

    let cancelled = admin
        .update_order_status(&manager, &order.id, OrderStatus::Cancelled)
        .await
        .expect("cancelled");
    assert!(cancelled.delivered_at.is_none());

    let delivered = admin
        .update_order_status(&manager, &order.id, OrderStatus::Delivered)
        .await
        .expect("cancelled order can be corrected");
    let stamped = delivered.delivered_at.expect("delivery time set");

    let reopened = admin
        .update_order_status(&manager, &order.id, OrderStatus::Processing)
        .await
        .expect("delivered order can be corrected");
    assert_eq!(reopened.status, OrderStatus::Processing);
    assert_eq!(reopened.delivered_at, Some(stamped));

    let stored = ctx
        .state
        .catalog()
        .orders_for(&order.user_id)
        .await
        .expect("orders");
    assert_eq!(stored[0].status, OrderStatus::Processing);
    assert_eq!(stored[0].delivered_at, Some(stamped));
}

#[tokio::test]
async fn test_customer_with_orders_cannot_be_deleted() {
    let ctx = TestContext::new();
    let admin = ctx.staff("admin@example.com", UserRole::Admin).await;
    let (buyer, _) = placed_order(&ctx, "anna@example.com", "p1").await;
    let (browser, mut session) = ctx.customer("boris@example.com").await;
    let p2 = ctx.seed_product("p2", 700, 5).await;
    session.cart_mut().add_one(&p2).await;

    let refused = ctx.state.admin().delete_user(&admin, &buyer.id).await;
    assert!(matches!(
        refused,
        Err(AdminError::UserHasOrders { orders: 1, .. })
    ));

    ctx.state
        .admin()
        .delete_user(&admin, &browser.id)
        .await
        .expect("user deleted");
    let remaining = ctx.state.admin().users(&admin).await.expect("users");
    assert!(remaining.iter().all(|u| u.id != browser.id));
    assert!(
        ctx.state
            .auth()
            .sign_in("boris@example.com", techshop_integration_tests::TEST_PASSWORD)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_dashboard_and_search() {
    let ctx = TestContext::new();
    let manager = ctx.staff("manager@example.com", UserRole::Manager).await;
    let (buyer, order) = placed_order(&ctx, "anna@example.com", "p1").await;
    let hidden = ctx.seed_product("hidden", 100, 1).await;
    ctx.state
        .admin()
        .save_product(
            &manager,
            ProductDraft {
                id: Some(hidden.id),
                name: hidden.name,
                description: hidden.description,
                price: hidden.price,
                original_price: None,
                category_id: hidden.category_id,
                brand_id: hidden.brand_id,
                image_url: hidden.image_url,
                images: hidden.images,
                attributes: hidden.attributes,
                stock_quantity: hidden.stock_quantity,
                is_active: false,
                is_archived: false,
            },
        )
        .await
        .expect("product saved");

    let stats = ctx.state.admin().dashboard(&manager).await.expect("stats");
    assert_eq!(stats.products, 2);
    assert_eq!(stats.active_products, 1);
    assert_eq!(stats.orders, 1);
    assert_eq!(stats.revenue, Decimal::from(1000));

    let by_name = ctx
        .state
        .admin()
        .search_orders(&manager, &buyer.name.to_uppercase())
        .await
        .expect("search");
    assert_eq!(by_name.len(), 1);
    let by_id = ctx
        .state
        .admin()
        .search_orders(&manager, order.id.as_str())
        .await
        .expect("search");
    assert_eq!(by_id, vec![order]);

    assert!(matches!(
        ctx.state.admin().search_users(&manager, "anna").await,
        Err(AdminError::Forbidden { .. })
    ));
}

#[tokio::test]
async fn test_deleting_renamed_user_spares_other_accounts() {
    let ctx = TestContext::new();
    let admin = ctx.staff("admin@example.com", UserRole::Admin).await;
    let (anna, _) = ctx.customer("anna@example.com").await;
    let (boris, _) = ctx.customer("boris@example.com").await;

    let taken = ctx
        .state
        .profile()
        .update_profile(
            &anna.id,
            ProfileUpdate {
                name: "Анна".to_string(),
                email: "boris@example.com".to_string(),
                phone: None,
            },
        )
        .await;
    assert!(matches!(taken, Err(ProfileError::EmailTaken(_))));

    ctx.state
        .profile()
        .update_profile(
            &anna.id,
            ProfileUpdate {
                name: "Анна".to_string(),
                email: "anna.k@example.com".to_string(),
                phone: None,
            },
        )
        .await
        .expect("email changed");
    assert!(matches!(
        ctx.state
            .auth()
            .sign_up("Кто-то", "anna.k@example.com", TEST_PASSWORD)
            .await,
        Err(AuthError::UserAlreadyExists)
    ));

    ctx.state
        .admin()
        .delete_user(&admin, &anna.id)
        .await
        .expect("user deleted");

    let signed_in = ctx
        .state
        .auth()
        .sign_in("boris@example.com", TEST_PASSWORD)
        .await
        .expect("other account untouched");
    assert_eq!(signed_in.id, boris.id);
    for freed in ["anna@example.com", "anna.k@example.com"] {
        ctx.state
            .auth()
            .sign_up("Новая Анна", freed, TEST_PASSWORD)
            .await
            .expect("address free again");
    }
}
