//! Favorites mirrored to the `favoriteProducts` array on the user record.

use techshop_core::{ProductId, UserRecord};
use techshop_integration_tests::TestContext;
use techshop_storefront::store::{DocumentStore, paths};

async fn stored_favorites(ctx: &TestContext, user: &UserRecord) -> Vec<ProductId> {
    ctx.store
        .get(&paths::user(&user.id).expect("valid path"))
        .await
        .expect("store online")
        .expect("user record exists")
        .decode::<UserRecord>()
        .expect("decodable user")
        .favorite_products
}

#[tokio::test]
async fn test_toggle_twice_restores_empty_set() {
    let ctx = TestContext::new();
    let (user, mut session) = ctx.customer("anna@example.com").await;
    let p7 = ProductId::new("p7");

    assert!(session.favorites_mut().toggle_favorite(&p7).await);
    assert_eq!(session.favorites().favorites(), vec![p7.clone()]);
    assert_eq!(stored_favorites(&ctx, &user).await, vec![p7.clone()]);

    assert!(!session.favorites_mut().toggle_favorite(&p7).await);
    assert!(session.favorites().is_empty());
    assert!(stored_favorites(&ctx, &user).await.is_empty());
}

#[tokio::test]
async fn test_favorites_follow_the_user() {
    let ctx = TestContext::new();
    let p1 = ctx.seed_product("p1", 1000, 5).await;
    let p2 = ctx.seed_product("p2", 2000, 5).await;
    let (anna, mut session) = ctx.customer("anna@example.com").await;
    session.favorites_mut().toggle_favorite(&p1.id).await;
    session.favorites_mut().toggle_favorite(&p2.id).await;

    let (boris, _) = ctx.customer("boris@example.com").await;
    session.on_auth_change(Some(boris.id)).await;
    assert!(session.favorites().is_empty());

    session.on_auth_change(Some(anna.id)).await;
    let ids = session.favorites().favorites();
    assert_eq!(ids, vec![p1.id.clone(), p2.id.clone()]);

    let products = ctx.state.catalog().favorites_of(&ids).await.expect("catalog");
    assert_eq!(products.len(), 2);
}

#[tokio::test]
async fn test_profile_edits_keep_favorites() {
    let ctx = TestContext::new();
    let (user, mut session) = ctx.customer("anna@example.com").await;
    let p1 = ProductId::new("p1");
    session.favorites_mut().toggle_favorite(&p1).await;

    ctx.state
        .profile()
        .update_profile(
            &user.id,
            techshop_storefront::profile::ProfileUpdate {
                name: "Анна".to_string(),
                email: "anna@example.com".to_string(),
                phone: None,
            },
        )
        .await
        .expect("profile updated");

    assert_eq!(stored_favorites(&ctx, &user).await, vec![p1]);
}

#[tokio::test]
async fn test_session_follows_auth_changes() {
    let ctx = TestContext::new();
    let (user, mut session) = ctx.customer("anna@example.com").await;
    session.favorites_mut().toggle_favorite(&ProductId::new("p1")).await;

    let mut follower = ctx.state.session();
    let auth = ctx.state.auth().subscribe();
    let task = tokio::spawn(async move {
        follower.follow(auth).await;
        follower
    });

    ctx.state.auth().sign_out();
    ctx.state
        .auth()
        .sign_in(&user.email, techshop_integration_tests::TEST_PASSWORD)
        .await
        .expect("signed in");
    assert_eq!(ctx.state.auth().current_user(), Some(user.id));
    drop(ctx);

    let follower = task.await.expect("follow task finished");
    assert_eq!(follower.favorites().len(), 1);
}
