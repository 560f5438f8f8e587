//! Favorites state manager.
//!
//! The set is sourced from the `favoriteProducts` array on `users/{uid}`
//! and mirrored back with element-level array updates.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use techshop_core::{FAVORITES_FIELD, ProductId, UserId, UserRecord};

use super::{SyncPolicy, SyncState};
use crate::store::{ArrayOp, DocumentStore, StoreError, paths};

/// Holds the signed-in user's favorite products.
#[derive(Debug)]
pub struct FavoritesManager {
    store: Arc<dyn DocumentStore>,
    policy: SyncPolicy,
    user: Option<UserId>,
    state: SyncState,
    favorites: HashSet<ProductId>,
}

impl FavoritesManager {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, policy: SyncPolicy) -> Self {
        Self {
            store,
            policy,
            user: None,
            state: SyncState::Uninitialized,
            favorites: HashSet::new(),
        }
    }

    /// Copy the user's stored favorites into local state.
    ///
    /// A missing user record, or no user at all, yields an empty set.
    #[instrument(skip(self), fields(user_id = user.map_or("-", UserId::as_str)))]
    pub async fn load(&mut self, user: Option<&UserId>) {
        self.favorites.clear();
        let Some(user) = user else {
            self.user = None;
            self.state = SyncState::Uninitialized;
            return;
        };

        self.user = Some(user.clone());
        self.state = SyncState::Loading;
        match self.fetch(user).await {
            Ok(favorites) => self.favorites = favorites,
            Err(error) => tracing::warn!(error = %error, "Failed to fetch favorites"),
        }
        self.state = SyncState::Ready;
        tracing::debug!(favorites = self.favorites.len(), "Favorites loaded");
    }

    async fn fetch(&self, user: &UserId) -> Result<HashSet<ProductId>, StoreError> {
        let Some(doc) = self.store.get(&paths::user(user)?).await? else {
            return Ok(HashSet::new());
        };
        let record: UserRecord = doc.decode()?;
        Ok(record.favorite_products.into_iter().collect())
    }

    /// Flip membership of `product_id`, returning whether it is a favorite
    /// afterwards.
    ///
    /// Ignored (returning the current membership) until the manager is
    /// loaded for a user.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn toggle_favorite(&mut self, product_id: &ProductId) -> bool {
        let was_favorite = self.is_favorite(product_id);
        let Some(user) = self.active_user() else {
            return was_favorite;
        };
        let path = match paths::user(&user) {
            Ok(path) => path,
            Err(error) => {
                tracing::warn!(error = %error, "Cannot address user record");
                return was_favorite;
            }
        };

        let value = Value::from(product_id.as_str());
        let op = if was_favorite {
            self.favorites.remove(product_id);
            ArrayOp::Remove(value)
        } else {
            self.favorites.insert(product_id.clone());
            ArrayOp::Add(value)
        };

        if let Err(error) = self.store.update_array(&path, FAVORITES_FIELD, op).await {
            tracing::warn!(error = %error, "Favorite write failed");
            if self.policy == SyncPolicy::RevertOnFailure {
                if was_favorite {
                    self.favorites.insert(product_id.clone());
                } else {
                    self.favorites.remove(product_id);
                }
                tracing::debug!("Reverted local favorites");
            }
        }
        self.is_favorite(product_id)
    }

    #[must_use]
    pub fn is_favorite(&self, product_id: &ProductId) -> bool {
        self.favorites.contains(product_id)
    }

    /// Favorite product ids, sorted.
    #[must_use]
    pub fn favorites(&self) -> Vec<ProductId> {
        let mut ids: Vec<_> = self.favorites.iter().cloned().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.favorites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.favorites.is_empty()
    }

    #[must_use]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    fn active_user(&self) -> Option<UserId> {
        match (&self.user, self.state) {
            (Some(user), SyncState::Ready) => Some(user.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use techshop_core::UserRole;

    use super::*;
    use crate::store::{MemoryStore, SetOptions, encode};

    async fn seeded_store(favorites: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let mut user = UserRecord::new(
            UserId::new("u1"),
            "Анна",
            "anna@example.com",
            UserRole::User,
            Utc::now(),
        );
        user.favorite_products = favorites.iter().map(|id| ProductId::new(*id)).collect();
        store
            .set(
                &paths::user(&user.id).unwrap(),
                encode(&user).unwrap(),
                SetOptions::REPLACE,
            )
            .await
            .unwrap();
        store
    }

    async fn ready(store: &Arc<MemoryStore>, policy: SyncPolicy) -> FavoritesManager {
        let mut favorites = FavoritesManager::new(store.clone(), policy);
        favorites.load(Some(&UserId::new("u1"))).await;
        favorites
    }

    async fn stored_favorites(store: &MemoryStore) -> Vec<ProductId> {
        let doc = store
            .get(&paths::user(&UserId::new("u1")).unwrap())
            .await
            .unwrap()
            .unwrap();
        doc.decode::<UserRecord>().unwrap().favorite_products
    }

    #[tokio::test]
    async fn test_toggle_is_an_involution() {
        let store = seeded_store(&[]).await;
        let mut favorites = ready(&store, SyncPolicy::Optimistic).await;
        let p7 = ProductId::new("p7");

        assert!(favorites.toggle_favorite(&p7).await);
        assert!(favorites.is_favorite(&p7));
        assert_eq!(stored_favorites(&store).await, vec![p7.clone()]);

        assert!(!favorites.toggle_favorite(&p7).await);
        assert!(favorites.is_empty());
        assert!(stored_favorites(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_copies_stored_favorites() {
        let store = seeded_store(&["p2", "p1"]).await;
        let favorites = ready(&store, SyncPolicy::Optimistic).await;
        assert_eq!(
            favorites.favorites(),
            vec![ProductId::new("p1"), ProductId::new("p2")]
        );
    }

    #[tokio::test]
    async fn test_missing_user_record_yields_empty_set() {
        let store = Arc::new(MemoryStore::new());
        let favorites = ready(&store, SyncPolicy::Optimistic).await;
        assert_eq!(favorites.state(), SyncState::Ready);
        assert!(favorites.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_ignored_before_load() {
        let store = seeded_store(&[]).await;
        let mut favorites = FavoritesManager::new(store.clone(), SyncPolicy::Optimistic);
        assert!(!favorites.toggle_favorite(&ProductId::new("p7")).await);
        assert!(stored_favorites(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_clears_set() {
        let store = seeded_store(&["p1"]).await;
        let mut favorites = ready(&store, SyncPolicy::Optimistic).await;
        favorites.load(None).await;
        assert!(favorites.is_empty());
        assert_eq!(favorites.state(), SyncState::Uninitialized);
    }

    #[tokio::test]
    async fn test_failed_toggle_by_policy() {
        let store = seeded_store(&[]).await;
        let p7 = ProductId::new("p7");

        let mut optimistic = ready(&store, SyncPolicy::Optimistic).await;
        let mut reverting = ready(&store, SyncPolicy::RevertOnFailure).await;
        store.set_offline(true);

        assert!(optimistic.toggle_favorite(&p7).await);
        assert!(!reverting.toggle_favorite(&p7).await);
        assert!(!reverting.is_favorite(&p7));
    }
}
