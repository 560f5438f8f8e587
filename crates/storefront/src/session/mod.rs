//! Per-user cart and favorites state.
//!
//! # Architecture
//!
//! A [`Session`] is created once and reacts to authentication changes: on
//! sign-in both managers fetch the user's remote state and replace their
//! local copy; on sign-out they drop it. Screens read from the managers
//! only, never from the store.
//!
//! Mutations are optimistic. Local state changes first and one remote write
//! follows; a failed write is logged and, depending on [`SyncPolicy`],
//! either kept or rolled back. There is no retry and no reconciliation
//! beyond the next full load.

pub mod cart;
pub mod favorites;

pub use cart::{CartLine, CartManager};
pub use favorites::FavoritesManager;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::instrument;

use techshop_core::UserId;

use crate::config::StorefrontConfig;
use crate::store::DocumentStore;

/// What a manager does with its local state when the remote write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Keep the local change; local and remote stay diverged until the
    /// next load.
    #[default]
    Optimistic,
    /// Restore the local state from before the call.
    RevertOnFailure,
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimistic => write!(f, "optimistic"),
            Self::RevertOnFailure => write!(f, "revert"),
        }
    }
}

impl FromStr for SyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "revert" | "revert_on_failure" => Ok(Self::RevertOnFailure),
            _ => Err(format!("invalid sync policy: {s}")),
        }
    }
}

/// Loading state of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No user, nothing loaded. Mutations are ignored.
    #[default]
    Uninitialized,
    /// Fetching remote state for a user.
    Loading,
    /// Local state reflects the last fetch plus later mutations.
    Ready,
}

/// Cart and favorites for whoever is signed in.
#[derive(Debug)]
pub struct Session {
    user: Option<UserId>,
    cart: CartManager,
    favorites: FavoritesManager,
}

impl Session {
    /// Create a session with nobody signed in.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, policy: SyncPolicy) -> Self {
        Self {
            user: None,
            cart: CartManager::new(Arc::clone(&store), policy),
            favorites: FavoritesManager::new(store, policy),
        }
    }

    /// Create a session using the configured policy and delivery rates.
    #[must_use]
    pub fn with_config(store: Arc<dyn DocumentStore>, config: &StorefrontConfig) -> Self {
        let mut session = Self::new(store, config.sync_policy);
        session.cart = session.cart.with_delivery_rates(config.delivery);
        session
    }

    /// Load state for a newly signed-in user, or drop it on sign-out.
    #[instrument(skip(self), fields(user_id = user.as_ref().map_or("-", UserId::as_str)))]
    pub async fn on_auth_change(&mut self, user: Option<UserId>) {
        self.user.clone_from(&user);
        self.cart.load(user.as_ref()).await;
        self.favorites.load(user.as_ref()).await;
    }

    /// Track the auth service until it is dropped.
    ///
    /// Applies the current value immediately, then every change.
    pub async fn follow(&mut self, mut auth: watch::Receiver<Option<UserId>>) {
        loop {
            let user = auth.borrow_and_update().clone();
            self.on_auth_change(user).await;
            if auth.changed().await.is_err() {
                break;
            }
        }
    }

    /// The user this session is loaded for.
    #[must_use]
    pub const fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn cart(&self) -> &CartManager {
        &self.cart
    }

    pub const fn cart_mut(&mut self) -> &mut CartManager {
        &mut self.cart
    }

    #[must_use]
    pub const fn favorites(&self) -> &FavoritesManager {
        &self.favorites
    }

    pub const fn favorites_mut(&mut self) -> &mut FavoritesManager {
        &mut self.favorites
    }
}
