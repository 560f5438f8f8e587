//! Application state shared across sessions.

use std::sync::Arc;

use crate::admin::AdminService;
use crate::catalog::Catalog;
use crate::checkout::Checkout;
use crate::config::StorefrontConfig;
use crate::profile::ProfileService;
use crate::services::auth::AuthService;
use crate::session::Session;
use crate::store::{DocumentStore, FileStore, StoreError};

/// Application state shared across all sessions.
///
/// This struct is cheaply cloneable via `Arc` and wires every service to
/// the same document store.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn DocumentStore>,
    auth: Arc<AuthService>,
    catalog: Catalog,
    checkout: Checkout,
    profile: ProfileService,
    admin: AdminService,
}

impl AppState {
    /// Create a new application state over `store`.
    #[must_use]
    pub fn new(config: StorefrontConfig, store: Arc<dyn DocumentStore>) -> Self {
        let auth = Arc::new(AuthService::new(store.clone()));
        let catalog = Catalog::new(store.clone(), config.catalog_cache_ttl);
        let checkout = Checkout::new(store.clone(), catalog.clone(), config.delivery);
        let profile = ProfileService::new(store.clone());
        let admin = AdminService::new(store.clone(), catalog.clone(), auth.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                auth,
                catalog,
                checkout,
                profile,
                admin,
            }),
        }
    }

    /// Create state backed by the JSON file at `config.data_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub async fn open(config: StorefrontConfig) -> Result<Self, StoreError> {
        let store = FileStore::open(&config.data_path).await?;
        Ok(Self::new(config, Arc::new(store)))
    }

    /// A fresh, signed-out session using the configured sync policy and
    /// delivery rates.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::with_config(self.inner.store.clone(), &self.inner.config)
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a handle to the document store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }

    #[must_use]
    pub fn profile(&self) -> &ProfileService {
        &self.inner.profile
    }

    #[must_use]
    pub fn admin(&self) -> &AdminService {
        &self.inner.admin
    }
}
