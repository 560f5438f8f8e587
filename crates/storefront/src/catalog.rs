//! Catalog query layer.
//!
//! Whole collections are fetched from the store and cached with `moka`;
//! all searching and sorting happens in memory. Orders are never cached.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use techshop_core::{Brand, BrandId, Category, CategoryId, Order, Product, ProductId, UserId};

use crate::store::{CollectionPath, DocumentStore, StoreError, paths};

/// Default lifetime of cached collections.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache key for catalog collections.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Products,
    Categories,
    Brands,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<Category>>),
    Brands(Arc<Vec<Brand>>),
}

// =============================================================================
// Filters
// =============================================================================

/// Result ordering for product searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    PriceAsc,
    PriceDesc,
    /// Most reviewed first.
    Popularity,
    Rating,
    #[default]
    Newest,
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "popularity" => Ok(Self::Popularity),
            "rating" => Ok(Self::Rating),
            "newest" => Ok(Self::Newest),
            _ => Err(format!("invalid sort order: {s}")),
        }
    }
}

/// Search criteria for the product list. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilters {
    /// Case-insensitive substring of the name or description.
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    /// Inclusive lower price bound.
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound.
    pub max_price: Option<Decimal>,
    pub sort_by: SortBy,
}

impl ProductFilters {
    /// Whether a single product passes every filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(query) = self.search.as_deref().map(str::trim)
            && !query.is_empty()
        {
            let query = query.to_lowercase();
            if !product.name.to_lowercase().contains(&query)
                && !product.description.to_lowercase().contains(&query)
            {
                return false;
            }
        }
        if self
            .category_id
            .as_ref()
            .is_some_and(|id| id != &product.category_id)
        {
            return false;
        }
        if self.brand_id.as_ref().is_some_and(|id| id != &product.brand_id) {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }

    /// Filter and sort `products`. Sorting is stable.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let mut result: Vec<Product> = products
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        sort_products(&mut result, self.sort_by);
        result
    }
}

fn sort_products(products: &mut [Product], sort_by: SortBy) {
    match sort_by {
        SortBy::PriceAsc => products.sort_by(|a, b| a.price.cmp(&b.price)),
        SortBy::PriceDesc => products.sort_by(|a, b| b.price.cmp(&a.price)),
        SortBy::Popularity => products.sort_by_key(|p| Reverse(p.reviews_count)),
        SortBy::Rating => products.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        SortBy::Newest => products.sort_by_key(|p| Reverse(p.created_at)),
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Read access to products, categories, brands and orders.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    store: Arc<dyn DocumentStore>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("store", &self.inner.store)
            .field("cached", &self.inner.cache.entry_count())
            .finish()
    }
}

impl Catalog {
    /// Create a catalog whose collections are cached for `ttl`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(16).time_to_live(ttl).build();
        Self {
            inner: Arc::new(CatalogInner { store, cache }),
        }
    }

    /// Every product, including archived and inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the collection cannot be listed.
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, StoreError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }
        let products = Arc::new(self.fetch::<Product>(&paths::products()).await?);
        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the collection cannot be listed.
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, StoreError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }
        let categories = Arc::new(self.fetch::<Category>(&paths::categories()).await?);
        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the collection cannot be listed.
    pub async fn brands(&self) -> Result<Arc<Vec<Brand>>, StoreError> {
        if let Some(CacheValue::Brands(brands)) = self.inner.cache.get(&CacheKey::Brands).await {
            debug!("Cache hit for brands");
            return Ok(brands);
        }
        let brands = Arc::new(self.fetch::<Brand>(&paths::brands()).await?);
        self.inner
            .cache
            .insert(CacheKey::Brands, CacheValue::Brands(Arc::clone(&brands)))
            .await;
        Ok(brands)
    }

    /// Look up one product by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the collection cannot be listed.
    pub async fn product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.products().await?.iter().find(|p| &p.id == id).cloned())
    }

    /// Products shown to customers that pass `filters`.
    ///
    /// Archived and inactive products are never returned.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the collection cannot be listed.
    #[instrument(skip(self))]
    pub async fn search(&self, filters: &ProductFilters) -> Result<Vec<Product>, StoreError> {
        let visible: Vec<Product> = self
            .products()
            .await?
            .iter()
            .filter(|p| p.is_active && !p.is_archived)
            .cloned()
            .collect();
        let result = filters.apply(&visible);
        debug!(matched = result.len(), "Product search");
        Ok(result)
    }

    /// The `limit` most recently added products.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the collection cannot be listed.
    pub async fn latest(&self, limit: usize) -> Result<Vec<Product>, StoreError> {
        let mut products = self.search(&ProductFilters::default()).await?;
        products.truncate(limit);
        Ok(products)
    }

    /// Up to `limit` discounted products, in store order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the collection cannot be listed.
    pub async fn recommended(&self, limit: usize) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .products()
            .await?
            .iter()
            .filter(|p| p.is_active && !p.is_archived && p.discount.is_some_and(|d| d > 0))
            .take(limit)
            .cloned()
            .collect())
    }

    /// The products behind a list of favorite ids, skipping unknown ids.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the collection cannot be listed.
    pub async fn favorites_of(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let products = self.products().await?;
        Ok(ids
            .iter()
            .filter_map(|id| products.iter().find(|p| &p.id == id).cloned())
            .collect())
    }

    /// Every order, newest first. Not cached.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the collection cannot be listed.
    pub async fn orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut orders = self.fetch::<Order>(&paths::orders()).await?;
        orders.sort_by_key(|o| Reverse(o.created_at));
        Ok(orders)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the collection cannot be listed.
    pub async fn orders_for(&self, user_id: &UserId) -> Result<Vec<Order>, StoreError> {
        let mut orders = self.orders().await?;
        orders.retain(|o| &o.user_id == user_id);
        Ok(orders)
    }

    /// Drop every cached collection so the next read refetches.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
        debug!("Catalog cache invalidated");
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<T>, StoreError> {
        let documents = self.inner.store.list(collection).await?;
        Ok(documents
            .into_iter()
            .filter_map(|doc| match doc.decode::<T>() {
                Ok(value) => Some(value),
                Err(error) => {
                    tracing::warn!(
                        collection = %collection,
                        id = %doc.id,
                        error = %error,
                        "Skipping malformed document"
                    );
                    None
                }
            })
            .collect())
    }
}
