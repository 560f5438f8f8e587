//! Process-local document store.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::documents::Documents;
use super::{
    ArrayOp, CollectionPath, Document, DocumentPath, DocumentStore, Fields, SetOptions,
    StoreError, WriteBatch,
};

/// A document store held entirely in memory.
///
/// Stands in for the managed backend in tests and embedded use. Calling
/// [`MemoryStore::set_offline`] makes every operation fail with
/// `StoreError::Unavailable` until it is switched back, which is how remote
/// write failures are simulated.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<Documents>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the connection to the backend.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Whether the store currently rejects calls.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Number of stored documents across all collections.
    pub async fn document_count(&self) -> usize {
        self.docs.read().await.len()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.is_offline() {
            return Err(StoreError::Unavailable("memory store is offline".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        self.ensure_online()?;
        Ok(self.docs.read().await.get(path))
    }

    async fn set(
        &self,
        path: &DocumentPath,
        data: Fields,
        options: SetOptions,
    ) -> Result<(), StoreError> {
        self.ensure_online()?;
        self.docs.write().await.set(path, data, options);
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.ensure_online()?;
        self.docs.write().await.delete(path);
        Ok(())
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        self.ensure_online()?;
        Ok(self.docs.read().await.list(collection))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.ensure_online()?;
        tracing::debug!(writes = batch.len(), "Committing batch");
        self.docs.write().await.commit(batch);
        Ok(())
    }

    async fn update_array(
        &self,
        path: &DocumentPath,
        field: &str,
        op: ArrayOp,
    ) -> Result<(), StoreError> {
        self.ensure_online()?;
        self.docs.write().await.update_array(path, field, op)
    }

    async fn increment(
        &self,
        path: &DocumentPath,
        field: &str,
        delta: i64,
    ) -> Result<(), StoreError> {
        self.ensure_online()?;
        self.docs.write().await.increment(path, field, delta)
    }
}
