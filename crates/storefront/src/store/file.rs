//! Document store persisted as a single JSON file.
//!
//! This is the offline/mock binding: the whole document map is loaded on
//! open and rewritten after every successful mutation. Writes go to a
//! sibling temp file first and are renamed into place, so a crash leaves
//! either the old or the new snapshot on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use super::documents::Documents;
use super::{
    ArrayOp, CollectionPath, Document, DocumentPath, DocumentStore, Fields, SetOptions,
    StoreError, WriteBatch,
};

/// A document store backed by a JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    docs: RwLock<Documents>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file exists but cannot be read, or
    /// `StoreError::Serialization` if it is not a valid snapshot.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let docs = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Documents::default(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Data file does not exist yet, starting empty");
                Documents::default()
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(documents = docs.len(), "Loaded data file");

        Ok(Self {
            path,
            docs: RwLock::new(docs),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutation` and persist the result. The in-memory map is only
    /// replaced once the snapshot has been written.
    async fn mutate<F>(&self, mutation: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Documents) -> Result<(), StoreError> + Send,
    {
        let mut guard = self.docs.write().await;
        let mut next = guard.clone();
        mutation(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn persist(&self, docs: &Documents) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(docs)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(documents = docs.len(), "Persisted data file");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.read().await.get(path))
    }

    async fn set(
        &self,
        path: &DocumentPath,
        data: Fields,
        options: SetOptions,
    ) -> Result<(), StoreError> {
        self.mutate(|docs| {
            docs.set(path, data, options);
            Ok(())
        })
        .await
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.mutate(|docs| {
            docs.delete(path);
            Ok(())
        })
        .await
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        Ok(self.docs.read().await.list(collection))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.mutate(|docs| {
            docs.commit(batch);
            Ok(())
        })
        .await
    }

    async fn update_array(
        &self,
        path: &DocumentPath,
        field: &str,
        op: ArrayOp,
    ) -> Result<(), StoreError> {
        self.mutate(|docs| docs.update_array(path, field, op)).await
    }

    async fn increment(
        &self,
        path: &DocumentPath,
        field: &str,
        delta: i64,
    ) -> Result<(), StoreError> {
        self.mutate(|docs| docs.increment(path, field, delta)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::encode;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("techshop-{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_reopen_sees_previous_writes() {
        let file = temp_path();
        let path = DocumentPath::parse("users/u1").unwrap();

        {
            let store = FileStore::open(&file).await.unwrap();
            store
                .set(
                    &path,
                    encode(&json!({"name": "Анна", "favoriteProducts": []})).unwrap(),
                    SetOptions::REPLACE,
                )
                .await
                .unwrap();
            store
                .update_array(&path, "favoriteProducts", ArrayOp::Add(json!("p7")))
                .await
                .unwrap();
        }

        let reopened = FileStore::open(&file).await.unwrap();
        let doc = reopened.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.field("favoriteProducts"), Some(&json!(["p7"])));

        tokio::fs::remove_file(&file).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_update_leaves_snapshot_untouched() {
        let file = temp_path();
        let store = FileStore::open(&file).await.unwrap();
        let missing = DocumentPath::parse("products/none").unwrap();

        assert!(store.increment(&missing, "stockQuantity", -1).await.is_err());
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let store = FileStore::open(temp_path()).await.unwrap();
        let users = CollectionPath::parse("users").unwrap();
        assert!(store.list(&users).await.unwrap().is_empty());
    }
}
