//! Document store abstraction.
//!
//! # Architecture
//!
//! The storefront never queries the store directly from screens - the cart,
//! favorites, catalog, checkout and admin layers go through the
//! [`DocumentStore`] trait. The store is treated as a passive mirror of local
//! state, not a transactional source of truth:
//!
//! - Documents are JSON objects addressed by slash-separated paths
//!   (`users/{uid}`, `users/{uid}/cart/{productId}`)
//! - Collections are listed whole; there are no server-side queries
//! - The only multi-document atomicity is [`DocumentStore::commit`]
//!
//! # Bindings
//!
//! - [`MemoryStore`] - process-local, with an offline switch for failure tests
//! - [`FileStore`] - JSON snapshot on disk, used by the CLI

mod documents;
pub mod file;
pub mod memory;
pub mod paths;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use paths::{CollectionPath, DocumentPath};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Top-level fields of a document.
pub type Fields = serde_json::Map<String, Value>;

/// Errors that can occur when talking to a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document does not exist (field-level updates only).
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The store is not reachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A path has the wrong shape for the operation.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A value could not be converted to or from a document.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The value is not a JSON object and cannot be stored as a document.
    #[error("Not a document: {0}")]
    NotAnObject(String),

    /// A field holds a value of the wrong type for the update.
    #[error("Field {field} in {path} is not {expected}")]
    FieldType {
        path: String,
        field: String,
        expected: &'static str,
    },

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored document together with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Last path segment.
    pub id: String,
    /// Document body.
    pub data: Fields,
}

impl Document {
    /// Deserialize the document body into a typed record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }

    /// Read a single field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Serialize a record into document fields.
///
/// # Errors
///
/// Returns `StoreError::NotAnObject` if `value` does not serialize to a JSON
/// object, or `StoreError::Serialization` if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::NotAnObject(other.to_string())),
    }
}

/// Options for [`DocumentStore::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge into an existing document instead of replacing it.
    pub merge: bool,
}

impl SetOptions {
    /// Replace the whole document.
    pub const REPLACE: Self = Self { merge: false };
    /// Merge the given fields into the existing document.
    pub const MERGE: Self = Self { merge: true };
}

/// Element-level update of an array field.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayOp {
    /// Append the value unless it is already present.
    Add(Value),
    /// Remove every occurrence of the value.
    Remove(Value),
}

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        path: DocumentPath,
        data: Fields,
        options: SetOptions,
    },
    Delete {
        path: DocumentPath,
    },
}

/// Aggregates writes that are committed together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Queue a set operation.
    pub fn set(&mut self, path: DocumentPath, data: Fields, options: SetOptions) -> &mut Self {
        self.ops.push(WriteOp::Set {
            path,
            data,
            options,
        });
        self
    }

    /// Queue a delete operation.
    pub fn delete(&mut self, path: DocumentPath) -> &mut Self {
        self.ops.push(WriteOp::Delete { path });
        self
    }

    /// Number of queued writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing has been queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queued writes in order.
    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }
}

/// A document-oriented store.
///
/// All operations are asynchronous; each call is a suspension point for the
/// caller. Implementations must be shareable across tasks.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Fetch a document, `None` if it does not exist.
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError>;

    /// Create or overwrite a document, or merge fields into it.
    async fn set(
        &self,
        path: &DocumentPath,
        data: Fields,
        options: SetOptions,
    ) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError>;

    /// List the direct children of a collection, ordered by id.
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    /// Apply every write in the batch atomically.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Add or remove an element of an array field on an existing document.
    async fn update_array(
        &self,
        path: &DocumentPath,
        field: &str,
        op: ArrayOp,
    ) -> Result<(), StoreError>;

    /// Add `delta` to a numeric field on an existing document.
    async fn increment(&self, path: &DocumentPath, field: &str, delta: i64)
    -> Result<(), StoreError>;
}
