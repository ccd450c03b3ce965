//! Document collection seam
//!
//! The document backend talks to its store only through [`DocumentCollection`].
//! Filters, updates and pipelines are JSON values in the database's query
//! syntax; documents carry their key in `_id`.

use serde_json::Value;
use thiserror::Error;

use crate::errors::{RegistryError, RegistryResult};

pub type CollectionResult<T> = Result<T, CollectionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// Unique key violation on insert
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Connection, timeout or session failure
    #[error("Collection unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the operation
    #[error("Invalid collection operation: {0}")]
    InvalidOperation(String),
}

impl From<CollectionError> for RegistryError {
    fn from(err: CollectionError) -> Self {
        match err {
            CollectionError::DuplicateKey(id) => RegistryError::AasDescriptorAlreadyExists(id),
            other => RegistryError::StorageUnavailable(other.to_string()),
        }
    }
}

/// Update applied by `find_one_and_update`
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Update operator document such as `{"$push": ...}` or `{"$set": ...}`
    Operators(Value),
    /// Aggregation pipeline applied to the matched document
    Pipeline(Vec<Value>),
}

/// Blocking access to one document collection
pub trait DocumentCollection: Send + Sync {
    fn insert_one(&self, document: Value) -> CollectionResult<()>;

    fn find_one(&self, filter: &Value) -> CollectionResult<Option<Value>>;

    /// Replaces the first match and returns the previous document
    fn find_one_and_replace(&self, filter: &Value, replacement: Value)
        -> CollectionResult<Option<Value>>;

    /// Updates the first match and returns the previous document
    fn find_one_and_update(&self, filter: &Value, update: &Update) -> CollectionResult<Option<Value>>;

    /// Returns the number of deleted documents
    fn delete_one(&self, filter: &Value) -> CollectionResult<u64>;

    fn delete_many(&self, filter: &Value) -> CollectionResult<u64>;

    fn count(&self, filter: &Value) -> CollectionResult<u64>;

    fn aggregate(&self, pipeline: &[Value]) -> CollectionResult<Vec<Value>>;

    /// Runs `body` in one transaction. Its effects become visible together
    /// when it returns `Ok`, and are discarded when it returns an error.
    fn transaction(
        &self,
        body: &mut dyn FnMut(&dyn DocumentCollection) -> RegistryResult<()>,
    ) -> RegistryResult<()>;
}
