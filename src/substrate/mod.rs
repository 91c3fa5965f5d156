//! Key-value substrate backends.
//!
//! The graph engine never talks to a database directly. Everything it
//! persists goes through [`KvSubstrate`]: single-key reads and writes plus
//! atomic list operations on one field of one record. There is no
//! cross-key transaction in this contract.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Fields, Value};

/// Address of a single record: `(namespace, collection, key)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    /// Top-level namespace (database / keyspace).
    pub namespace: String,
    /// Collection (set / table) inside the namespace.
    pub collection: String,
    /// Record key inside the collection.
    pub key: String,
}

impl RecordKey {
    /// Create a new record key.
    pub fn new(
        namespace: impl Into<String>,
        collection: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            collection: collection.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.collection, self.key)
    }
}

/// Error type for substrate operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubstrateError {
    /// Record does not exist.
    #[error("Record not found: {0}")]
    NotFound(RecordKey),
    /// Substrate could not be reached. Transient; callers may retry.
    #[error("Substrate unavailable: {0}")]
    Unavailable(String),
    /// A list operation targeted a field holding a non-list value.
    #[error("Field {field} of {key} is not a list")]
    TypeMismatch {
        /// Record addressed.
        key: RecordKey,
        /// Offending field.
        field: String,
    },
    /// Any other backend failure.
    #[error("Substrate error: {0}")]
    Backend(String),
}

impl SubstrateError {
    /// True for errors that indicate the substrate was unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Trait for key-value substrate backends.
///
/// Every method is atomic with respect to the single record it addresses.
/// Implementations must make concurrent [`append_to_list`] calls on the same
/// record and field lossless: both values end up in the list, in some order.
///
/// [`append_to_list`]: KvSubstrate::append_to_list
#[async_trait]
pub trait KvSubstrate: Send + Sync {
    /// Fetch a record. Fails with [`SubstrateError::NotFound`] if absent.
    async fn get(&self, key: &RecordKey) -> Result<Fields, SubstrateError>;

    /// Insert or fully replace a record.
    async fn put(&self, key: &RecordKey, fields: Fields) -> Result<(), SubstrateError>;

    /// Delete a record. Returns whether it existed.
    async fn delete(&self, key: &RecordKey) -> Result<bool, SubstrateError>;

    /// Atomically append `value` to the list in `field`.
    ///
    /// Creates the record and/or the field as an empty list first if absent.
    async fn append_to_list(
        &self,
        key: &RecordKey,
        field: &str,
        value: Value,
    ) -> Result<(), SubstrateError>;

    /// Atomically remove every occurrence of `value` from the list in `field`.
    ///
    /// A missing record or field is a no-op.
    async fn remove_from_list(
        &self,
        key: &RecordKey,
        field: &str,
        value: &Value,
    ) -> Result<(), SubstrateError>;

    /// All records of a collection whose key starts with `prefix`, ordered by key.
    async fn scan_prefix(
        &self,
        namespace: &str,
        collection: &str,
        prefix: &str,
    ) -> Result<Vec<(String, Fields)>, SubstrateError>;
}

pub use memory::MemorySubstrate;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresConfig, PostgresSubstrate, KV_TABLE_SCHEMA};
