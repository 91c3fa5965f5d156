//! Record stores layered on a [`KvSubstrate`](crate::substrate::KvSubstrate).
//!
//! Each store owns one collection and knows nothing about the others; the
//! cross-store invariants (endpoints exist, adjacency mirrors edges) are
//! enforced by [`GraphEngine`](crate::engine::GraphEngine). Mutating store
//! methods are crate-internal for that reason; callers get reads only.

pub mod vertex;
pub mod edge;
pub mod adjacency;

use crate::substrate::RecordKey;

/// A `(namespace, collection)` pair records are addressed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Collection {
    /// Namespace.
    pub namespace: String,
    /// Collection name.
    pub name: String,
}

impl Collection {
    /// Create a new collection handle.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Full address of `key` inside this collection.
    pub fn record_key(&self, key: impl Into<String>) -> RecordKey {
        RecordKey::new(self.namespace.clone(), self.name.clone(), key)
    }
}

pub use vertex::VertexStore;
pub use edge::EdgeStore;
pub use adjacency::{AdjacencyIndex, AdjacencyList};
