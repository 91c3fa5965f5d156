//! Edge store: existence, endpoints, type and properties of edges.

use std::sync::Arc;

use crate::codec;
use crate::error::{GraphError, GraphResult};
use crate::keys;
use crate::substrate::{KvSubstrate, SubstrateError};
use crate::types::{EdgeKey, EdgeRecord};
use super::Collection;

/// CRUD for edge records keyed by `(from, edge_type, to)`.
///
/// Endpoint existence is not checked here, so writes are crate-internal and
/// only reachable through [`GraphEngine::add_edge`](crate::GraphEngine::add_edge).
/// The public surface is read-only:
///
/// ```compile_fail
/// # use graphkv::{EdgeKey, EdgeRecord, GraphEngine, MemorySubstrate, Properties};
/// # async fn write(engine: &GraphEngine<MemorySubstrate>) {
/// let edge = EdgeRecord::new(EdgeKey::new("ghost", "KNOWS", "nobody"), Properties::new());
/// engine.edges().put_edge(&edge).await.unwrap();
/// # }
/// ```
pub struct EdgeStore<S> {
    substrate: Arc<S>,
    collection: Collection,
}

impl<S: KvSubstrate> EdgeStore<S> {
    /// Create an edge store over `collection`.
    pub fn new(substrate: Arc<S>, collection: Collection) -> Self {
        Self { substrate, collection }
    }

    /// Collection this store writes to.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Write an edge record, overwriting the properties of an existing one.
    pub(crate) async fn put_edge(&self, edge: &EdgeRecord) -> GraphResult<()> {
        codec::validate_properties(&edge.properties)?;
        let key = self.collection.record_key(keys::edge_key(&edge.key));
        self.substrate.put(&key, codec::encode_edge(edge)).await?;
        Ok(())
    }

    /// Fetch an edge. Fails with `NotFound` if absent.
    pub async fn get_edge(&self, edge: &EdgeKey) -> GraphResult<EdgeRecord> {
        self.find_edge(edge)
            .await?
            .ok_or_else(|| GraphError::edge_not_found(edge))
    }

    /// Fetch an edge, `None` if absent.
    pub async fn find_edge(&self, edge: &EdgeKey) -> GraphResult<Option<EdgeRecord>> {
        let key = self.collection.record_key(keys::edge_key(edge));
        match self.substrate.get(&key).await {
            Ok(fields) => Ok(Some(codec::decode_edge(&fields)?)),
            Err(SubstrateError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete an edge record. Returns whether it existed.
    pub(crate) async fn delete_edge(&self, edge: &EdgeKey) -> GraphResult<bool> {
        let key = self.collection.record_key(keys::edge_key(edge));
        Ok(self.substrate.delete(&key).await?)
    }

    /// Every edge record in the collection, ordered by key.
    pub async fn scan_edges(&self) -> GraphResult<Vec<EdgeRecord>> {
        let rows = self
            .substrate
            .scan_prefix(&self.collection.namespace, &self.collection.name, "")
            .await?;
        rows.iter()
            .map(|(_, fields)| codec::decode_edge(fields).map_err(GraphError::from))
            .collect()
    }
}
