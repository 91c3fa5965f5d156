//! Adjacency index: per (vertex, edge type, direction) neighbor lists.
//!
//! Each triple is its own record in the adjacency collection, keyed by
//! [`keys::adjacency_key`], holding one list field. Appends go through the
//! substrate's atomic list append, so concurrent writers to the same triple
//! never lose entries. Readers collapse duplicates left behind by racing
//! re-adds of the same edge.

use std::sync::Arc;

use crate::codec;
use crate::error::GraphResult;
use crate::keys;
use crate::substrate::{KvSubstrate, SubstrateError};
use crate::types::{Direction, Value};
use super::Collection;

/// One stored adjacency list, as returned by scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyList {
    /// Owning vertex.
    pub vertex_id: String,
    /// Edge type.
    pub edge_type: String,
    /// Direction relative to `vertex_id`.
    pub direction: Direction,
    /// Neighbor ids, de-duplicated, insertion order.
    pub ids: Vec<String>,
    /// Ids stored more than once.
    pub duplicates: Vec<String>,
}

impl AdjacencyList {
    /// True when the stored list holds repeated ids.
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    /// True when the record exists but holds no ids.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Neighbor index kept alongside the edge store.
pub struct AdjacencyIndex<S> {
    substrate: Arc<S>,
    collection: Collection,
}

impl<S: KvSubstrate> AdjacencyIndex<S> {
    /// Create an adjacency index over `collection`.
    pub fn new(substrate: Arc<S>, collection: Collection) -> Self {
        Self { substrate, collection }
    }

    /// Collection this index writes to.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Atomically append `neighbor_id` to the list for the triple.
    pub(crate) async fn append_neighbor(
        &self,
        vertex_id: &str,
        edge_type: &str,
        direction: Direction,
        neighbor_id: &str,
    ) -> GraphResult<()> {
        let key = self
            .collection
            .record_key(keys::adjacency_key(vertex_id, edge_type, direction));
        self.substrate
            .append_to_list(&key, codec::FIELD_IDS, Value::from(neighbor_id))
            .await?;
        Ok(())
    }

    /// Neighbor ids for the triple in insertion order, without duplicates.
    ///
    /// A triple that was never written yields an empty list.
    pub async fn list_neighbors(
        &self,
        vertex_id: &str,
        edge_type: &str,
        direction: Direction,
    ) -> GraphResult<Vec<String>> {
        let key = self
            .collection
            .record_key(keys::adjacency_key(vertex_id, edge_type, direction));
        match self.substrate.get(&key).await {
            Ok(fields) => Ok(codec::decode_id_list(&fields)?),
            Err(SubstrateError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `neighbor_id` is in the list for the triple.
    pub async fn contains(
        &self,
        vertex_id: &str,
        edge_type: &str,
        direction: Direction,
        neighbor_id: &str,
    ) -> GraphResult<bool> {
        Ok(self
            .list_neighbors(vertex_id, edge_type, direction)
            .await?
            .iter()
            .any(|id| id == neighbor_id))
    }

    /// Atomically remove every occurrence of `neighbor_id` from the triple's list.
    ///
    /// The record stays behind when this empties it. Deleting it here could
    /// drop an id appended concurrently; [`GraphEngine::reconcile`] sweeps
    /// empty lists instead.
    ///
    /// [`GraphEngine::reconcile`]: crate::GraphEngine::reconcile
    pub(crate) async fn remove_neighbor(
        &self,
        vertex_id: &str,
        edge_type: &str,
        direction: Direction,
        neighbor_id: &str,
    ) -> GraphResult<()> {
        let key = self
            .collection
            .record_key(keys::adjacency_key(vertex_id, edge_type, direction));
        self.substrate
            .remove_from_list(&key, codec::FIELD_IDS, &Value::from(neighbor_id))
            .await?;
        Ok(())
    }

    /// Delete the whole list for the triple.
    pub(crate) async fn drop_list(
        &self,
        vertex_id: &str,
        edge_type: &str,
        direction: Direction,
    ) -> GraphResult<bool> {
        let key = self
            .collection
            .record_key(keys::adjacency_key(vertex_id, edge_type, direction));
        Ok(self.substrate.delete(&key).await?)
    }

    /// Every list owned by `vertex_id`, across all edge types and directions.
    pub async fn lists_for_vertex(&self, vertex_id: &str) -> GraphResult<Vec<AdjacencyList>> {
        self.scan(&keys::adjacency_prefix(vertex_id)).await
    }

    /// Every list in the index.
    pub async fn scan_lists(&self) -> GraphResult<Vec<AdjacencyList>> {
        self.scan("").await
    }

    async fn scan(&self, prefix: &str) -> GraphResult<Vec<AdjacencyList>> {
        let rows = self
            .substrate
            .scan_prefix(&self.collection.namespace, &self.collection.name, prefix)
            .await?;

        let mut lists = Vec::with_capacity(rows.len());
        for (raw_key, fields) in rows {
            let Some((vertex_id, edge_type, direction)) = keys::parse_adjacency_key(&raw_key) else {
                tracing::warn!(key = %raw_key, "Skipping malformed adjacency key");
                continue;
            };
            let raw = codec::decode_raw_id_list(&fields)?;
            let mut ids: Vec<String> = Vec::with_capacity(raw.len());
            let mut duplicates: Vec<String> = Vec::new();
            for id in raw {
                if !ids.contains(&id) {
                    ids.push(id);
                } else if !duplicates.contains(&id) {
                    duplicates.push(id);
                }
            }
            lists.push(AdjacencyList {
                vertex_id,
                edge_type,
                direction,
                ids,
                duplicates,
            });
        }
        Ok(lists)
    }
}
