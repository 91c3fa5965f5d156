//! Graph engine: the operation surface over the three stores.
//!
//! The engine enforces the cross-store invariants the stores cannot see on
//! their own: edges only connect existing vertices, and every edge record is
//! mirrored by an entry in the `from` vertex's out-list and the `to`
//! vertex's in-list. There is no transaction spanning these writes, so the
//! write order is fixed and any gap is reported as
//! [`GraphError::PartialIndex`] rather than hidden.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::config::GraphConfig;
use crate::error::{GraphError, GraphResult};
use crate::keys;
use crate::store::{AdjacencyIndex, Collection, EdgeStore, VertexStore};
use crate::substrate::KvSubstrate;
use crate::traversal::Traversal;
use crate::types::{Direction, EdgeKey, EdgeRecord, IndexState, Properties, VertexRecord};

/// Whether `add_edge` created a new edge or rewrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteKind {
    /// No record existed before.
    Created,
    /// Properties of an existing edge were replaced.
    Updated,
}

/// Outcome of a successful `add_edge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeWrite {
    /// Edge written.
    pub key: EdgeKey,
    /// Created or updated.
    pub kind: WriteKind,
    /// Index state after the write. Always `FullyIndexed` on success.
    pub state: IndexState,
}

impl EdgeWrite {
    /// True when the edge did not exist before.
    pub fn is_created(&self) -> bool {
        self.kind == WriteKind::Created
    }
}

/// Hydrated neighbors of a vertex.
///
/// Ids whose vertex record is gone are reported in `missing` instead of
/// failing the whole read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighbors {
    /// Neighbor vertices in adjacency order.
    pub vertices: Vec<VertexRecord>,
    /// Adjacency ids with no vertex record.
    pub missing: Vec<String>,
}

impl Neighbors {
    /// True when at least one neighbor could not be hydrated.
    pub fn is_degraded(&self) -> bool {
        !self.missing.is_empty()
    }

    /// Number of hydrated neighbors.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True when no neighbor was hydrated.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Ids of the hydrated neighbors.
    pub fn ids(&self) -> Vec<&str> {
        self.vertices.iter().map(|v| v.id.as_str()).collect()
    }
}

/// Property graph over a key-value substrate.
///
/// Cheap to share: wrap in `Arc` and call from any number of tasks. The
/// engine holds no locks of its own; per-key atomicity comes from the
/// substrate.
///
/// ## Edge write order
///
/// 1. Check both endpoints exist (nothing is written otherwise)
/// 2. Write the edge record
/// 3. Append `to` to the `(from, type, out)` list
/// 4. Append `from` to the `(to, type, in)` list
///
/// Removal runs the mirror image: adjacency first, record last.
pub struct GraphEngine<S> {
    config: GraphConfig,
    vertices: VertexStore<S>,
    edges: EdgeStore<S>,
    adjacency: AdjacencyIndex<S>,
}

impl<S: KvSubstrate> GraphEngine<S> {
    /// Create an engine over `substrate` using the collections in `config`.
    pub fn new(substrate: Arc<S>, config: GraphConfig) -> GraphResult<Self> {
        config.validate()?;

        let ns = &config.namespace;
        let vertices = VertexStore::new(
            substrate.clone(),
            Collection::new(ns.clone(), config.vertex_collection.clone()),
        );
        let edges = EdgeStore::new(
            substrate.clone(),
            Collection::new(ns.clone(), config.edge_collection.clone()),
        );
        let adjacency = AdjacencyIndex::new(
            substrate,
            Collection::new(ns.clone(), config.adjacency_collection.clone()),
        );

        tracing::debug!(namespace = %ns, "Graph engine ready");

        Ok(Self {
            config,
            vertices,
            edges,
            adjacency,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Underlying vertex store.
    pub fn vertices(&self) -> &VertexStore<S> {
        &self.vertices
    }

    /// Underlying edge store.
    pub fn edges(&self) -> &EdgeStore<S> {
        &self.edges
    }

    /// Underlying adjacency index.
    pub fn adjacency(&self) -> &AdjacencyIndex<S> {
        &self.adjacency
    }

    // =========================================================================
    // Vertices
    // =========================================================================

    /// Create or replace a vertex. Adjacency is untouched.
    pub async fn add_vertex(
        &self,
        id: &str,
        vertex_type: &str,
        properties: Properties,
    ) -> GraphResult<VertexRecord> {
        keys::validate_vertex_id(id)?;
        if vertex_type.is_empty() {
            return Err(GraphError::InvalidInput(
                "Vertex type must not be empty".to_string(),
            ));
        }

        let vertex = VertexRecord::new(id, vertex_type, properties);
        self.vertices.put_vertex(&vertex).await?;

        tracing::debug!(vertex_id = %id, vertex_type = %vertex_type, "Wrote vertex");
        Ok(vertex)
    }

    /// Fetch a vertex. Fails with `NotFound` if absent.
    pub async fn get_vertex(&self, id: &str) -> GraphResult<VertexRecord> {
        self.vertices.get_vertex(id).await
    }

    /// Remove a vertex together with every edge incident to it.
    ///
    /// Incident edges are found through the vertex's own adjacency lists, so
    /// an edge whose side on this vertex was never indexed is left for
    /// reconciliation. Returns the number of edge records removed.
    pub async fn remove_vertex(&self, id: &str) -> GraphResult<usize> {
        keys::validate_vertex_id(id)?;
        self.vertices.get_vertex(id).await?;

        let lists = self.adjacency.lists_for_vertex(id).await?;
        let mut removed = 0;
        for list in &lists {
            for neighbor in &list.ids {
                let key = match list.direction {
                    Direction::Out => EdgeKey::new(id, list.edge_type.as_str(), neighbor.as_str()),
                    Direction::In => EdgeKey::new(neighbor.as_str(), list.edge_type.as_str(), id),
                };
                if self.unlink_edge(&key).await? {
                    removed += 1;
                }
            }
        }
        for list in &lists {
            self.adjacency
                .drop_list(id, &list.edge_type, list.direction)
                .await?;
        }
        self.vertices.delete_vertex(id).await?;

        tracing::debug!(vertex_id = %id, edges_removed = removed, "Removed vertex");
        Ok(removed)
    }

    // =========================================================================
    // Edges
    // =========================================================================

    /// Create an edge, or replace the properties of an existing one.
    ///
    /// Both endpoints must exist. A repeated call leaves exactly one entry
    /// per adjacency list and completes an index left partial by an earlier
    /// failure. If an adjacency append fails the edge record stays written
    /// and [`GraphError::PartialIndex`] reports the state reached.
    pub async fn add_edge(
        &self,
        from: &str,
        edge_type: &str,
        to: &str,
        properties: Properties,
    ) -> GraphResult<EdgeWrite> {
        let key = EdgeKey::new(from, edge_type, to);
        keys::validate_edge_key(&key)?;
        codec::validate_properties(&properties)?;
        if key.is_self_loop() && !self.config.allow_self_loops {
            return Err(GraphError::InvalidInput(format!(
                "Self-loop edges are disabled: {}",
                key
            )));
        }

        self.require_endpoint(&key, from).await?;
        if !key.is_self_loop() {
            self.require_endpoint(&key, to).await?;
        }

        let existed = self.edges.find_edge(&key).await?.is_some();
        let mut state = if existed {
            self.index_state(&key).await?
        } else {
            IndexState::Unindexed
        };

        self.edges
            .put_edge(&EdgeRecord::new(key.clone(), properties))
            .await?;

        let mut failure = None;
        for direction in [Direction::Out, Direction::In] {
            if state.has_side(direction) {
                continue;
            }
            let appended = self
                .adjacency
                .append_neighbor(
                    key.endpoint(direction),
                    &key.edge_type,
                    direction,
                    key.neighbor(direction),
                )
                .await;
            match appended {
                Ok(()) => state = state.with_side(direction),
                Err(e) => {
                    tracing::warn!(edge = %key, direction = %direction, error = %e, "Adjacency append failed");
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(source) = failure {
            tracing::warn!(edge = %key, state = %state, "Edge left partially indexed");
            return Err(GraphError::PartialIndex {
                edge: key,
                state,
                source: Box::new(source),
            });
        }

        let kind = if existed { WriteKind::Updated } else { WriteKind::Created };
        tracing::debug!(edge = %key, kind = ?kind, "Wrote edge");
        Ok(EdgeWrite { key, kind, state })
    }

    /// Fetch an edge. Fails with `NotFound` if absent.
    pub async fn get_edge(&self, from: &str, edge_type: &str, to: &str) -> GraphResult<EdgeRecord> {
        let key = EdgeKey::new(from, edge_type, to);
        keys::validate_edge_key(&key)?;
        self.edges.get_edge(&key).await
    }

    /// How far the adjacency mirror of an existing edge has been written.
    pub async fn edge_index_state(
        &self,
        from: &str,
        edge_type: &str,
        to: &str,
    ) -> GraphResult<IndexState> {
        let key = EdgeKey::new(from, edge_type, to);
        keys::validate_edge_key(&key)?;
        self.edges.get_edge(&key).await?;
        self.index_state(&key).await
    }

    /// Remove an edge: adjacency entries first (out, then in), record last.
    pub async fn remove_edge(&self, from: &str, edge_type: &str, to: &str) -> GraphResult<()> {
        let key = EdgeKey::new(from, edge_type, to);
        keys::validate_edge_key(&key)?;
        self.edges.get_edge(&key).await?;
        self.unlink_edge(&key).await?;

        tracing::debug!(edge = %key, "Removed edge");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Neighbors of `vertex_id` along `edge_type` in `direction`.
    ///
    /// An id whose vertex record no longer exists is skipped and reported in
    /// [`Neighbors::missing`]. A vertex with no list yields an empty result.
    pub async fn get_neighbors(
        &self,
        vertex_id: &str,
        edge_type: &str,
        direction: Direction,
    ) -> GraphResult<Neighbors> {
        keys::validate_vertex_id(vertex_id)?;
        keys::validate_edge_type(edge_type)?;

        let ids = self
            .adjacency
            .list_neighbors(vertex_id, edge_type, direction)
            .await?;

        let mut neighbors = Neighbors::default();
        for id in ids {
            match self.vertices.find_vertex(&id).await? {
                Some(vertex) => neighbors.vertices.push(vertex),
                None => {
                    tracing::warn!(
                        vertex_id = %vertex_id,
                        edge_type = %edge_type,
                        direction = %direction,
                        neighbor_id = %id,
                        "Adjacency entry points at missing vertex"
                    );
                    neighbors.missing.push(id);
                }
            }
        }
        Ok(neighbors)
    }

    /// Breadth-first traversal from `start` along one edge type and direction.
    ///
    /// `start` must exist and is not itself yielded. The returned cursor
    /// reads nothing until polled.
    pub async fn traverse(
        &self,
        start: &str,
        edge_type: &str,
        direction: Direction,
        max_depth: usize,
    ) -> GraphResult<Traversal<'_, S>> {
        keys::validate_vertex_id(start)?;
        keys::validate_edge_type(edge_type)?;
        if !self.vertices.exists(start).await? {
            return Err(GraphError::vertex_not_found(start));
        }
        Ok(Traversal::new(
            &self.adjacency,
            start,
            edge_type,
            direction,
            max_depth,
        ))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn require_endpoint(&self, edge: &EdgeKey, vertex_id: &str) -> GraphResult<()> {
        if self.vertices.exists(vertex_id).await? {
            return Ok(());
        }
        tracing::debug!(edge = %edge, missing = %vertex_id, "Rejected dangling edge");
        Err(GraphError::DanglingReference {
            edge: edge.clone(),
            missing: vertex_id.to_string(),
        })
    }

    pub(crate) async fn index_state(&self, key: &EdgeKey) -> GraphResult<IndexState> {
        let mut state = IndexState::Unindexed;
        for direction in [Direction::Out, Direction::In] {
            let present = self
                .adjacency
                .contains(
                    key.endpoint(direction),
                    &key.edge_type,
                    direction,
                    key.neighbor(direction),
                )
                .await?;
            if present {
                state = state.with_side(direction);
            }
        }
        Ok(state)
    }

    /// Remove both adjacency sides, then the record. The record is kept if
    /// either removal fails. Returns whether a record was deleted.
    pub(crate) async fn unlink_edge(&self, key: &EdgeKey) -> GraphResult<bool> {
        let mut state = self.index_state(key).await?;

        let mut failure = None;
        for direction in [Direction::Out, Direction::In] {
            if !state.has_side(direction) {
                continue;
            }
            let removed = self
                .adjacency
                .remove_neighbor(
                    key.endpoint(direction),
                    &key.edge_type,
                    direction,
                    key.neighbor(direction),
                )
                .await;
            match removed {
                Ok(()) => state = state.without_side(direction),
                Err(e) => {
                    tracing::warn!(edge = %key, direction = %direction, error = %e, "Adjacency removal failed");
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(source) = failure {
            return Err(GraphError::PartialIndex {
                edge: key.clone(),
                state,
                source: Box::new(source),
            });
        }

        self.edges.delete_edge(key).await
    }
}
