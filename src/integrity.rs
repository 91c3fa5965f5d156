//! Integrity checking and reconciliation of the adjacency mirror.
//!
//! Edge records are the source of truth; adjacency lists are derived from
//! them. A crashed or failed write can leave the two out of step (see
//! [`GraphError::PartialIndex`](crate::error::GraphError::PartialIndex)),
//! and these scans find and repair that.
//!
//! Both operations read whole collections. Run them out of band, while no
//! writers are active.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::engine::GraphEngine;
use crate::error::GraphResult;
use crate::store::AdjacencyList;
use crate::substrate::KvSubstrate;
use crate::types::{Direction, EdgeKey, IndexState};

/// One id inside one adjacency list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdjacencyEntry {
    /// Owning vertex.
    pub vertex_id: String,
    /// Edge type.
    pub edge_type: String,
    /// Direction relative to `vertex_id`.
    pub direction: Direction,
    /// Id stored in the list.
    pub neighbor_id: String,
}

impl AdjacencyEntry {
    fn new(vertex_id: &str, edge_type: &str, direction: Direction, neighbor_id: &str) -> Self {
        Self {
            vertex_id: vertex_id.to_string(),
            edge_type: edge_type.to_string(),
            direction,
            neighbor_id: neighbor_id.to_string(),
        }
    }

    /// Entry `direction` of `edge` must produce.
    pub fn for_edge(edge: &EdgeKey, direction: Direction) -> Self {
        Self::new(
            edge.endpoint(direction),
            &edge.edge_type,
            direction,
            edge.neighbor(direction),
        )
    }

    /// Edge this entry claims to mirror.
    pub fn edge_key(&self) -> EdgeKey {
        match self.direction {
            Direction::Out => EdgeKey::new(&self.vertex_id, &self.edge_type, &self.neighbor_id),
            Direction::In => EdgeKey::new(&self.neighbor_id, &self.edge_type, &self.vertex_id),
        }
    }
}

/// Edge whose adjacency mirror is incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialEdge {
    /// Edge record key.
    pub edge: EdgeKey,
    /// Sides actually present.
    pub state: IndexState,
}

/// Result of [`GraphEngine::check_integrity`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Edge records scanned.
    pub edges_checked: usize,
    /// Adjacency lists scanned.
    pub lists_checked: usize,
    /// Edges not `FullyIndexed`.
    pub partial: Vec<PartialEdge>,
    /// Edges with an endpoint vertex that no longer exists.
    pub orphaned: Vec<EdgeKey>,
    /// Adjacency entries with no edge record behind them.
    pub dangling: Vec<AdjacencyEntry>,
    /// Adjacency entries stored more than once.
    pub duplicated: Vec<AdjacencyEntry>,
    /// Lists whose record holds no ids. Harmless to readers.
    pub empty_lists: usize,
}

impl IntegrityReport {
    /// True when every edge is fully mirrored and nothing else is stored.
    ///
    /// Empty lists do not count against consistency.
    pub fn is_consistent(&self) -> bool {
        self.partial.is_empty()
            && self.orphaned.is_empty()
            && self.dangling.is_empty()
            && self.duplicated.is_empty()
    }
}

/// Result of [`GraphEngine::reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Edge records scanned.
    pub edges_scanned: usize,
    /// Orphaned edges deleted.
    pub orphans_removed: usize,
    /// Missing adjacency entries appended.
    pub appended: usize,
    /// Dangling adjacency entries removed.
    pub pruned: usize,
    /// Duplicated entries collapsed to one.
    pub deduplicated: usize,
    /// List records deleted because they held no ids.
    pub empty_dropped: usize,
}

impl ReconcileReport {
    /// Total number of repairs made.
    pub fn changes(&self) -> usize {
        self.orphans_removed + self.appended + self.pruned + self.deduplicated + self.empty_dropped
    }
}

impl<S: KvSubstrate> GraphEngine<S> {
    /// Compare edge records with the adjacency lists without changing anything.
    pub async fn check_integrity(&self) -> GraphResult<IntegrityReport> {
        let edges = self.edges().scan_edges().await?;
        let lists = self.adjacency().scan_lists().await?;
        let present = entries(&lists);

        let mut report = IntegrityReport {
            edges_checked: edges.len(),
            lists_checked: lists.len(),
            ..IntegrityReport::default()
        };

        let mut vertex_cache = HashMap::new();
        let mut live: HashSet<EdgeKey> = HashSet::with_capacity(edges.len());
        for edge in &edges {
            let key = &edge.key;
            if !self.endpoints_exist(key, &mut vertex_cache).await? {
                report.orphaned.push(key.clone());
            }

            let state = IndexState::from_sides(
                present.contains(&AdjacencyEntry::for_edge(key, Direction::Out)),
                present.contains(&AdjacencyEntry::for_edge(key, Direction::In)),
            );
            if !state.is_complete() {
                report.partial.push(PartialEdge {
                    edge: key.clone(),
                    state,
                });
            }
            live.insert(key.clone());
        }

        for list in &lists {
            if list.is_empty() {
                report.empty_lists += 1;
            }
            for id in &list.ids {
                let entry = AdjacencyEntry::new(&list.vertex_id, &list.edge_type, list.direction, id);
                if !live.contains(&entry.edge_key()) {
                    report.dangling.push(entry);
                }
            }
            for id in &list.duplicates {
                report.duplicated.push(AdjacencyEntry::new(
                    &list.vertex_id,
                    &list.edge_type,
                    list.direction,
                    id,
                ));
            }
        }

        if !report.is_consistent() {
            tracing::warn!(
                partial = report.partial.len(),
                orphaned = report.orphaned.len(),
                dangling = report.dangling.len(),
                duplicated = report.duplicated.len(),
                "Graph integrity check found inconsistencies"
            );
        }
        Ok(report)
    }

    /// Re-derive the adjacency index from the edge records.
    ///
    /// 1. Delete edges whose endpoint vertex is gone
    /// 2. Remove adjacency entries with no live edge behind them
    /// 3. Collapse duplicated entries (the survivor moves to the list's end)
    /// 4. Append any side a live edge is missing
    /// 5. Delete list records left holding no ids
    ///
    /// Running it again on an unchanged graph makes no changes.
    pub async fn reconcile(&self) -> GraphResult<ReconcileReport> {
        let edges = self.edges().scan_edges().await?;
        let mut report = ReconcileReport {
            edges_scanned: edges.len(),
            ..ReconcileReport::default()
        };

        let mut vertex_cache = HashMap::new();
        let mut live: HashSet<EdgeKey> = HashSet::with_capacity(edges.len());
        for edge in edges {
            if self.endpoints_exist(&edge.key, &mut vertex_cache).await? {
                live.insert(edge.key);
            } else {
                tracing::debug!(edge = %edge.key, "Deleting orphaned edge");
                self.edges().delete_edge(&edge.key).await?;
                report.orphans_removed += 1;
            }
        }

        let lists = self.adjacency().scan_lists().await?;
        let mut present: HashSet<AdjacencyEntry> = HashSet::new();
        for list in &lists {
            for id in &list.ids {
                let entry = AdjacencyEntry::new(&list.vertex_id, &list.edge_type, list.direction, id);
                if !live.contains(&entry.edge_key()) {
                    self.adjacency()
                        .remove_neighbor(&list.vertex_id, &list.edge_type, list.direction, id)
                        .await?;
                    report.pruned += 1;
                    continue;
                }
                if list.duplicates.contains(id) {
                    self.adjacency()
                        .remove_neighbor(&list.vertex_id, &list.edge_type, list.direction, id)
                        .await?;
                    self.adjacency()
                        .append_neighbor(&list.vertex_id, &list.edge_type, list.direction, id)
                        .await?;
                    report.deduplicated += 1;
                }
                present.insert(entry);
            }
        }

        let mut live: Vec<EdgeKey> = live.into_iter().collect();
        live.sort();
        for key in &live {
            for direction in [Direction::Out, Direction::In] {
                let entry = AdjacencyEntry::for_edge(key, direction);
                if present.contains(&entry) {
                    continue;
                }
                self.adjacency()
                    .append_neighbor(&entry.vertex_id, &entry.edge_type, direction, &entry.neighbor_id)
                    .await?;
                report.appended += 1;
            }
        }

        for list in self.adjacency().scan_lists().await? {
            if list.is_empty()
                && self
                    .adjacency()
                    .drop_list(&list.vertex_id, &list.edge_type, list.direction)
                    .await?
            {
                report.empty_dropped += 1;
            }
        }

        tracing::info!(
            edges_scanned = report.edges_scanned,
            orphans_removed = report.orphans_removed,
            appended = report.appended,
            pruned = report.pruned,
            deduplicated = report.deduplicated,
            empty_dropped = report.empty_dropped,
            "Reconciliation complete"
        );
        Ok(report)
    }

    async fn endpoints_exist(
        &self,
        key: &EdgeKey,
        cache: &mut HashMap<String, bool>,
    ) -> GraphResult<bool> {
        for id in [&key.from, &key.to] {
            let exists = match cache.get(id) {
                Some(exists) => *exists,
                None => {
                    let exists = self.vertices().exists(id).await?;
                    cache.insert(id.clone(), exists);
                    exists
                }
            };
            if !exists {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn entries(lists: &[AdjacencyList]) -> HashSet<AdjacencyEntry> {
    lists
        .iter()
        .flat_map(|list| {
            list.ids.iter().map(move |id| {
                AdjacencyEntry::new(&list.vertex_id, &list.edge_type, list.direction, id)
            })
        })
        .collect()
}
