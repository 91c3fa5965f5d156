//! Bounded breadth-first traversal over the adjacency index.
//!
//! A [`Traversal`] is a cursor: each [`next_layer`](Traversal::next_layer)
//! call expands exactly one BFS layer, which makes layer boundaries the
//! natural cancellation points. Nothing is persisted; a new traversal (or
//! [`restart`](Traversal::restart)) recomputes from scratch.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::store::AdjacencyIndex;
use crate::substrate::KvSubstrate;
use crate::types::Direction;

/// A vertex reached by a traversal and its hop distance from the start.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Visit {
    /// Vertex reached.
    pub vertex_id: String,
    /// Hops from the start vertex (always ≥ 1).
    pub depth: usize,
}

/// Layer-by-layer BFS cursor.
///
/// ## Algorithm
///
/// 1. Start with the start vertex marked visited at depth 0
/// 2. For each vertex in the frontier, read its `(edge_type, direction)` list
/// 3. Unvisited neighbors form the next layer at depth + 1
/// 4. Stop when the frontier empties, `max_depth` is reached or the visit
///    limit is hit
///
/// The start vertex is never yielded; no vertex is yielded twice.
pub struct Traversal<'e, S> {
    adjacency: &'e AdjacencyIndex<S>,
    start: String,
    edge_type: String,
    direction: Direction,
    max_depth: usize,
    limit: Option<usize>,
    cancel: Option<Arc<AtomicBool>>,
    visited: HashSet<String>,
    frontier: Vec<String>,
    depth: usize,
    yielded: usize,
}

impl<'e, S: KvSubstrate> Traversal<'e, S> {
    pub(crate) fn new(
        adjacency: &'e AdjacencyIndex<S>,
        start: &str,
        edge_type: &str,
        direction: Direction,
        max_depth: usize,
    ) -> Self {
        let mut traversal = Self {
            adjacency,
            start: start.to_string(),
            edge_type: edge_type.to_string(),
            direction,
            max_depth,
            limit: None,
            cancel: None,
            visited: HashSet::new(),
            frontier: Vec::new(),
            depth: 0,
            yielded: 0,
        };
        traversal.restart();
        traversal
    }

    /// Stop after yielding `max_visits` vertices.
    pub fn limit(mut self, max_visits: usize) -> Self {
        self.limit = Some(max_visits);
        self
    }

    /// Check `flag` before expanding each layer; once set, the next layer
    /// fails with [`GraphError::Cancelled`].
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Depth of the last layer produced (0 before the first).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True once no further layer can be produced.
    pub fn is_finished(&self) -> bool {
        self.frontier.is_empty()
            || self.depth >= self.max_depth
            || self.limit.map_or(false, |max| self.yielded >= max)
    }

    /// Reset to the start vertex, discarding all progress.
    pub fn restart(&mut self) {
        self.visited.clear();
        self.visited.insert(self.start.clone());
        self.frontier = vec![self.start.clone()];
        self.depth = 0;
        self.yielded = 0;
    }

    /// Expand one layer.
    ///
    /// Returns `Ok(None)` when the traversal is exhausted. On error the
    /// cursor is left at the previous layer, so the call can be retried.
    pub async fn next_layer(&mut self) -> GraphResult<Option<Vec<Visit>>> {
        if self.is_finished() {
            return Ok(None);
        }
        let next_depth = self.depth + 1;
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Acquire) {
                return Err(GraphError::Cancelled { depth: next_depth });
            }
        }

        let mut discovered: HashSet<String> = HashSet::new();
        let mut layer: Vec<Visit> = Vec::new();
        let mut budget = self.limit.map(|max| max.saturating_sub(self.yielded));

        'expand: for vertex_id in &self.frontier {
            let neighbors = self
                .adjacency
                .list_neighbors(vertex_id, &self.edge_type, self.direction)
                .await?;

            for neighbor in neighbors {
                if self.visited.contains(&neighbor) || discovered.contains(&neighbor) {
                    continue;
                }
                if budget == Some(0) {
                    break 'expand;
                }
                budget = budget.map(|b| b - 1);
                discovered.insert(neighbor.clone());
                layer.push(Visit {
                    vertex_id: neighbor,
                    depth: next_depth,
                });
            }
        }

        self.visited.extend(discovered);
        self.frontier = layer.iter().map(|v| v.vertex_id.clone()).collect();
        self.depth = next_depth;
        self.yielded += layer.len();

        tracing::trace!(
            start = %self.start,
            depth = next_depth,
            discovered = layer.len(),
            "Expanded traversal layer"
        );

        if layer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(layer))
        }
    }

    /// Run to completion and return every visit in BFS order.
    pub async fn collect(mut self) -> GraphResult<Vec<Visit>> {
        let mut visits = Vec::new();
        while let Some(layer) = self.next_layer().await? {
            visits.extend(layer);
        }
        Ok(visits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Collection;
    use crate::substrate::MemorySubstrate;

    async fn chain_index(edges: &[(&str, &str)]) -> AdjacencyIndex<MemorySubstrate> {
        let idx = AdjacencyIndex::new(
            Arc::new(MemorySubstrate::new()),
            Collection::new("test", "adjacency"),
        );
        for (from, to) in edges {
            idx.append_neighbor(from, "KNOWS", Direction::Out, to).await.unwrap();
            idx.append_neighbor(to, "KNOWS", Direction::In, from).await.unwrap();
        }
        idx
    }

    fn ids(visits: &[Visit]) -> Vec<(&str, usize)> {
        visits.iter().map(|v| (v.vertex_id.as_str(), v.depth)).collect()
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let idx = chain_index(&[("a", "b"), ("b", "c"), ("c", "d")]).await;

        let visits = Traversal::new(&idx, "a", "KNOWS", Direction::Out, 2)
            .collect()
            .await
            .unwrap();
        assert_eq!(ids(&visits), vec![("b", 1), ("c", 2)]);
    }

    #[tokio::test]
    async fn test_zero_depth_yields_nothing() {
        let idx = chain_index(&[("a", "b")]).await;
        let visits = Traversal::new(&idx, "a", "KNOWS", Direction::Out, 0)
            .collect()
            .await
            .unwrap();
        assert!(visits.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_visits_each_vertex_once() {
        let idx = chain_index(&[("a", "b"), ("b", "c"), ("c", "a"), ("a", "a")]).await;
        let visits = Traversal::new(&idx, "a", "KNOWS", Direction::Out, 10)
            .collect()
            .await
            .unwrap();
        assert_eq!(ids(&visits), vec![("b", 1), ("c", 2)]);
    }

    #[tokio::test]
    async fn test_incoming_direction() {
        let idx = chain_index(&[("a", "c"), ("b", "c")]).await;
        let visits = Traversal::new(&idx, "c", "KNOWS", Direction::In, 1)
            .collect()
            .await
            .unwrap();
        assert_eq!(ids(&visits), vec![("a", 1), ("b", 1)]);
    }

    #[tokio::test]
    async fn test_diamond_reports_shortest_depth() {
        // a → b → d, a → c → d, a → d
        let idx = chain_index(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("a", "d")]).await;
        let visits = Traversal::new(&idx, "a", "KNOWS", Direction::Out, 3)
            .collect()
            .await
            .unwrap();
        assert_eq!(ids(&visits), vec![("b", 1), ("c", 1), ("d", 1)]);
    }

    #[tokio::test]
    async fn test_limit() {
        let idx = chain_index(&[("a", "b"), ("a", "c"), ("b", "d")]).await;
        let visits = Traversal::new(&idx, "a", "KNOWS", Direction::Out, 5)
            .limit(2)
            .collect()
            .await
            .unwrap();
        assert_eq!(ids(&visits), vec![("b", 1), ("c", 1)]);
    }

    #[tokio::test]
    async fn test_cancel_between_layers() {
        let idx = chain_index(&[("a", "b"), ("b", "c")]).await;
        let flag = Arc::new(AtomicBool::new(false));
        let mut t = Traversal::new(&idx, "a", "KNOWS", Direction::Out, 5).with_cancel(flag.clone());

        let first = t.next_layer().await.unwrap().unwrap();
        assert_eq!(ids(&first), vec![("b", 1)]);

        flag.store(true, Ordering::Release);
        assert!(matches!(
            t.next_layer().await,
            Err(GraphError::Cancelled { depth: 2 })
        ));
    }

    #[tokio::test]
    async fn test_restart_recomputes() {
        let idx = chain_index(&[("a", "b")]).await;
        let mut t = Traversal::new(&idx, "a", "KNOWS", Direction::Out, 3);
        assert!(t.next_layer().await.unwrap().is_some());
        assert_eq!(t.depth(), 1);

        // New edge becomes visible after restart
        idx.append_neighbor("a", "KNOWS", Direction::Out, "z").await.unwrap();
        t.restart();
        let layer = t.next_layer().await.unwrap().unwrap();
        assert_eq!(ids(&layer), vec![("b", 1), ("z", 1)]);
    }
}
