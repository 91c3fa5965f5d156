//! # graphkv
//!
//! Property graph over a key-value substrate.
//!
//! Vertices, edges and a bidirectional adjacency index live in three
//! collections of any store implementing [`KvSubstrate`]. The engine answers
//! "who is connected to whom, and how" without the substrate knowing
//! anything about graphs.
//!
//! ## Core Contract
//!
//! 1. An edge is only created between existing vertices
//! 2. Every edge is mirrored in the `from` vertex's out-list and the `to`
//!    vertex's in-list
//! 3. Writes are never retried or rolled back; a half-indexed edge is
//!    reported as [`GraphError::PartialIndex`] and repaired by
//!    [`GraphEngine::reconcile`]
//!
//! ## Architecture
//!
//! ```text
//! GraphEngine ──┬── VertexStore ────┐
//!               ├── EdgeStore ──────┼── KvSubstrate (Postgres or Memory)
//!               └── AdjacencyIndex ─┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use graphkv::{properties, Direction, GraphConfig, GraphEngine, MemorySubstrate};
//!
//! # tokio_test_block(async {
//! let engine = GraphEngine::new(Arc::new(MemorySubstrate::new()), GraphConfig::default())?;
//! engine.add_vertex("p1", "person", properties([("name", "Alice".into())])).await?;
//! engine.add_vertex("c1", "company", properties([("name", "Tech Corp".into())])).await?;
//! engine.add_edge("p1", "WORKS_AT", "c1", properties([("role", "Engineer".into())])).await?;
//!
//! let employees = engine.get_neighbors("c1", "WORKS_AT", Direction::In).await?;
//! assert_eq!(employees.ids(), vec!["p1"]);
//! # Ok::<(), graphkv::GraphError>(())
//! # });
//! # fn tokio_test_block<F: std::future::Future<Output = Result<(), graphkv::GraphError>>>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f).unwrap();
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod keys;
pub mod codec;
pub mod error;
pub mod config;
pub mod substrate;
pub mod store;
pub mod engine;
pub mod traversal;
pub mod integrity;

// Re-exports
pub use types::{properties, Direction, EdgeKey, EdgeRecord, Fields, IndexState, Properties, Value, VertexRecord};
pub use error::{GraphError, GraphResult, RecordKind};
pub use config::GraphConfig;
pub use substrate::{KvSubstrate, MemorySubstrate, RecordKey, SubstrateError};
#[cfg(feature = "postgres")]
pub use substrate::{PostgresConfig, PostgresSubstrate, KV_TABLE_SCHEMA};
pub use store::{AdjacencyIndex, AdjacencyList, Collection, EdgeStore, VertexStore};
pub use engine::{EdgeWrite, GraphEngine, Neighbors, WriteKind};
pub use traversal::{Traversal, Visit};
pub use integrity::{AdjacencyEntry, IntegrityReport, PartialEdge, ReconcileReport};

