//! Error taxonomy for graph operations.

use std::fmt;

use crate::codec::CodecError;
use crate::keys::KeyError;
use crate::substrate::SubstrateError;
use crate::types::{EdgeKey, IndexState};

/// Kind of record a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Vertex record.
    Vertex,
    /// Edge record.
    Edge,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Edge => write!(f, "edge"),
        }
    }
}

/// Error type for graph engine operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Read target absent. Recoverable; the caller decides.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up.
        kind: RecordKind,
        /// Vertex id or rendered edge key.
        id: String,
    },
    /// Edge creation referenced a vertex that does not exist. Not retried.
    #[error("Edge {edge} references missing vertex {missing}")]
    DanglingReference {
        /// Edge being created.
        edge: EdgeKey,
        /// The absent endpoint.
        missing: String,
    },
    /// Substrate unreachable. Safe to retry with backoff at the caller's discretion.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    /// Edge record and adjacency diverged mid-write. Run reconciliation to repair.
    #[error("Edge {edge} left partially indexed ({state}): {source}")]
    PartialIndex {
        /// Affected edge.
        edge: EdgeKey,
        /// State reached before the failure.
        state: IndexState,
        /// Failure that interrupted indexing.
        #[source]
        source: Box<GraphError>,
    },
    /// Malformed id, edge type, property or configuration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Stored record could not be decoded.
    #[error("Corrupt record: {0}")]
    Codec(#[from] CodecError),
    /// Non-transient substrate failure.
    #[error("Substrate error: {0}")]
    Substrate(SubstrateError),
    /// Traversal stopped at a layer boundary on request.
    #[error("Traversal cancelled before depth {depth}")]
    Cancelled {
        /// Depth of the layer that was not expanded.
        depth: usize,
    },
}

impl GraphError {
    /// Vertex not found.
    pub fn vertex_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: RecordKind::Vertex,
            id: id.into(),
        }
    }

    /// Edge not found.
    pub fn edge_not_found(edge: &EdgeKey) -> Self {
        Self::NotFound {
            kind: RecordKind::Edge,
            id: edge.to_string(),
        }
    }

    /// True for `NotFound` of any kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Only transient infrastructure failures are worth retrying.
    ///
    /// A `PartialIndex` is not: re-running `add_edge` would work, but blind
    /// retries of appends are exactly what the engine avoids.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<SubstrateError> for GraphError {
    fn from(e: SubstrateError) -> Self {
        match e {
            SubstrateError::Unavailable(msg) => Self::StoreUnavailable(msg),
            other => Self::Substrate(other),
        }
    }
}

impl From<KeyError> for GraphError {
    fn from(e: KeyError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

/// Result alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
