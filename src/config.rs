//! Engine configuration.
//!
//! ## Environment
//!
//! [`GraphConfig::from_env`] overlays these on the defaults:
//! - `GRAPH_NAMESPACE` (default: `test`)
//! - `GRAPH_VERTEX_COLLECTION` (default: `vertex`)
//! - `GRAPH_EDGE_COLLECTION` (default: `edge`)
//! - `GRAPH_ADJACENCY_COLLECTION` (default: `adjacency`)
//! - `GRAPH_ALLOW_SELF_LOOPS` (default: `true`)

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Where graph records live and which edge policies apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Substrate namespace holding all three collections.
    pub namespace: String,
    /// Collection for vertex records.
    pub vertex_collection: String,
    /// Collection for edge records.
    pub edge_collection: String,
    /// Collection for adjacency lists.
    pub adjacency_collection: String,
    /// Whether `from == to` edges are accepted.
    pub allow_self_loops: bool,
}

impl GraphConfig {
    /// Defaults with a different namespace.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            namespace: std::env::var("GRAPH_NAMESPACE").unwrap_or(defaults.namespace),
            vertex_collection: std::env::var("GRAPH_VERTEX_COLLECTION")
                .unwrap_or(defaults.vertex_collection),
            edge_collection: std::env::var("GRAPH_EDGE_COLLECTION")
                .unwrap_or(defaults.edge_collection),
            adjacency_collection: std::env::var("GRAPH_ADJACENCY_COLLECTION")
                .unwrap_or(defaults.adjacency_collection),
            allow_self_loops: std::env::var("GRAPH_ALLOW_SELF_LOOPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.allow_self_loops),
        }
    }

    /// Reject empty names and collections that would share records.
    pub fn validate(&self) -> Result<(), GraphError> {
        let names = [
            ("namespace", &self.namespace),
            ("vertex_collection", &self.vertex_collection),
            ("edge_collection", &self.edge_collection),
            ("adjacency_collection", &self.adjacency_collection),
        ];
        for (what, value) in names {
            if value.is_empty() {
                return Err(GraphError::InvalidInput(format!("{} must not be empty", what)));
            }
        }

        if self.vertex_collection == self.edge_collection
            || self.vertex_collection == self.adjacency_collection
            || self.edge_collection == self.adjacency_collection
        {
            return Err(GraphError::InvalidInput(
                "vertex, edge and adjacency collections must be distinct".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            namespace: "test".to_string(),
            vertex_collection: "vertex".to_string(),
            edge_collection: "edge".to_string(),
            adjacency_collection: "adjacency".to_string(),
            allow_self_loops: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GraphConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.allow_self_loops);
        assert_eq!(config.namespace, "test");
    }

    #[test]
    fn test_colliding_collections_rejected() {
        let config = GraphConfig {
            adjacency_collection: "vertex".to_string(),
            ..GraphConfig::default()
        };
        assert!(matches!(config.validate(), Err(GraphError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let config = GraphConfig::with_namespace("");
        assert!(config.validate().is_err());
    }
}
