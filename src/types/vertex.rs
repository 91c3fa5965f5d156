//! Vertex records.

use serde::{Deserialize, Serialize};

use super::value::{Properties, Value};

/// A vertex as stored in the vertex collection.
///
/// Adjacency is deliberately absent: it lives in the adjacency index so
/// that re-upserting a vertex can never clobber its edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    /// Identifier, unique within the vertex collection.
    pub id: String,
    /// Type tag (e.g. `person`, `company`).
    pub vertex_type: String,
    /// Scalar properties.
    pub properties: Properties,
}

impl VertexRecord {
    /// Create a new vertex record.
    pub fn new(id: impl Into<String>, vertex_type: impl Into<String>, properties: Properties) -> Self {
        Self {
            id: id.into(),
            vertex_type: vertex_type.into(),
            properties,
        }
    }

    /// Look up a single property.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}
