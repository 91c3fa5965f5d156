//! Key construction and parsing for graph records.
//!
//! Key format uses `/` as a separator between path segments, so ids and edge
//! types may not contain it. That keeps every composite key reversible,
//! unlike a `from-TYPE-to` string where `-` may also appear inside ids.

use crate::types::{Direction, EdgeKey};

/// Separator used between path segments in record keys.
pub const SEP: char = '/';

/// Error for malformed ids, edge types or keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Empty id or type.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// Id or type containing the separator.
    #[error("{what} must not contain '/': {value}")]
    ContainsSeparator {
        /// What was being validated.
        what: &'static str,
        /// Offending value.
        value: String,
    },
}

// =============================================================================
// Validation
// =============================================================================

fn validate_segment(what: &'static str, value: &str) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::Empty(what));
    }
    if value.contains(SEP) {
        return Err(KeyError::ContainsSeparator {
            what,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validate a vertex ID.
pub fn validate_vertex_id(id: &str) -> Result<(), KeyError> {
    validate_segment("Vertex ID", id)
}

/// Validate an edge type.
pub fn validate_edge_type(t: &str) -> Result<(), KeyError> {
    validate_segment("Edge type", t)
}

/// Validate all three parts of an edge key.
pub fn validate_edge_key(key: &EdgeKey) -> Result<(), KeyError> {
    validate_vertex_id(&key.from)?;
    validate_edge_type(&key.edge_type)?;
    validate_vertex_id(&key.to)
}

// =============================================================================
// Key Construction
// =============================================================================

/// Key for an edge record: `{from}/{edge_type}/{to}`
pub fn edge_key(key: &EdgeKey) -> String {
    format!("{}{SEP}{}{SEP}{}", key.from, key.edge_type, key.to)
}

/// Parse an edge record key back into an [`EdgeKey`].
pub fn parse_edge_key(raw: &str) -> Option<EdgeKey> {
    let mut parts = raw.splitn(3, SEP);
    let from = parts.next()?;
    let edge_type = parts.next()?;
    let to = parts.next()?;
    if from.is_empty() || edge_type.is_empty() || to.is_empty() || to.contains(SEP) {
        return None;
    }
    Some(EdgeKey::new(from, edge_type, to))
}

/// Key for an adjacency list: `{vertex}/{direction}/{edge_type}`
pub fn adjacency_key(vertex_id: &str, edge_type: &str, direction: Direction) -> String {
    format!("{}{SEP}{}{SEP}{}", vertex_id, direction.as_str(), edge_type)
}

/// Prefix for every adjacency list of a vertex: `{vertex}/`
pub fn adjacency_prefix(vertex_id: &str) -> String {
    format!("{}{SEP}", vertex_id)
}

/// Parse an adjacency key back into `(vertex, edge_type, direction)`.
pub fn parse_adjacency_key(raw: &str) -> Option<(String, String, Direction)> {
    let parts: Vec<&str> = raw.splitn(3, SEP).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) || parts[2].contains(SEP) {
        return None;
    }
    let direction = parts[1].parse().ok()?;
    Some((parts[0].to_string(), parts[2].to_string(), direction))
}
