//! Edge types for the graph engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::value::Properties;

/// Which adjacency list of a vertex to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Edges leaving the vertex (`from` side).
    Out,
    /// Edges arriving at the vertex (`to` side).
    In,
}

impl Direction {
    /// Stable string form, used in adjacency keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Out => "out",
            Self::In => "in",
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::Out
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "out" | "outgoing" => Ok(Self::Out),
            "in" | "incoming" => Ok(Self::In),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// Composite identity of an edge: `(from, edge_type, to)`.
///
/// At most one edge of a given type exists between an ordered pair.
/// Implements `Ord` for deterministic ordering: (from, edge_type, to).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Source vertex.
    pub from: String,
    /// Relationship type (e.g. `WORKS_AT`).
    pub edge_type: String,
    /// Target vertex.
    pub to: String,
}

impl EdgeKey {
    /// Create a new edge key.
    pub fn new(from: impl Into<String>, edge_type: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            edge_type: edge_type.into(),
            to: to.into(),
        }
    }

    /// True when the edge starts and ends at the same vertex.
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// The vertex owning the adjacency list for `direction`.
    pub fn endpoint(&self, direction: Direction) -> &str {
        match direction {
            Direction::Out => &self.from,
            Direction::In => &self.to,
        }
    }

    /// The id recorded in the adjacency list for `direction`.
    pub fn neighbor(&self, direction: Direction) -> &str {
        match direction {
            Direction::Out => &self.to,
            Direction::In => &self.from,
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[{}]->({})", self.from, self.edge_type, self.to)
    }
}

/// An edge as stored in the edge collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Composite identity.
    pub key: EdgeKey,
    /// Scalar properties.
    pub properties: Properties,
}

impl EdgeRecord {
    /// Create a new edge record.
    pub fn new(key: EdgeKey, properties: Properties) -> Self {
        Self { key, properties }
    }
}

/// How far an edge's adjacency mirror has been written.
///
/// ```text
/// Unindexed ──out──▶ OutIndexed ──in──▶ FullyIndexed
///     └─────in────▶ InIndexed ───out──────┘
/// ```
///
/// Only `FullyIndexed` is safe for traversal in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    /// Edge record exists, neither adjacency side written.
    Unindexed,
    /// Only the `from` side's out-list holds the edge.
    OutIndexed,
    /// Only the `to` side's in-list holds the edge.
    InIndexed,
    /// Both sides hold the edge.
    FullyIndexed,
}

impl IndexState {
    /// Derive the state from which sides are present.
    pub fn from_sides(out_present: bool, in_present: bool) -> Self {
        match (out_present, in_present) {
            (false, false) => Self::Unindexed,
            (true, false) => Self::OutIndexed,
            (false, true) => Self::InIndexed,
            (true, true) => Self::FullyIndexed,
        }
    }

    /// State after successfully writing the given side.
    pub fn with_side(self, direction: Direction) -> Self {
        let (out, inn) = self.sides();
        match direction {
            Direction::Out => Self::from_sides(true, inn),
            Direction::In => Self::from_sides(out, true),
        }
    }

    /// State after removing the given side.
    pub fn without_side(self, direction: Direction) -> Self {
        let (out, inn) = self.sides();
        match direction {
            Direction::Out => Self::from_sides(false, inn),
            Direction::In => Self::from_sides(out, false),
        }
    }

    /// Whether the `(out, in)` sides are present.
    pub fn sides(&self) -> (bool, bool) {
        match self {
            Self::Unindexed => (false, false),
            Self::OutIndexed => (true, false),
            Self::InIndexed => (false, true),
            Self::FullyIndexed => (true, true),
        }
    }

    /// Whether the side for `direction` is present.
    pub fn has_side(&self, direction: Direction) -> bool {
        let (out, inn) = self.sides();
        match direction {
            Direction::Out => out,
            Direction::In => inn,
        }
    }

    /// True only when both sides are indexed.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::FullyIndexed)
    }
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unindexed => write!(f, "unindexed"),
            Self::OutIndexed => write!(f, "out_indexed"),
            Self::InIndexed => write!(f, "in_indexed"),
            Self::FullyIndexed => write!(f, "fully_indexed"),
        }
    }
}
