//! Core types for the graph engine.

pub mod value;
pub mod vertex;
pub mod edge;

pub use value::{properties, Fields, Properties, Value};
pub use vertex::VertexRecord;
pub use edge::{Direction, EdgeKey, EdgeRecord, IndexState};
