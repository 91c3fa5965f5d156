//! Record codec: vertex, edge and adjacency records to and from field maps.
//!
//! Field layout:
//!
//! | Collection | Fields |
//! |------------|--------|
//! | vertex     | `type: string`, `properties: map` |
//! | edge       | `from: string`, `type: string`, `to: string`, `properties: map` |
//! | adjacency  | `ids: list<string>` |

use std::collections::HashSet;

use crate::types::{EdgeKey, EdgeRecord, Fields, Properties, Value, VertexRecord};

/// Vertex/edge type tag field.
pub const FIELD_TYPE: &str = "type";
/// Property map field.
pub const FIELD_PROPERTIES: &str = "properties";
/// Edge source field.
pub const FIELD_FROM: &str = "from";
/// Edge target field.
pub const FIELD_TO: &str = "to";
/// Adjacency neighbor list field.
pub const FIELD_IDS: &str = "ids";

/// Error type for record decoding and property validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// Required field absent.
    #[error("Missing field '{0}'")]
    MissingField(&'static str),
    /// Field present with the wrong type.
    #[error("Field '{field}' has type {found}, expected {expected}")]
    WrongType {
        /// Field name.
        field: &'static str,
        /// Expected kind.
        expected: &'static str,
        /// Kind actually found.
        found: &'static str,
    },
    /// Property values must be scalars.
    #[error("Property '{name}' is a {kind}; properties must be scalar")]
    NonScalarProperty {
        /// Property name.
        name: String,
        /// Kind found.
        kind: &'static str,
    },
}

/// Reject properties holding lists or maps.
pub fn validate_properties(properties: &Properties) -> Result<(), CodecError> {
    for (name, value) in properties {
        if !value.is_scalar() {
            return Err(CodecError::NonScalarProperty {
                name: name.clone(),
                kind: value.kind(),
            });
        }
    }
    Ok(())
}

/// Encode a vertex into its record fields. The id is the record key, not a field.
pub fn encode_vertex(vertex: &VertexRecord) -> Fields {
    let mut fields = Fields::new();
    fields.insert(FIELD_TYPE.to_string(), Value::Str(vertex.vertex_type.clone()));
    fields.insert(
        FIELD_PROPERTIES.to_string(),
        Value::Map(vertex.properties.clone()),
    );
    fields
}

/// Decode a vertex record.
pub fn decode_vertex(id: &str, fields: &Fields) -> Result<VertexRecord, CodecError> {
    Ok(VertexRecord {
        id: id.to_string(),
        vertex_type: required_str(fields, FIELD_TYPE)?.to_string(),
        properties: optional_map(fields, FIELD_PROPERTIES)?,
    })
}

/// Encode an edge into its record fields.
///
/// Endpoints and type are stored redundantly with the key so a scan of the
/// edge collection can rebuild adjacency without parsing keys.
pub fn encode_edge(edge: &EdgeRecord) -> Fields {
    let mut fields = Fields::new();
    fields.insert(FIELD_FROM.to_string(), Value::Str(edge.key.from.clone()));
    fields.insert(FIELD_TYPE.to_string(), Value::Str(edge.key.edge_type.clone()));
    fields.insert(FIELD_TO.to_string(), Value::Str(edge.key.to.clone()));
    fields.insert(
        FIELD_PROPERTIES.to_string(),
        Value::Map(edge.properties.clone()),
    );
    fields
}

/// Decode an edge record.
pub fn decode_edge(fields: &Fields) -> Result<EdgeRecord, CodecError> {
    let key = EdgeKey::new(
        required_str(fields, FIELD_FROM)?,
        required_str(fields, FIELD_TYPE)?,
        required_str(fields, FIELD_TO)?,
    );
    Ok(EdgeRecord {
        key,
        properties: optional_map(fields, FIELD_PROPERTIES)?,
    })
}

/// Decode an adjacency list, dropping repeated ids (first occurrence wins).
///
/// A record without the `ids` field decodes as an empty list.
pub fn decode_id_list(fields: &Fields) -> Result<Vec<String>, CodecError> {
    let raw = decode_raw_id_list(fields)?;
    let mut seen = HashSet::with_capacity(raw.len());
    Ok(raw.into_iter().filter(|id| seen.insert(id.clone())).collect())
}

/// Decode an adjacency list exactly as stored, duplicates included.
pub fn decode_raw_id_list(fields: &Fields) -> Result<Vec<String>, CodecError> {
    let Some(value) = fields.get(FIELD_IDS) else {
        return Ok(Vec::new());
    };
    let items = value.as_list().ok_or(CodecError::WrongType {
        field: FIELD_IDS,
        expected: "list",
        found: value.kind(),
    })?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or(CodecError::WrongType {
                field: FIELD_IDS,
                expected: "string",
                found: item.kind(),
            })
        })
        .collect()
}

fn required_str<'a>(fields: &'a Fields, field: &'static str) -> Result<&'a str, CodecError> {
    let value = fields.get(field).ok_or(CodecError::MissingField(field))?;
    value.as_str().ok_or(CodecError::WrongType {
        field,
        expected: "string",
        found: value.kind(),
    })
}

fn optional_map(fields: &Fields, field: &'static str) -> Result<Properties, CodecError> {
    match fields.get(field) {
        None | Some(Value::Nil) => Ok(Properties::new()),
        Some(Value::Map(m)) => Ok(m.clone()),
        Some(other) => Err(CodecError::WrongType {
            field,
            expected: "map",
            found: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::properties;

    #[test]
    fn test_vertex_roundtrip() {
        let v = VertexRecord::new(
            "p1",
            "person",
            properties([("name", "Alice".into()), ("age", 30.into())]),
        );
        let fields = encode_vertex(&v);
        assert!(!fields.contains_key("id"));
        assert_eq!(decode_vertex("p1", &fields).unwrap(), v);
    }

    #[test]
    fn test_edge_roundtrip() {
        let e = EdgeRecord::new(
            EdgeKey::new("p1", "WORKS_AT", "c1"),
            properties([("role", "Engineer".into()), ("since", 2020.into())]),
        );
        assert_eq!(decode_edge(&encode_edge(&e)).unwrap(), e);
    }

    #[test]
    fn test_decode_vertex_missing_type() {
        let fields = Fields::new();
        assert_eq!(
            decode_vertex("p1", &fields),
            Err(CodecError::MissingField(FIELD_TYPE))
        );
    }

    #[test]
    fn test_decode_vertex_without_properties_is_empty() {
        let mut fields = Fields::new();
        fields.insert(FIELD_TYPE.to_string(), "person".into());
        let v = decode_vertex("p1", &fields).unwrap();
        assert!(v.properties.is_empty());
    }

    #[test]
    fn test_validate_properties_rejects_nested() {
        let ok = properties([("name", "Alice".into())]);
        assert!(validate_properties(&ok).is_ok());

        let nested = properties([("tags", Value::List(vec!["a".into()]))]);
        assert!(matches!(
            validate_properties(&nested),
            Err(CodecError::NonScalarProperty { kind: "list", .. })
        ));
    }

    #[test]
    fn test_id_list_dedups_in_order() {
        let mut fields = Fields::new();
        fields.insert(
            FIELD_IDS.to_string(),
            Value::List(vec!["c2".into(), "c1".into(), "c2".into()]),
        );
        assert_eq!(decode_id_list(&fields).unwrap(), vec!["c2", "c1"]);
        assert_eq!(decode_raw_id_list(&fields).unwrap(), vec!["c2", "c1", "c2"]);
    }

    #[test]
    fn test_id_list_rejects_non_string() {
        let mut fields = Fields::new();
        fields.insert(FIELD_IDS.to_string(), Value::List(vec![Value::Int(1)]));
        assert!(matches!(
            decode_id_list(&fields),
            Err(CodecError::WrongType { expected: "string", .. })
        ));
        assert!(decode_id_list(&Fields::new()).unwrap().is_empty());
    }
}
