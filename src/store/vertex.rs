//! Vertex store: existence and property state of vertices.

use std::sync::Arc;

use crate::codec;
use crate::error::{GraphError, GraphResult};
use crate::substrate::{KvSubstrate, SubstrateError};
use crate::types::VertexRecord;
use super::Collection;

/// CRUD for vertex records.
pub struct VertexStore<S> {
    substrate: Arc<S>,
    collection: Collection,
}

impl<S: KvSubstrate> VertexStore<S> {
    /// Create a vertex store over `collection`.
    pub fn new(substrate: Arc<S>, collection: Collection) -> Self {
        Self { substrate, collection }
    }

    /// Collection this store writes to.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Upsert a vertex, replacing any previous type and properties.
    pub(crate) async fn put_vertex(&self, vertex: &VertexRecord) -> GraphResult<()> {
        codec::validate_properties(&vertex.properties)?;
        let key = self.collection.record_key(&vertex.id);
        self.substrate.put(&key, codec::encode_vertex(vertex)).await?;
        Ok(())
    }

    /// Fetch a vertex. Fails with `NotFound` if absent.
    pub async fn get_vertex(&self, id: &str) -> GraphResult<VertexRecord> {
        self.find_vertex(id)
            .await?
            .ok_or_else(|| GraphError::vertex_not_found(id))
    }

    /// Fetch a vertex, `None` if absent.
    pub async fn find_vertex(&self, id: &str) -> GraphResult<Option<VertexRecord>> {
        let key = self.collection.record_key(id);
        match self.substrate.get(&key).await {
            Ok(fields) => Ok(Some(codec::decode_vertex(id, &fields)?)),
            Err(SubstrateError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a vertex record exists.
    pub async fn exists(&self, id: &str) -> GraphResult<bool> {
        let key = self.collection.record_key(id);
        match self.substrate.get(&key).await {
            Ok(_) => Ok(true),
            Err(SubstrateError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a vertex record. Returns whether it existed.
    pub(crate) async fn delete_vertex(&self, id: &str) -> GraphResult<bool> {
        let key = self.collection.record_key(id);
        Ok(self.substrate.delete(&key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::MemorySubstrate;
    use crate::types::{properties, Value};

    fn store() -> VertexStore<MemorySubstrate> {
        VertexStore::new(Arc::new(MemorySubstrate::new()), Collection::new("test", "vertex"))
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let vs = store();
        let v = VertexRecord::new("p1", "person", properties([("name", "Alice".into())]));

        vs.put_vertex(&v).await.unwrap();
        assert_eq!(vs.get_vertex("p1").await.unwrap(), v);
        assert!(vs.exists("p1").await.unwrap());

        assert!(vs.delete_vertex("p1").await.unwrap());
        assert!(!vs.delete_vertex("p1").await.unwrap());
        assert!(vs.get_vertex("p1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let vs = store();
        vs.put_vertex(&VertexRecord::new("p1", "person", properties([("age", 30.into())])))
            .await
            .unwrap();
        vs.put_vertex(&VertexRecord::new("p1", "robot", properties([("model", "T1".into())])))
            .await
            .unwrap();

        let v = vs.get_vertex("p1").await.unwrap();
        assert_eq!(v.vertex_type, "robot");
        assert_eq!(v.property("model"), Some(&Value::from("T1")));
        assert_eq!(v.property("age"), None);
    }

    #[tokio::test]
    async fn test_nested_property_rejected() {
        let vs = store();
        let v = VertexRecord::new("p1", "person", properties([("tags", Value::List(vec![]))]));
        assert!(matches!(vs.put_vertex(&v).await, Err(GraphError::Codec(_))));
        assert!(!vs.exists("p1").await.unwrap());
    }
}
