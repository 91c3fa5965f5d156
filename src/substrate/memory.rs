//! In-memory substrate for tests, demos and embedded use.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::types::{Fields, Value};
use super::{KvSubstrate, RecordKey, SubstrateError};

/// In-memory key-value substrate.
///
/// Uses a BTreeMap behind a single `RwLock`, so every operation is atomic and
/// prefix scans come back in key order. List appends take the write lock,
/// which makes concurrent appends lossless.
///
/// Failure injection hooks ([`set_available`], [`fail_next_append`],
/// [`fail_next_remove`]) let tests reproduce partial writes.
///
/// [`set_available`]: MemorySubstrate::set_available
/// [`fail_next_append`]: MemorySubstrate::fail_next_append
/// [`fail_next_remove`]: MemorySubstrate::fail_next_remove
#[derive(Debug, Default)]
pub struct MemorySubstrate {
    records: RwLock<BTreeMap<RecordKey, Fields>>,
    offline: AtomicBool,
    append_faults: Mutex<Vec<RecordKey>>,
    remove_faults: Mutex<Vec<RecordKey>>,
}

impl MemorySubstrate {
    /// Create a new empty substrate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all namespaces.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True when no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Number of records in one collection.
    pub fn collection_len(&self, namespace: &str, collection: &str) -> usize {
        self.records
            .read()
            .keys()
            .filter(|k| k.namespace == namespace && k.collection == collection)
            .count()
    }

    /// Toggle reachability. While unavailable every call fails with
    /// [`SubstrateError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Make the next `append_to_list` on `key` fail once.
    pub fn fail_next_append(&self, key: RecordKey) {
        self.append_faults.lock().push(key);
    }

    /// Make the next `remove_from_list` on `key` fail once.
    pub fn fail_next_remove(&self, key: RecordKey) {
        self.remove_faults.lock().push(key);
    }

    fn check_available(&self) -> Result<(), SubstrateError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SubstrateError::Unavailable(
                "memory substrate marked offline".to_string(),
            ));
        }
        Ok(())
    }

    fn take_fault(faults: &Mutex<Vec<RecordKey>>, key: &RecordKey) -> Result<(), SubstrateError> {
        let mut faults = faults.lock();
        if let Some(pos) = faults.iter().position(|k| k == key) {
            faults.remove(pos);
            return Err(SubstrateError::Unavailable(format!(
                "injected failure on {}",
                key
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl KvSubstrate for MemorySubstrate {
    async fn get(&self, key: &RecordKey) -> Result<Fields, SubstrateError> {
        self.check_available()?;
        self.records
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| SubstrateError::NotFound(key.clone()))
    }

    async fn put(&self, key: &RecordKey, fields: Fields) -> Result<(), SubstrateError> {
        self.check_available()?;
        self.records.write().insert(key.clone(), fields);
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool, SubstrateError> {
        self.check_available()?;
        Ok(self.records.write().remove(key).is_some())
    }

    async fn append_to_list(
        &self,
        key: &RecordKey,
        field: &str,
        value: Value,
    ) -> Result<(), SubstrateError> {
        self.check_available()?;
        Self::take_fault(&self.append_faults, key)?;

        let mut records = self.records.write();
        let fields = records.entry(key.clone()).or_default();
        match fields
            .entry(field.to_string())
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(items) => {
                items.push(value);
                Ok(())
            }
            _ => Err(SubstrateError::TypeMismatch {
                key: key.clone(),
                field: field.to_string(),
            }),
        }
    }

    async fn remove_from_list(
        &self,
        key: &RecordKey,
        field: &str,
        value: &Value,
    ) -> Result<(), SubstrateError> {
        self.check_available()?;
        Self::take_fault(&self.remove_faults, key)?;

        let mut records = self.records.write();
        let Some(fields) = records.get_mut(key) else {
            return Ok(());
        };
        match fields.get_mut(field) {
            None => Ok(()),
            Some(Value::List(items)) => {
                items.retain(|item| item != value);
                Ok(())
            }
            Some(_) => Err(SubstrateError::TypeMismatch {
                key: key.clone(),
                field: field.to_string(),
            }),
        }
    }

    async fn scan_prefix(
        &self,
        namespace: &str,
        collection: &str,
        prefix: &str,
    ) -> Result<Vec<(String, Fields)>, SubstrateError> {
        self.check_available()?;
        let start = RecordKey::new(namespace, collection, prefix);
        Ok(self
            .records
            .read()
            .range(start..)
            .take_while(|(k, _)| {
                k.namespace == namespace && k.collection == collection && k.key.starts_with(prefix)
            })
            .map(|(k, fields)| (k.key.clone(), fields.clone()))
            .collect())
    }
}
