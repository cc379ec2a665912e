//! In-process stores, used when no database is wanted and by tests.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{KvStore, SessionRecord, SessionRecorder};
use crate::error::StorageError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self
            .values
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".into()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Keeps completed sessions in a vector.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<SessionRecord>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SessionRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl SessionRecorder for MemoryRecorder {
    fn record(&self, record: &SessionRecord) -> Result<(), StorageError> {
        self.records
            .lock()
            .map_err(|_| StorageError::Unavailable("memory recorder poisoned".into()))?
            .push(record.clone());
        Ok(())
    }
}
