use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use serde_json::Value;

use super::{JsonStore, StoreResult, validate_key};

/// In-memory store. Cloned values go in and come out, like a file would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted list of every key currently stored.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        // A panicking writer cannot leave a half-written value behind.
        self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JsonStore for MemoryStore {
    fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        validate_key(key)?;
        Ok(self.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> StoreResult<()> {
        validate_key(key)?;
        self.lock().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        validate_key(key)?;
        Ok(self.lock().remove(key).is_some())
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        validate_key(key)?;
        Ok(self.lock().contains_key(key))
    }
}
