//! In-memory store

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use super::{KeyValueStore, Result};

/// Map-backed store for tests and short-lived sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> R) -> R {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut entries)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.with(|e| e.get(key).cloned()))
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.with(|e| e.insert(key.to_string(), value));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with(|e| e.remove(key));
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<()> {
        self.with(|e| {
            if let Some(value) = f(e.get(key).cloned()) {
                e.insert(key.to_string(), value);
            }
        });
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.with(|e| e.keys().cloned().collect()))
    }

    fn clear(&self) -> Result<()> {
        self.with(BTreeMap::clear);
        Ok(())
    }
}
