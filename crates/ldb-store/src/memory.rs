use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::StoreResult;
use crate::key::StoreKey;
use crate::traits::{ObjectStore, WriteMode};

/// In-memory, `BTreeMap`-based object store.
///
/// Intended for tests and embedding. Values are held behind a `RwLock` for
/// safe concurrent access and cloned on read. Levels exist implicitly
/// whenever some value lives beneath them, so pruning is automatic.
pub struct InMemoryObjectStore {
    values: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of values currently stored.
    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.read_map().values().map(|v| v.len() as u64).sum()
    }

    /// Remove everything from the store.
    pub fn clear(&self) {
        self.write_map().clear();
    }

    /// All keys currently holding values, sorted.
    pub fn all_keys(&self) -> Vec<String> {
        self.read_map().keys().cloned().collect()
    }

    fn read_map(&self) -> RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn level_prefix(key: &StoreKey) -> String {
    if key.is_root() {
        String::new()
    } else {
        format!("{}/", key.as_str())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, key: &StoreKey) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.read_map().get(key.as_str()).cloned())
    }

    fn write(&self, key: &StoreKey, data: &[u8], mode: WriteMode) -> StoreResult<bool> {
        let mut map = self.write_map();
        if mode == WriteMode::IfAbsent && map.contains_key(key.as_str()) {
            return Ok(false);
        }
        map.insert(key.as_str().to_string(), data.to_vec());
        Ok(true)
    }

    fn exists(&self, key: &StoreKey) -> StoreResult<bool> {
        let map = self.read_map();
        if map.contains_key(key.as_str()) {
            return Ok(true);
        }
        let prefix = level_prefix(key);
        Ok(map
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix)))
    }

    fn delete(&self, key: &StoreKey) -> StoreResult<bool> {
        Ok(self.write_map().remove(key.as_str()).is_some())
    }

    fn list(&self, prefix: &StoreKey) -> StoreResult<Vec<String>> {
        let map = self.read_map();
        let level = level_prefix(prefix);
        let names: BTreeSet<String> = map
            .range(level.clone()..)
            .take_while(|(k, _)| k.starts_with(&level))
            .filter_map(|(k, _)| k[level.len()..].split('/').next().map(str::to_string))
            .filter(|name| !name.is_empty())
            .collect();
        Ok(names.into_iter().collect())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("value_count", &self.len())
            .finish()
    }
}
