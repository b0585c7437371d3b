use std::path::PathBuf;

use crate::error::{StoreError, StoreResult};
use crate::key::StoreKey;

/// How a write treats an existing value at the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace whatever is there (metadata, version history, pointers).
    Overwrite,
    /// Write only when nothing exists yet (content-addressed payloads).
    IfAbsent,
}

/// Hash-sharded key/value store underlying an LDB instance.
///
/// All implementations must satisfy these invariants:
/// - A reader never observes a partially written value.
/// - `WriteMode::IfAbsent` never replaces existing bytes.
/// - Concurrent reads are always safe.
/// - The store never interprets values; typed access lives in
///   [`Catalog`](crate::Catalog).
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read the value stored at `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    fn read(&self, key: &StoreKey) -> StoreResult<Option<Vec<u8>>>;

    /// Write `data` at `key`, creating intermediate levels as needed.
    ///
    /// Returns `true` when bytes were written, `false` when `IfAbsent`
    /// found an existing value and left it untouched.
    fn write(&self, key: &StoreKey, data: &[u8], mode: WriteMode) -> StoreResult<bool>;

    /// Whether a value or a non-empty level exists at `key`.
    fn exists(&self, key: &StoreKey) -> StoreResult<bool>;

    /// Delete the value at `key`. Returns `true` if it existed.
    ///
    /// The parent level is pruned when the deletion leaves it empty.
    fn delete(&self, key: &StoreKey) -> StoreResult<bool>;

    /// Names of the immediate children of `prefix`, sorted.
    ///
    /// Returns an empty list when `prefix` does not exist.
    fn list(&self, prefix: &StoreKey) -> StoreResult<Vec<String>>;

    /// Filesystem location backing `key`, for backends that have one.
    fn path_for(&self, _key: &StoreKey) -> Option<PathBuf> {
        None
    }

    /// Read a value that must exist.
    fn read_required(&self, key: &StoreKey) -> StoreResult<Vec<u8>> {
        self.read(key)?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// Read multiple values in a batch.
    ///
    /// Default implementation calls `read()` for each key. Backends may
    /// override for better performance.
    fn read_batch(&self, keys: &[StoreKey]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|key| self.read(key)).collect()
    }
}
