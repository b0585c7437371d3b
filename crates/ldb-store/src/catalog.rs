//! Typed access to an instance's object store.

use std::path::PathBuf;
use std::sync::Arc;

use ldb_types::ObjectId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::key::StoreKey;
use crate::layout;
use crate::object::{AnnotationMeta, DataObjectMeta};
use crate::traits::{ObjectStore, WriteMode};

/// The instance layout on top of an [`ObjectStore`].
///
/// Collections, dataset versions and dataset records are handled as raw
/// bytes here; their typed forms live in the crates that own them.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn ObjectStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The underlying backend.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Filesystem path of a key, if the backend has one.
    pub fn path_for(&self, key: &StoreKey) -> Option<PathBuf> {
        self.store.path_for(key)
    }

    // -----------------------------------------------------------------------
    // JSON helpers
    // -----------------------------------------------------------------------

    pub fn read_json<T: DeserializeOwned>(&self, key: &StoreKey) -> StoreResult<Option<T>> {
        match self.store.read(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StoreError::Serialization {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub fn write_json<T: Serialize>(
        &self,
        key: &StoreKey,
        value: &T,
        mode: WriteMode,
    ) -> StoreResult<bool> {
        let bytes = serde_json::to_vec(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.store.write(key, &bytes, mode)
    }

    // -----------------------------------------------------------------------
    // Data objects
    // -----------------------------------------------------------------------

    /// Whether this hash has ever been indexed.
    pub fn data_object_exists(&self, id: &ObjectId) -> StoreResult<bool> {
        self.store.exists(&layout::data_object_dir(id))
    }

    pub fn data_object_meta(&self, id: &ObjectId) -> StoreResult<Option<DataObjectMeta>> {
        self.read_json(&layout::data_object_meta(id))
    }

    /// Meta of an indexed data object, `DataObjectNotFound` otherwise.
    pub fn require_data_object_meta(&self, id: &ObjectId) -> StoreResult<DataObjectMeta> {
        self.data_object_meta(id)?
            .ok_or(StoreError::DataObjectNotFound(*id))
    }

    pub fn put_data_object_meta(&self, id: &ObjectId, meta: &DataObjectMeta) -> StoreResult<()> {
        self.write_json(&layout::data_object_meta(id), meta, WriteMode::Overwrite)?;
        Ok(())
    }

    /// All indexed data object ids, sorted.
    pub fn data_object_ids(&self) -> StoreResult<Vec<ObjectId>> {
        let root = layout::data_object_info_root();
        let mut ids = Vec::new();
        for dir in self.store.list(&root)? {
            let shard = root.child(&dir)?;
            for rest in self.store.list(&shard)? {
                match ObjectId::from_shard(&dir, &rest) {
                    Ok(id) => ids.push(id),
                    Err(e) => debug!(shard = %dir, name = %rest, error = %e, "skipping entry"),
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Every indexed data object paired with its current annotation.
    pub fn root_entries(&self) -> StoreResult<Vec<(ObjectId, Option<ObjectId>)>> {
        self.data_object_ids()?
            .into_iter()
            .map(|id| Ok((id, self.current_annotation(&id)?)))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Annotation history
    // -----------------------------------------------------------------------

    /// The current annotation of an indexed data object.
    ///
    /// `Ok(None)` when the object has no annotation; `DataObjectNotFound`
    /// when the object was never indexed.
    pub fn current_annotation(&self, id: &ObjectId) -> StoreResult<Option<ObjectId>> {
        match self.store.read(&layout::current_annotation(id))? {
            Some(bytes) => parse_hash_text(&layout::current_annotation(id), &bytes),
            None if self.data_object_exists(id)? => Ok(None),
            None => Err(StoreError::DataObjectNotFound(*id)),
        }
    }

    pub fn set_current_annotation(&self, id: &ObjectId, annotation: &ObjectId) -> StoreResult<()> {
        self.store.write(
            &layout::current_annotation(id),
            annotation.to_hex().as_bytes(),
            WriteMode::Overwrite,
        )?;
        Ok(())
    }

    pub fn annotation_meta(
        &self,
        id: &ObjectId,
        annotation: &ObjectId,
    ) -> StoreResult<Option<AnnotationMeta>> {
        self.read_json(&layout::annotation_version_meta(id, annotation))
    }

    pub fn put_annotation_meta(
        &self,
        id: &ObjectId,
        annotation: &ObjectId,
        meta: &AnnotationMeta,
    ) -> StoreResult<()> {
        self.write_json(
            &layout::annotation_version_meta(id, annotation),
            meta,
            WriteMode::Overwrite,
        )?;
        Ok(())
    }

    /// Number of distinct annotation versions recorded for a data object.
    pub fn annotation_version_count(&self, id: &ObjectId) -> StoreResult<usize> {
        Ok(self.store.list(&layout::annotation_versions_dir(id))?.len())
    }

    /// Version number of an annotation for a data object, `0` when absent.
    pub fn annotation_version(&self, id: &ObjectId, annotation: Option<&ObjectId>) -> StoreResult<u32> {
        match annotation {
            Some(annotation) => Ok(self
                .annotation_meta(id, annotation)?
                .map(|m| m.version)
                .unwrap_or(0)),
            None => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // Annotation payloads
    // -----------------------------------------------------------------------

    pub fn annotation_exists(&self, annotation: &ObjectId) -> StoreResult<bool> {
        self.store.exists(&layout::annotation_dir(annotation))
    }

    /// Write both annotation payload parts once. Returns `true` if new.
    pub fn put_annotation(
        &self,
        annotation: &ObjectId,
        ldb_bytes: &[u8],
        user_bytes: &[u8],
    ) -> StoreResult<bool> {
        let wrote_ldb =
            self.store
                .write(&layout::annotation_ldb(annotation), ldb_bytes, WriteMode::IfAbsent)?;
        let wrote_user =
            self.store
                .write(&layout::annotation_user(annotation), user_bytes, WriteMode::IfAbsent)?;
        Ok(wrote_ldb || wrote_user)
    }

    /// The user JSON of an annotation.
    pub fn annotation_value(&self, annotation: &ObjectId) -> StoreResult<Option<serde_json::Value>> {
        self.read_json(&layout::annotation_user(annotation))
    }

    // -----------------------------------------------------------------------
    // Collections, dataset versions, datasets
    // -----------------------------------------------------------------------

    pub fn put_collection(&self, id: &ObjectId, bytes: &[u8]) -> StoreResult<bool> {
        self.store.write(&layout::collection(id), bytes, WriteMode::IfAbsent)
    }

    pub fn collection_bytes(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        self.store.read(&layout::collection(id))
    }

    pub fn put_dataset_version(&self, id: &ObjectId, bytes: &[u8]) -> StoreResult<bool> {
        self.store.write(&layout::dataset_version(id), bytes, WriteMode::IfAbsent)
    }

    pub fn dataset_version_bytes(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        self.store.read(&layout::dataset_version(id))
    }

    pub fn dataset_bytes(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        self.store.read(&layout::dataset(name)?)
    }

    /// Dataset records are mutable and always overwritten.
    pub fn put_dataset_bytes(&self, name: &str, bytes: &[u8]) -> StoreResult<()> {
        self.store.write(&layout::dataset(name)?, bytes, WriteMode::Overwrite)?;
        Ok(())
    }

    /// Names of all dataset records, sorted.
    pub fn dataset_names(&self) -> StoreResult<Vec<String>> {
        self.store.list(&layout::datasets_root())
    }
}

fn parse_hash_text(key: &StoreKey, bytes: &[u8]) -> StoreResult<Option<ObjectId>> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    ObjectId::from_hex(text)
        .map(Some)
        .map_err(|e| StoreError::CorruptObject {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}
