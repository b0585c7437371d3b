//! The [`DatasetStore`] trait: typed dataset access over an instance store.
//!
//! [`Catalog`] implements the required methods on top of its raw byte
//! accessors; the provided methods combine them into lookups by name,
//! version and identifier.

use ldb_collection::Collection;
use ldb_store::Catalog;
use ldb_types::ObjectId;
use tracing::debug;

use crate::error::{DatasetError, DatasetResult};
use crate::identifier::DatasetIdentifier;
use crate::record::{Dataset, DatasetVersion};

/// Storage interface for datasets, dataset versions and collections.
///
/// Collections and version records are content addressed and written once.
/// Dataset records are overwritten on every append.
pub trait DatasetStore {
    /// Read a dataset record. Returns `Ok(None)` if it does not exist.
    fn load_dataset(&self, name: &str) -> DatasetResult<Option<Dataset>>;

    /// Create or overwrite a dataset record.
    fn save_dataset(&self, dataset: &Dataset) -> DatasetResult<()>;

    /// Names of all datasets, sorted.
    fn dataset_names(&self) -> DatasetResult<Vec<String>>;

    /// Read a version record by hash.
    fn load_version(&self, id: &ObjectId) -> DatasetResult<DatasetVersion>;

    /// Write a version record, returning its hash.
    fn save_version(&self, version: &DatasetVersion) -> DatasetResult<ObjectId>;

    /// Read a collection by hash.
    fn load_collection(&self, id: &ObjectId) -> DatasetResult<Collection>;

    /// Write a collection, returning its hash and whether it was new.
    fn save_collection(&self, collection: &Collection) -> DatasetResult<(ObjectId, bool)>;

    /// Every indexed data object with its current annotation.
    fn root_collection(&self) -> DatasetResult<Collection>;

    /// Read a dataset record, failing if it does not exist.
    fn require_dataset(&self, name: &str) -> DatasetResult<Dataset> {
        self.load_dataset(name)?
            .ok_or_else(|| DatasetError::NotFound(name.to_string()))
    }

    /// All dataset records in name order.
    fn datasets(&self) -> DatasetResult<Vec<Dataset>> {
        self.dataset_names()?
            .iter()
            .map(|name| self.require_dataset(name))
            .collect()
    }

    /// Hash and record of a dataset version, the latest when `version` is
    /// `None`.
    fn find_version(
        &self,
        name: &str,
        version: Option<u32>,
    ) -> DatasetResult<(ObjectId, DatasetVersion)> {
        let dataset = self.require_dataset(name)?;
        let id = dataset.version_hash(version)?;
        Ok((id, self.load_version(&id)?))
    }

    /// The collection an identifier points to.
    fn resolve_collection(&self, identifier: &DatasetIdentifier) -> DatasetResult<Collection> {
        if identifier.is_root() {
            return self.root_collection();
        }
        let (_, version) = self.find_version(&identifier.name, identifier.version)?;
        self.load_collection(&version.collection)
    }

    /// The collection of a version record, empty for `None`.
    fn version_collection(&self, version: Option<&ObjectId>) -> DatasetResult<Collection> {
        match version {
            Some(id) => {
                let record = self.load_version(id)?;
                self.load_collection(&record.collection)
            }
            None => Ok(Collection::new()),
        }
    }
}

impl DatasetStore for Catalog {
    fn load_dataset(&self, name: &str) -> DatasetResult<Option<Dataset>> {
        match self.dataset_bytes(name)? {
            Some(bytes) => Dataset::from_bytes(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn save_dataset(&self, dataset: &Dataset) -> DatasetResult<()> {
        self.put_dataset_bytes(&dataset.name, &dataset.to_bytes()?)?;
        debug!(dataset = %dataset.name, versions = dataset.versions.len(), "saved dataset");
        Ok(())
    }

    fn dataset_names(&self) -> DatasetResult<Vec<String>> {
        Ok(Catalog::dataset_names(self)?)
    }

    fn load_version(&self, id: &ObjectId) -> DatasetResult<DatasetVersion> {
        let bytes = self
            .dataset_version_bytes(id)?
            .ok_or(DatasetError::VersionRecordNotFound(*id))?;
        DatasetVersion::from_bytes(&bytes)
    }

    fn save_version(&self, version: &DatasetVersion) -> DatasetResult<ObjectId> {
        let bytes = version.to_bytes()?;
        let id = ldb_hash::ContentHasher::hash(&bytes);
        self.put_dataset_version(&id, &bytes)?;
        Ok(id)
    }

    fn load_collection(&self, id: &ObjectId) -> DatasetResult<Collection> {
        let bytes = self
            .collection_bytes(id)?
            .ok_or(DatasetError::CollectionNotFound(*id))?;
        Ok(Collection::from_bytes(&bytes)?)
    }

    fn save_collection(&self, collection: &Collection) -> DatasetResult<(ObjectId, bool)> {
        let bytes = collection.to_bytes();
        let id = ldb_hash::ContentHasher::hash(&bytes);
        let new = self.put_collection(&id, &bytes)?;
        debug!(collection = %id, entries = collection.len(), new, "saved collection");
        Ok((id, new))
    }

    fn root_collection(&self) -> DatasetResult<Collection> {
        Ok(self.root_entries()?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ldb_store::InMemoryObjectStore;
    use ldb_types::Timestamp;

    use super::*;
    use crate::record::CommitInfo;

    fn id(n: u8) -> ObjectId {
        ObjectId::from([n; 16])
    }

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(InMemoryObjectStore::new()))
    }

    fn version(n: u32, collection: ObjectId) -> DatasetVersion {
        DatasetVersion {
            version: n,
            parent: None,
            collection,
            tags: Vec::new(),
            commit_info: CommitInfo {
                created_by: "alice".into(),
                commit_time: Timestamp::now(),
                commit_message: String::new(),
            },
        }
    }

    // ---- Missing datasets ----

    #[test]
    fn missing_dataset() {
        let c = catalog();
        assert!(c.load_dataset("nope").unwrap().is_none());
        let err = c.require_dataset("nope").unwrap_err();
        assert_eq!(err.to_string(), "Dataset not found: nope");
    }

    // ---- Collections are content addressed ----

    #[test]
    fn collection_written_once() {
        let c = catalog();
        let coll: Collection = [(id(1), Some(id(2))), (id(3), None)].into_iter().collect();
        let (hash, new) = c.save_collection(&coll).unwrap();
        assert!(new);
        assert_eq!(hash, coll.digest());
        let (again, new) = c.save_collection(&coll).unwrap();
        assert_eq!(again, hash);
        assert!(!new);
        assert_eq!(c.load_collection(&hash).unwrap(), coll);
        assert!(matches!(
            c.load_collection(&id(99)),
            Err(DatasetError::CollectionNotFound(_))
        ));
    }

    // ---- Resolution by identifier ----

    #[test]
    fn resolve_versions() {
        let c = catalog();
        let first: Collection = [(id(1), None)].into_iter().collect();
        let second: Collection = [(id(1), Some(id(5))), (id(2), None)].into_iter().collect();
        let (h1, _) = c.save_collection(&first).unwrap();
        let (h2, _) = c.save_collection(&second).unwrap();
        let v1 = c.save_version(&version(1, h1)).unwrap();
        let v2 = c.save_version(&version(2, h2)).unwrap();
        let mut ds = Dataset::new("cats", "alice", Timestamp::now());
        ds.versions = vec![v1, v2];
        c.save_dataset(&ds).unwrap();

        let latest = DatasetIdentifier::parse("ds:cats").unwrap();
        assert_eq!(c.resolve_collection(&latest).unwrap(), second);
        let old = DatasetIdentifier::parse("ds:cats.v1").unwrap();
        assert_eq!(c.resolve_collection(&old).unwrap(), first);
        let missing = DatasetIdentifier::parse("ds:cats.v3").unwrap();
        assert!(matches!(
            c.resolve_collection(&missing),
            Err(DatasetError::VersionNotFound { .. })
        ));

        assert_eq!(c.version_collection(Some(&v1)).unwrap(), first);
        assert!(c.version_collection(None).unwrap().is_empty());
        assert_eq!(c.datasets().unwrap(), vec![ds]);
    }

    #[test]
    fn root_is_empty_without_index() {
        let c = catalog();
        let root = DatasetIdentifier::parse("ds:root").unwrap();
        assert!(c.resolve_collection(&root).unwrap().is_empty());
    }
}
