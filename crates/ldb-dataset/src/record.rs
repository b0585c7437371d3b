//! Persisted dataset records.
//!
//! A [`Dataset`] is a mutable, named list of version hashes. Each
//! [`DatasetVersion`] is immutable and addressed by the hash of its
//! canonical JSON.

use ldb_hash::ContentHasher;
use ldb_types::{ObjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, DatasetResult};
use crate::identifier::format_identifier;

/// Who committed a version, when, and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub created_by: String,
    pub commit_time: Timestamp,
    pub commit_message: String,
}

/// One immutable version of a dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetVersion {
    /// 1-based position in the dataset's version list.
    pub version: u32,
    /// Hash of the previous version record, `None` for a first version.
    pub parent: Option<ObjectId>,
    /// Hash of the collection this version points to.
    pub collection: ObjectId,
    pub tags: Vec<String>,
    pub commit_info: CommitInfo,
}

impl DatasetVersion {
    /// Canonical JSON bytes: object keys sorted, no whitespace.
    pub fn to_bytes(&self) -> DatasetResult<Vec<u8>> {
        canonical_bytes(self, "dataset version")
    }

    pub fn from_bytes(bytes: &[u8]) -> DatasetResult<Self> {
        serde_json::from_slice(bytes).map_err(|source| DatasetError::Json {
            kind: "dataset version",
            source,
        })
    }

    /// Hash of [`Self::to_bytes`], the id this record is stored under.
    pub fn digest(&self) -> DatasetResult<ObjectId> {
        Ok(ContentHasher::hash(&self.to_bytes()?))
    }
}

/// A named dataset and the ordered hashes of its versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub created_by: String,
    pub created: Timestamp,
    pub versions: Vec<ObjectId>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, created_by: impl Into<String>, created: Timestamp) -> Self {
        Self {
            name: name.into(),
            created_by: created_by.into(),
            created,
            versions: Vec::new(),
        }
    }

    /// Number of the newest version, 0 when nothing has been committed.
    pub fn latest_version(&self) -> u32 {
        u32::try_from(self.versions.len()).unwrap_or(u32::MAX)
    }

    /// Identifier of the newest version, e.g. `ds:cats.v3`.
    pub fn latest_identifier(&self) -> String {
        format_identifier(&self.name, Some(self.latest_version()))
    }

    /// Hash of the requested version record, the latest when `version` is
    /// `None`.
    pub fn version_hash(&self, version: Option<u32>) -> DatasetResult<ObjectId> {
        let number = version.unwrap_or_else(|| self.latest_version());
        let found = usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.versions.get(i));
        found.copied().ok_or_else(|| DatasetError::VersionNotFound {
            identifier: format_identifier(&self.name, version),
            latest: self.latest_identifier(),
        })
    }

    pub fn to_bytes(&self) -> DatasetResult<Vec<u8>> {
        canonical_bytes(self, "dataset")
    }

    pub fn from_bytes(bytes: &[u8]) -> DatasetResult<Self> {
        serde_json::from_slice(bytes).map_err(|source| DatasetError::Json {
            kind: "dataset",
            source,
        })
    }
}

/// Serialize through `serde_json::Value`, whose maps keep keys sorted.
fn canonical_bytes<T: Serialize>(value: &T, kind: &'static str) -> DatasetResult<Vec<u8>> {
    serde_json::to_value(value)
        .and_then(|v| serde_json::to_vec(&v))
        .map_err(|source| DatasetError::Json { kind, source })
}
