use std::collections::BTreeSet;

use ldb_types::{max_timestamp, Timestamp};
use serde::{Deserialize, Serialize};

/// Where a data object was seen: filesystem id, protocol, and path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathInfo {
    pub fs_id: String,
    pub protocol: String,
    pub path: String,
}

impl PathInfo {
    pub fn new(fs_id: impl Into<String>, protocol: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            fs_id: fs_id.into(),
            protocol: protocol.into(),
            path: path.into(),
        }
    }
}

/// Filesystem stat snapshot of a data object's canonical location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsInfo {
    pub fs_id: String,
    pub protocol: String,
    pub path: String,
    pub size: u64,
    pub mode: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub atime: Option<Timestamp>,
    pub mtime: Option<Timestamp>,
    pub ctime: Option<Timestamp>,
}

impl FsInfo {
    /// Raise every time field to the max of `self` and `previous`.
    ///
    /// Times only ever move forward across re-indexing, even if a later
    /// source reports an older value.
    pub fn watermark(&mut self, previous: &FsInfo) {
        self.atime = max_timestamp(self.atime, previous.atime);
        self.mtime = max_timestamp(self.mtime, previous.mtime);
        self.ctime = max_timestamp(self.ctime, previous.ctime);
    }

    pub fn path_info(&self) -> PathInfo {
        PathInfo::new(&self.fs_id, &self.protocol, &self.path)
    }
}

/// Persisted metadata for one data object (`data_object_info/.../meta`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataObjectMeta {
    /// File extension without the dot.
    #[serde(rename = "type")]
    pub file_type: String,
    pub first_indexed: Timestamp,
    pub last_indexed: Timestamp,
    pub last_indexed_by: String,
    /// Sorted, deduplicated tag set.
    pub tags: BTreeSet<String>,
    /// Every distinct location this object has been indexed from.
    pub alternate_paths: Vec<PathInfo>,
    pub fs: FsInfo,
}

impl DataObjectMeta {
    /// Record a location, returning `true` if it had not been seen before.
    pub fn add_alternate_path(&mut self, path: PathInfo) -> bool {
        if self.alternate_paths.contains(&path) {
            false
        } else {
            self.alternate_paths.push(path);
            true
        }
    }

    /// Union `tags` into the tag set.
    pub fn merge_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
    }

    /// Apply a tag update, returning `true` if the set changed.
    pub fn update_tags(&mut self, add: &[String], remove: &[String]) -> bool {
        let before = self.tags.clone();
        self.tags.extend(add.iter().cloned());
        for tag in remove {
            self.tags.remove(tag);
        }
        before != self.tags
    }
}

/// One entry in a data object's annotation version history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationMeta {
    /// 1-based version, fixed when the annotation content is first seen.
    pub version: u32,
    /// Latest modification time observed on the annotation's source file.
    pub mtime: Option<Timestamp>,
    pub first_indexed_time: Timestamp,
    pub last_indexed_time: Timestamp,
}

/// Internal half of an annotation payload (`objects/annotations/.../ldb`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationLdbContent {
    pub user_version: Option<u32>,
    pub schema_version: Option<u32>,
}

impl AnnotationLdbContent {
    /// Canonical (key-sorted, compact) JSON bytes, the form that is hashed.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&serde_json::to_value(self)?)
    }
}
