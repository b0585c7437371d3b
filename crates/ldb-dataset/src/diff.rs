//! Collection diffs decorated for display.

use ldb_collection::{diff_collections, Collection, DiffType};
use ldb_store::Catalog;
use ldb_types::ObjectId;

use crate::error::DatasetResult;

/// A diff entry with per-side annotation version numbers and the data
/// object's canonical path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedDiffEntry {
    pub data_object: ObjectId,
    /// `0` when the left side has no annotation.
    pub annotation_version1: u32,
    /// `0` when the right side has no annotation.
    pub annotation_version2: u32,
    pub path: String,
    pub diff_type: DiffType,
}

/// Diff `left` against `right`, looking up annotation versions and paths.
pub fn versioned_diff(
    catalog: &Catalog,
    left: &Collection,
    right: &Collection,
) -> DatasetResult<Vec<VersionedDiffEntry>> {
    diff_collections(left, right)
        .map(|entry| {
            let meta = catalog.require_data_object_meta(&entry.data_object)?;
            Ok(VersionedDiffEntry {
                data_object: entry.data_object,
                annotation_version1: catalog
                    .annotation_version(&entry.data_object, entry.annotation1.as_ref())?,
                annotation_version2: catalog
                    .annotation_version(&entry.data_object, entry.annotation2.as_ref())?,
                path: meta.fs.path,
                diff_type: entry.diff_type,
            })
        })
        .collect()
}
