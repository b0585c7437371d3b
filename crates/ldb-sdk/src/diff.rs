//! Comparing datasets, workspaces and other selections.

use std::path::Path;

use ldb_collection::{Collection, DiffSummary, DiffType};
use ldb_dataset::{versioned_diff, DatasetStore, VersionedDiffEntry};
use ldb_workspace::Workspace;

use crate::error::{SdkError, SdkResult};
use crate::instance::Ldb;

/// Diff rows with their summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffReport {
    /// Every data object on either side, `Same` rows included.
    pub entries: Vec<VersionedDiffEntry>,
    pub summary: DiffSummary,
}

impl DiffReport {
    fn new(entries: Vec<VersionedDiffEntry>) -> Self {
        let summary = entries.iter().map(|e| &e.diff_type).collect();
        Self { entries, summary }
    }

    /// Rows that differ.
    pub fn changes(&self) -> impl Iterator<Item = &VersionedDiffEntry> {
        self.entries.iter().filter(|e| e.diff_type != DiffType::Same)
    }
}

impl Ldb {
    /// Diff two selections.
    ///
    /// With no arguments the workspace at `root` is compared against the
    /// version it was staged from. One argument is compared against the
    /// workspace, and two arguments against each other.
    pub fn diff(&self, args: &[String], root: &Path) -> SdkResult<DiffReport> {
        let (left, right) = match args {
            [] => {
                let workspace = Workspace::open(root)?;
                let parent = workspace.dataset()?.parent;
                (
                    self.catalog().version_collection(parent.as_ref())?,
                    workspace.collection().read_all()?,
                )
            }
            [arg] => (
                self.select_one(arg, root)?,
                Workspace::open(root)?.collection().read_all()?,
            ),
            [a, b] => (self.select_one(a, root)?, self.select_one(b, root)?),
            _ => {
                return Err(SdkError::InvalidArgument(
                    "diff takes at most two arguments".to_string(),
                ))
            }
        };
        Ok(DiffReport::new(versioned_diff(self.catalog(), &left, &right)?))
    }

    fn select_one(&self, arg: &str, root: &Path) -> SdkResult<Collection> {
        self.select(&[arg.to_string()], Some(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use ldb_index::{Format, IndexOptions};
    use ldb_storage::{FsOptions, StorageLocation};
    use ldb_types::ObjectId;

    fn indexed() -> (tempfile::TempDir, Ldb, Vec<ObjectId>) {
        let tmp = tempfile::Builder::new().prefix("ldb-diff").tempdir().unwrap();
        let ldb = Ldb::init(tmp.path().join("instance"), false).unwrap();
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();
        for name in ["a", "b", "c"] {
            fs::write(data.join(format!("{name}.png")), name).unwrap();
        }
        let location = StorageLocation::local(&data, false, FsOptions::new()).unwrap();
        ldb.add_storage(location, false).unwrap();
        let options = IndexOptions {
            format: Format::Bare,
            ..IndexOptions::default()
        };
        let result = ldb
            .index(&[data.to_string_lossy().into_owned()], options)
            .unwrap();
        (tmp, ldb, result.data_object_hashes)
    }

    #[test]
    fn workspace_against_parent_and_datasets() {
        let (tmp, ldb, ids) = indexed();
        assert_eq!(ids.len(), 3);
        let root = tmp.path().join("ws");
        let ws = ldb.stage("ds:a", &root, false).unwrap();
        ws.collection().add(&ids[0], None).unwrap();
        ws.collection().add(&ids[1], None).unwrap();
        ldb.commit(&root, "").unwrap();

        ws.collection().remove(&ids[0]).unwrap();
        ws.collection().add(&ids[2], None).unwrap();
        let report = ldb.diff(&[], &root).unwrap();
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.summary.additions, 1);
        assert_eq!(report.summary.deletions, 1);
        for entry in report.changes() {
            assert!(entry.path.ends_with(".png"), "{}", entry.path);
            assert_eq!((entry.annotation_version1, entry.annotation_version2), (0, 0));
        }

        let report = ldb.diff(&["ds:a".to_string()], &root).unwrap();
        assert_eq!(report.changes().count(), 2);

        let report = ldb
            .diff(&["ds:a.v1".to_string(), "ds:a".to_string()], &root)
            .unwrap();
        assert!(report.summary.is_empty());

        let report = ldb
            .diff(&["ds:a".to_string(), "ds:root".to_string()], &root)
            .unwrap();
        assert_eq!(report.summary.additions, 1);

        assert!(ldb.diff(&["a".into(), "b".into(), "c".into()], &root).is_err());
    }
}
