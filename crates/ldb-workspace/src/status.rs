//! Summary counts for a workspace or dataset version.

use std::fmt;

use ldb_collection::Collection;
use ldb_dataset::{format_identifier, CommitInfo};

/// What `status` reports about a collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionStatus {
    pub dataset_name: String,
    /// `0` for a workspace, otherwise the resolved version number.
    pub dataset_version: u32,
    pub num_data_objects: usize,
    /// Entries with a non-empty annotation.
    pub num_annotations: usize,
    /// Present for committed versions.
    pub commit_info: Option<CommitInfo>,
}

impl CollectionStatus {
    pub fn new(dataset_name: impl Into<String>, dataset_version: u32, collection: &Collection) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            dataset_version,
            num_data_objects: collection.len(),
            num_annotations: collection.annotated_count(),
            commit_info: None,
        }
    }

    pub fn with_commit_info(mut self, info: CommitInfo) -> Self {
        self.commit_info = Some(info);
        self
    }

    /// `ds:<name>` for a workspace, `ds:<name>.v<N>` for a version.
    pub fn identifier(&self) -> String {
        let version = (self.dataset_version > 0).then_some(self.dataset_version);
        format_identifier(&self.dataset_name, version)
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset: {}", self.identifier())?;
        if let Some(info) = &self.commit_info {
            writeln!(f, "Committed by {} at {}", info.created_by, info.commit_time)?;
            if !info.commit_message.is_empty() {
                writeln!(f, "    {}", info.commit_message)?;
            }
        }
        writeln!(f, "Num data objects: {:8}", self.num_data_objects)?;
        write!(f, "Num annotations:  {:8}", self.num_annotations)
    }
}

#[cfg(test)]
mod tests {
    use ldb_types::{ObjectId, Timestamp};

    use super::*;

    fn id(n: u8) -> ObjectId {
        ObjectId::from([n; 16])
    }

    #[test]
    fn counts_entries_and_annotations() {
        let c: Collection = [(id(1), Some(id(9))), (id(2), None), (id(3), Some(id(9)))]
            .into_iter()
            .collect();
        let status = CollectionStatus::new("cats", 0, &c);
        assert_eq!(status.num_data_objects, 3);
        assert_eq!(status.num_annotations, 2);
        assert_eq!(status.identifier(), "ds:cats");
        assert_eq!(
            status.to_string(),
            "Dataset: ds:cats\nNum data objects:        3\nNum annotations:         2"
        );
    }

    #[test]
    fn versions_show_commit_info() {
        let info = CommitInfo {
            created_by: "alice".into(),
            commit_time: Timestamp::parse("2024-03-01T10:00:00.000000+00:00").unwrap(),
            commit_message: "first".into(),
        };
        let status = CollectionStatus::new("cats", 2, &Collection::new()).with_commit_info(info);
        let text = status.to_string();
        assert!(text.starts_with("Dataset: ds:cats.v2\nCommitted by alice at 2024-03-01T10:00:00"));
        assert!(text.contains("\n    first\n"));
    }
}
