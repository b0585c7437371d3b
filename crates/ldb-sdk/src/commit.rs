//! Staging datasets into workspaces and committing them back.

use std::path::Path;

use ldb_collection::Collection;
use ldb_dataset::{
    commit, validate_dataset_name, CommitOutcome, CommitRequest, DatasetError, DatasetIdentifier,
    DatasetStore,
};
use ldb_types::Timestamp;
use ldb_workspace::{Workspace, WorkspaceDataset};
use tracing::info;

use crate::error::SdkResult;
use crate::instance::Ldb;

impl Ldb {
    /// Bind the directory `root` to a dataset and fill it with that
    /// dataset's collection.
    ///
    /// `identifier` is `ds:<name>` for the latest version or
    /// `ds:<name>.v<N>` for a specific one. A name with no dataset yet
    /// starts an empty workspace that creates the dataset on its first
    /// commit. Without `force`, uncommitted changes in an existing
    /// workspace and unrelated files in `root` are refused.
    pub fn stage(&self, identifier: &str, root: &Path, force: bool) -> SdkResult<Workspace> {
        let identifier = DatasetIdentifier::parse(identifier)?;
        validate_dataset_name(&identifier.name)?;
        let now = Timestamp::now();

        let mut dataset = WorkspaceDataset::new(&identifier.name, now);
        let collection = match self.catalog().load_dataset(&identifier.name)? {
            Some(_) => {
                let (hash, version) = self
                    .catalog()
                    .find_version(&identifier.name, identifier.version)?;
                dataset.parent = Some(hash);
                dataset.tags = version.tags;
                self.catalog().load_collection(&version.collection)?
            }
            None if identifier.version.is_some() => {
                return Err(DatasetError::NotFound(identifier.name).into())
            }
            None => Collection::new(),
        };

        let workspace = Workspace::stage(root, &dataset, &collection, self.catalog(), force)?;
        Ok(workspace)
    }

    /// Save the workspace at `root` as a new version of its dataset.
    ///
    /// Returns [`CommitOutcome::NothingToCommit`] without writing anything
    /// when the staged collection equals the parent version's. After a
    /// commit the workspace's parent is the new version.
    pub fn commit(&self, root: &Path, message: impl Into<String>) -> SdkResult<CommitOutcome> {
        let workspace = Workspace::open(root)?;
        let dataset = workspace.dataset()?;
        let collection = workspace.collection().read_all()?;
        let time = Timestamp::now();

        let outcome = commit(
            self.catalog(),
            CommitRequest {
                dataset: &dataset.dataset_name,
                parent: dataset.parent,
                collection: &collection,
                tags: dataset.tags.clone(),
                message: message.into(),
                author: self.user().to_string(),
                time,
            },
        )?;
        match &outcome {
            CommitOutcome::Committed { version_hash, identifier, .. } => {
                workspace.record_commit(*version_hash, time)?;
                info!(dataset = %identifier, root = %root.display(), "workspace committed");
            }
            CommitOutcome::NothingToCommit => {
                info!(dataset = %dataset.identifier(), "nothing to commit");
            }
        }
        Ok(outcome)
    }
}
