//! Read-only summaries: `status` and the dataset listing.

use std::path::Path;

use ldb_dataset::{Dataset, DatasetIdentifier, DatasetStore, ROOT};
use ldb_workspace::{CollectionStatus, Workspace};

use crate::error::SdkResult;
use crate::instance::Ldb;

impl Ldb {
    /// Counts for a dataset version, `ds:root`, or with no identifier the
    /// workspace at `root`.
    pub fn status(&self, identifier: Option<&str>, root: &Path) -> SdkResult<CollectionStatus> {
        let Some(identifier) = identifier else {
            let workspace = Workspace::open(root)?;
            let dataset = workspace.dataset()?;
            let collection = workspace.collection().read_all()?;
            return Ok(CollectionStatus::new(dataset.dataset_name, 0, &collection));
        };
        let identifier = DatasetIdentifier::parse(identifier)?;
        if identifier.is_root() {
            let collection = self.catalog().root_collection()?;
            return Ok(CollectionStatus::new(ROOT, 0, &collection));
        }
        let (_, version) = self
            .catalog()
            .find_version(&identifier.name, identifier.version)?;
        let collection = self.catalog().load_collection(&version.collection)?;
        Ok(CollectionStatus::new(identifier.name, version.version, &collection)
            .with_commit_info(version.commit_info))
    }

    /// Every dataset, in name order.
    pub fn datasets(&self) -> SdkResult<Vec<Dataset>> {
        Ok(self.catalog().datasets()?)
    }
}
