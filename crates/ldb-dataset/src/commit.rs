//! Appending versions to datasets.

use ldb_collection::Collection;
use ldb_types::{ObjectId, Timestamp};
use tracing::info;

use crate::error::DatasetResult;
use crate::identifier::{format_identifier, validate_dataset_name};
use crate::record::{CommitInfo, Dataset, DatasetVersion};
use crate::store::DatasetStore;

/// Everything needed to append one version.
#[derive(Clone, Debug)]
pub struct CommitRequest<'a> {
    pub dataset: &'a str,
    /// Version the collection was staged from.
    pub parent: Option<ObjectId>,
    pub collection: &'a Collection,
    pub tags: Vec<String>,
    pub message: String,
    pub author: String,
    pub time: Timestamp,
}

/// What [`commit`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The collection equals its parent's; nothing was written.
    NothingToCommit,
    Committed {
        /// e.g. `ds:cats.v3`
        identifier: String,
        version: u32,
        version_hash: ObjectId,
        collection_hash: ObjectId,
    },
}

/// Append `request.collection` as a new version of `request.dataset`.
///
/// Nothing is written when the collection's pair set equals the parent
/// version's collection (or is empty without a parent). The dataset record
/// is rewritten last, after the collection and version record are stored.
pub fn commit<S>(store: &S, request: CommitRequest<'_>) -> DatasetResult<CommitOutcome>
where
    S: DatasetStore + ?Sized,
{
    validate_dataset_name(request.dataset)?;
    let parent_collection = store.version_collection(request.parent.as_ref())?;
    if &parent_collection == request.collection {
        return Ok(CommitOutcome::NothingToCommit);
    }

    let (collection_hash, _) = store.save_collection(request.collection)?;
    let mut dataset = match store.load_dataset(request.dataset)? {
        Some(dataset) => dataset,
        None => Dataset::new(request.dataset, request.author.clone(), request.time),
    };
    let version = dataset.latest_version() + 1;
    let record = DatasetVersion {
        version,
        parent: request.parent,
        collection: collection_hash,
        tags: request.tags,
        commit_info: CommitInfo {
            created_by: request.author,
            commit_time: request.time,
            commit_message: request.message,
        },
    };
    let version_hash = store.save_version(&record)?;
    dataset.versions.push(version_hash);
    store.save_dataset(&dataset)?;

    let identifier = format_identifier(&dataset.name, Some(version));
    info!(dataset = %identifier, version = %version_hash, entries = request.collection.len(), "committed");
    Ok(CommitOutcome::Committed {
        identifier,
        version,
        version_hash,
        collection_hash,
    })
}
