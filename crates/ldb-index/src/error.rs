//! Error types for the index crate.

use ldb_hash::HasherError;
use ldb_store::StoreError;
use ldb_storage::StorageError;
use ldb_types::ObjectId;

use crate::result::IndexingResult;

/// Errors from discovery and indexing.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A non-local file lies outside every registered storage location.
    #[error("Found file outside of configured storage locations: {0}")]
    NotAStorageLocation(String),

    /// Ephemeral files were found but there is nowhere to copy them.
    #[error(
        "Local paths outside of configured storage locations found, \
         but no read-add storage configured. \
         Please add a read-add storage location with `ldb add-storage --read-add`"
    )]
    NoReadAddStorage,

    /// The path arguments matched nothing to index.
    #[error("No files found matching the given paths")]
    NoFilesFound,

    /// Input that cannot be indexed in the requested format.
    #[error("{0}")]
    Indexing(String),

    /// An annotation refers to a data object that was never indexed.
    #[error(
        "Data object not found: {}{}",
        .id.to_prefixed(),
        .path.as_ref().map(|p| format!(" (annotation_file_path={p})")).unwrap_or_default()
    )]
    DataObjectNotFound { id: ObjectId, path: Option<String> },

    /// A JSON file could not be parsed.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Indexing stopped part way through; `partial` holds what was recorded.
    #[error("{source}")]
    Interrupted {
        partial: Box<IndexingResult>,
        #[source]
        source: Box<IndexError>,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hash(#[from] HasherError),
}

impl IndexError {
    /// Results recorded before the failure, if the run got that far.
    pub fn partial(&self) -> Option<&IndexingResult> {
        match self {
            IndexError::Interrupted { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// The underlying error with any partial-result wrapper removed.
    pub fn root(&self) -> &IndexError {
        match self {
            IndexError::Interrupted { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Storage(StorageError::Io(e))
    }
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
