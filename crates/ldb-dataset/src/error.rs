//! Error types for dataset operations.

use ldb_types::ObjectId;
use thiserror::Error;

/// Errors that can occur while resolving, reading or appending datasets.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// No dataset record exists under this name.
    #[error("Dataset not found: {0}")]
    NotFound(String),

    /// The requested version is past the end of the dataset's history.
    #[error("{identifier} does not exist\nThe latest version is {latest}")]
    VersionNotFound { identifier: String, latest: String },

    /// The dataset name cannot be used.
    #[error("invalid dataset name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The argument is not of the form `ds:<name>[.v<N>]`.
    #[error("invalid dataset identifier {identifier:?}: {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    /// A dataset version record is referenced but missing from the store.
    #[error("dataset version not found: {}", .0.to_prefixed())]
    VersionRecordNotFound(ObjectId),

    /// A collection is referenced but missing from the store.
    #[error("collection not found: {}", .0.to_prefixed())]
    CollectionNotFound(ObjectId),

    /// A stored record could not be decoded.
    #[error("invalid {kind} record: {source}")]
    Json {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Error from the object store.
    #[error(transparent)]
    Store(#[from] ldb_store::StoreError),

    /// Error decoding a stored collection.
    #[error(transparent)]
    Collection(#[from] ldb_collection::CollectionError),
}

/// Convenience alias for dataset results.
pub type DatasetResult<T> = Result<T, DatasetError>;
