//! Error types for the SDK.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by [`crate::Ldb`] operations.
#[derive(Debug, Error)]
pub enum SdkError {
    /// No instance exists at the resolved directory.
    #[error("No LDB instance at {}. Run `ldb init` first", .0.display())]
    NotInitialized(PathBuf),

    /// `init` was pointed at a directory that already has files.
    #[error("directory not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    /// No default instance location can be derived.
    #[error("unable to determine the home directory; set LDB_DIR")]
    NoHomeDirectory,

    /// Command arguments cannot be resolved.
    #[error("{0}")]
    InvalidArgument(String),

    /// The path arguments matched no data objects.
    #[error("No files found matching {0:?}")]
    NoFilesFound(Vec<String>),

    /// A config file is not valid TOML for its schema.
    #[error("invalid config file {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A config could not be serialized.
    #[error("unable to write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Indexing failed; may carry partial results.
    #[error(transparent)]
    Index(#[from] ldb_index::IndexError),

    #[error(transparent)]
    Dataset(#[from] ldb_dataset::DatasetError),

    #[error(transparent)]
    Workspace(#[from] ldb_workspace::WorkspaceError),

    #[error(transparent)]
    Storage(#[from] ldb_storage::StorageError),

    #[error(transparent)]
    Store(#[from] ldb_store::StoreError),

    #[error(transparent)]
    Collection(#[from] ldb_collection::CollectionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
