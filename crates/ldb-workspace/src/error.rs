//! Error types for the workspace crate.

use std::path::PathBuf;

/// Errors that can occur during workspace operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// No workspace dataset is staged at this directory.
    #[error("No workspace dataset staged at {}", .0.display())]
    NotAWorkspace(PathBuf),

    /// Staging would overwrite files in a directory that is not a workspace.
    #[error("Workspace is not empty: {}", .0.display())]
    NotEmpty(PathBuf),

    /// The staged collection differs from its parent version.
    #[error("Unsaved changes to workspace dataset {dataset}. Commit or use --force to discard them")]
    Uncommitted { dataset: String },

    /// A file in the collection directory is not a valid entry.
    #[error("invalid workspace entry {}: {reason}", .path.display())]
    InvalidEntry { path: PathBuf, reason: String },

    /// The workspace descriptor could not be read or written.
    #[error("invalid workspace dataset file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Resolving the parent version failed.
    #[error(transparent)]
    Dataset(#[from] ldb_dataset::DatasetError),

    /// I/O error while reading or writing workspace files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for workspace results.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
