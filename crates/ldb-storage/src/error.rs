//! Error types for the storage crate.

/// Errors from storage registry and filesystem operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The same location is already registered with the same settings.
    #[error("The storage location {0:?} already exists")]
    AlreadyExists(String),

    /// The new location lies inside a registered one.
    #[error("{path:?} is inside existing storage location {existing:?}")]
    InsideExisting { path: String, existing: String },

    /// The new location contains registered ones and `force` was not given.
    #[error(
        "{path:?} is a parent of existing storage locations:\n{}\nUse the --force option to replace them",
        .children.iter().map(|c| format!("  {c:?}")).collect::<Vec<_>>().join("\n")
    )]
    ParentOfExisting { path: String, children: Vec<String> },

    /// The registry as a whole is inconsistent.
    #[error("{0}")]
    Configuration(String),

    /// A glob pattern could not be compiled.
    #[error("invalid glob pattern {pattern:?}: {reason}")]
    Glob { pattern: String, reason: String },

    /// No filesystem is registered for a protocol.
    #[error("unsupported protocol: {0:?}")]
    UnsupportedProtocol(String),

    /// A path has no usable form on this filesystem.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The registry file is not valid JSON.
    #[error("invalid storage file: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for storage results.
pub type StorageResult<T> = Result<T, StorageError>;
