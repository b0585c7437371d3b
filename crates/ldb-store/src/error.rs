use ldb_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested key was not found.
    #[error("object not found: {0}")]
    NotFound(String),

    /// No data-object-info entry exists for this hash.
    #[error("Data object not found: {}", .0.to_prefixed())]
    DataObjectNotFound(ObjectId),

    /// A key contained an empty, relative, or otherwise unusable segment.
    #[error("invalid store key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error in {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored bytes are malformed or cannot be decoded.
    #[error("corrupt object {key}: {reason}")]
    CorruptObject { key: String, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
