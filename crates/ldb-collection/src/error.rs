//! Error types for the collection crate.

/// Errors that can occur while decoding or filtering collections.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    /// The serialized collection is not a JSON object of strings.
    #[error("invalid collection JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A key or value is not a valid object id.
    #[error("invalid id {value:?} in collection: {source}")]
    InvalidId {
        value: String,
        source: ldb_types::TypeError,
    },

    /// A predicate returned a different number of results than it was given.
    #[error("filter returned {actual} results for {expected} values")]
    PredicateLength { expected: usize, actual: usize },

    /// Loading the value a predicate is evaluated against failed.
    #[error("could not load filter value: {0}")]
    Value(String),
}

/// Convenience alias for collection results.
pub type CollectionResult<T> = Result<T, CollectionError>;
