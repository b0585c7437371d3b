//! Datasets and their version graph.
//!
//! A dataset is a named, append-only list of versions. Each version points
//! to an immutable collection and to the version it was staged from, which
//! makes the history a lightweight commit graph.
//!
//! # Architecture
//!
//! - **Dataset records** (`datasets/<name>`) are mutable and rewritten on
//!   every append.
//! - **Version records** and **collections** are content addressed and
//!   written once.
//! - **`ds:root`** is not stored; it is every indexed data object paired
//!   with its current annotation.
//!
//! # Key Types
//!
//! - [`DatasetIdentifier`] -- Parsed `ds:<name>[.v<N>]` argument
//! - [`Dataset`] / [`DatasetVersion`] / [`CommitInfo`] -- Persisted records
//! - [`DatasetStore`] -- Typed dataset access, implemented for [`ldb_store::Catalog`]
//! - [`commit()`] -- Append a collection as a new version
//! - [`VersionedDiffEntry`] -- Diff row with annotation versions and path

pub mod commit;
pub mod diff;
pub mod error;
pub mod identifier;
pub mod record;
pub mod store;

pub use commit::{commit, CommitOutcome, CommitRequest};
pub use diff::{versioned_diff, VersionedDiffEntry};
pub use error::{DatasetError, DatasetResult};
pub use identifier::{format_identifier, validate_dataset_name, DatasetIdentifier, DATASET_PREFIX, ROOT};
pub use record::{CommitInfo, Dataset, DatasetVersion};
pub use store::DatasetStore;
