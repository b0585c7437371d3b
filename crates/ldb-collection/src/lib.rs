//! The collection model for LDB.
//!
//! A collection maps data object ids to an optional annotation id. It is the
//! unit that workspaces stage, datasets version, and commands combine.
//!
//! # Key Types
//!
//! - [`Collection`] -- Ordered map of data object to annotation, hashed canonically
//! - [`DiffEntry`] / [`DiffType`] -- One row of a merge-join diff
//! - [`DiffSummary`] -- Addition, deletion and modification counts
//! - [`Predicate`] -- Black-box filter consumed by [`apply_filters`]

pub mod collection;
pub mod diff;
pub mod error;
pub mod filter;

pub use collection::Collection;
pub use diff::{diff, diff_collections, DiffEntry, DiffSummary, DiffType, MergeDiff};
pub use error::{CollectionError, CollectionResult};
pub use filter::{apply_filters, Predicate};
