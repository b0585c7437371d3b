//! Discovery and indexing of data objects and annotations for LDB.
//!
//! Indexing turns files on any registered filesystem into content-addressed
//! entries in an instance: data object meta keyed by content hash, and
//! versioned annotations attached to those objects. Re-indexing the same
//! files is idempotent; only bookkeeping timestamps move.
//!
//! # Key Types
//!
//! - [`Indexer`] -- Runs discovery, ephemeral import and per-item writes
//! - [`IndexOptions`] -- Format, tags and merge strategy for a run
//! - [`Format`] -- How data objects and annotations are associated
//! - [`IndexingResult`] -- Running totals and the indexed collection
//! - [`FsPath`] -- A path on a specific filesystem
//! - [`ItemContext`] -- The per-item indexing algorithm

pub mod annotation_only;
pub mod discovery;
pub mod error;
pub mod format;
pub mod import;
pub mod indexer;
pub mod inferred;
pub mod item;
pub mod label_studio;
pub mod result;

pub use discovery::{discover, expand_dirs, Discovered, FsPath};
pub use error::{IndexError, IndexResult};
pub use format::{Format, MergeStrategy};
pub use import::{import_ephemeral, Imported, AUTOIMPORT_DIR};
pub use indexer::{IndexOptions, Indexer};
pub use inferred::InferOptions;
pub use item::{file_hash, AnnotationInput, DataObjectSource, ItemContext};
pub use result::{IndexedObject, IndexingResult};
