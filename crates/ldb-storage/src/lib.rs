//! Storage locations and filesystem access for LDB.
//!
//! A storage location is a registered root directory (or bucket prefix)
//! whose files are considered canonical: data objects found there are
//! referenced in place. Files found anywhere else are either ephemeral
//! (local files that must be copied into the single read-and-add location
//! before indexing) or foreign (rejected unless explicitly allowed).
//!
//! # Key Types
//!
//! - [`StorageLocation`] -- One registered root and its access flags
//! - [`StorageConfig`] -- The registry persisted in the instance `storage` file
//! - [`PathClass`] -- Classification of a discovered path
//! - [`FileSystem`] -- The filesystem capability the indexer consumes
//! - [`LocalFileSystem`] -- Local-disk implementation over `walkdir`/`ignore`
//! - [`FileSystems`] -- Filesystems available to an instance, by protocol

pub mod error;
pub mod fs;
pub mod location;
pub mod path;

pub use error::{StorageError, StorageResult};
pub use fs::{FileInfo, FileSystem, FileSystems, LocalFileSystem, LOCAL_PROTOCOL};
pub use location::{AddOutcome, FsOptions, PathClass, StorageConfig, StorageLocation};
pub use path::{
    absolute_path, is_hidden, isin, normalize_path, split_extension, split_protocol,
    strip_recursive_suffix,
};
