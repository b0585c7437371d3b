//! High-level SDK for LDB instances.
//!
//! Wraps the instance directory, its config and storage registry in one
//! [`Ldb`] handle and exposes the user-facing operations on it. This is the
//! main entry point for tools embedding LDB.
//!
//! # Key Types
//!
//! - [`Ldb`] -- An open instance: init, index, tag, stage, add, commit, diff
//! - [`Config`] -- The instance's TOML config
//! - [`ArgType`] -- How a command argument selects data objects
//! - [`AddSummary`] / [`DeleteSummary`] -- Workspace edit counts
//! - [`DiffReport`] -- Versioned diff rows and their summary

pub mod add;
pub mod commit;
pub mod config;
pub mod diff;
pub mod error;
pub mod instance;
pub mod status;

pub use add::{resolve_arg_type, AddSummary, ArgType, DeleteSummary};
pub use config::{default_instance_dir, global_base, Config, CoreConfig, IndexConfig, LDB_DIR_ENV};
pub use diff::DiffReport;
pub use error::{SdkError, SdkResult};
pub use instance::{Ldb, TagSummary};

// Re-export key types
pub use ldb_collection::{Collection, DiffSummary, DiffType, Predicate};
pub use ldb_dataset::{CommitOutcome, Dataset, DatasetIdentifier, VersionedDiffEntry};
pub use ldb_index::{Format, IndexError, IndexOptions, IndexingResult, InferOptions, MergeStrategy};
pub use ldb_storage::{AddOutcome, FsOptions, StorageLocation};
pub use ldb_types::{ObjectId, Timestamp};
pub use ldb_workspace::{CollectionStatus, Workspace};
