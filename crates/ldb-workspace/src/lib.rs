//! Workspace staging for LDB.
//!
//! A workspace is a working directory bound to one dataset. It holds the
//! collection being built as one file per data object, so single-object
//! edits never rewrite the whole collection, and a small descriptor naming
//! the dataset and the version it was staged from.
//!
//! # Key Types
//!
//! - [`Workspace`] -- A staged directory: descriptor, collection, clean check
//! - [`WorkspaceDataset`] -- Dataset name, parent version, tags, staged time
//! - [`WorkspaceCollection`] -- Sharded on-disk collection with O(1) add/remove
//! - [`CollectionStatus`] -- Entry and annotation counts for `status`

pub mod collection;
pub mod error;
pub mod status;
pub mod workspace;

pub use collection::WorkspaceCollection;
pub use error::{WorkspaceError, WorkspaceResult};
pub use status::CollectionStatus;
pub use workspace::{Workspace, WorkspaceDataset, COLLECTION_DIR, DATASET_FILE, WORKSPACE_DIR};
