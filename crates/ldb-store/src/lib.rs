//! Hash-sharded object storage for LDB instances.
//!
//! Everything an LDB instance persists lives under a handful of areas keyed
//! by content hash, each split into a 3-character shard directory and the
//! remaining characters so directory fan-out stays bounded:
//!
//! ```text
//! data_object_info/<h[:3]>/<h[3:]>/meta
//! data_object_info/<h[:3]>/<h[3:]>/annotations/<annotation hash>
//! data_object_info/<h[:3]>/<h[3:]>/current
//! objects/annotations/<h[:3]>/<h[3:]>/{user,ldb}
//! objects/collections/<h[:3]>/<h[3:]>
//! objects/dataset_versions/<h[:3]>/<h[3:]>
//! datasets/<name>
//! ```
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`FsObjectStore`] -- directory-backed store with atomic writes
//! - [`InMemoryObjectStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! [`Catalog`] layers the typed instance layout on top of any backend.
//!
//! # Design Rules
//!
//! 1. Payloads keyed by content hash are written once; rewriting them is a no-op.
//! 2. Metadata files (meta, version history, `current`, dataset records) are
//!    overwritten in place.
//! 3. A reader never observes a partially written file: writes go to a
//!    temporary file in the target directory and are renamed into place.
//! 4. No cross-process locking; the usage model is single writer, many readers.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod catalog;
pub mod error;
pub mod fs;
pub mod key;
pub mod layout;
pub mod memory;
pub mod object;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use catalog::Catalog;
pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use key::StoreKey;
pub use memory::InMemoryObjectStore;
pub use object::{AnnotationLdbContent, AnnotationMeta, DataObjectMeta, FsInfo, PathInfo};
pub use traits::{ObjectStore, WriteMode};
