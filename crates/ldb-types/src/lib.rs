//! Foundation types for LDB.
//!
//! This crate provides the identity and temporal types shared by every other
//! LDB crate: the 128-bit content digest that names data objects,
//! annotations, collections and dataset versions, plus the timestamp and
//! user helpers recorded in metadata.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (128-bit digest, hex encoded)
//! - [`Timestamp`] -- Local-offset wall-clock time, serialized as RFC 3339
//! - [`current_user`] -- Name recorded in `last_indexed_by` / `created_by`

pub mod error;
pub mod identity;
pub mod object;
pub mod temporal;

pub use error::TypeError;
pub use identity::current_user;
pub use object::{ObjectId, SHARD_PREFIX_LEN};
pub use temporal::{max_timestamp, Timestamp};
