//! Content hashing for LDB.
//!
//! Every identity in an LDB instance is a 128-bit digest produced here: data
//! objects from their bytes (streamed in fixed-size chunks), annotations from
//! their internal and user JSON payloads, collections and dataset versions
//! from their canonical JSON serialization.
//!
//! All hashing wraps an established library (BLAKE3); no custom primitives.

pub mod hasher;

pub use hasher::{ContentHasher, HasherError, ProviderChecksum, CHUNK_SIZE, PROVIDER_ALGORITHM};
