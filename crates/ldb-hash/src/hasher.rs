use std::io::{self, Read};

use ldb_types::ObjectId;

/// Size of each read when hashing a stream.
pub const CHUNK_SIZE: usize = 1 << 20;

/// Algorithm name a storage backend must report for its native checksum to
/// be used in place of a locally computed digest.
pub const PROVIDER_ALGORITHM: &str = "blake3-128";

/// 128-bit BLAKE3 content hasher.
///
/// Digests are the first 16 bytes of the BLAKE3 output. Hashing is a pure
/// function of the input bytes: the same bytes always produce the same
/// [`ObjectId`] regardless of where they were read from.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes.
    pub fn hash(data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(data);
        finish(&hasher)
    }

    /// Hash the concatenation of several byte slices without copying them.
    pub fn hash_parts(parts: &[&[u8]]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        finish(&hasher)
    }

    /// Hash a serializable value as compact JSON.
    ///
    /// Values built from `serde_json::Value` maps serialize with sorted keys,
    /// so two documents that differ only in key order hash identically.
    pub fn hash_json<T: serde::Serialize>(value: &T) -> Result<ObjectId, HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(Self::hash(&data))
    }

    /// Hash everything a reader yields, reading [`CHUNK_SIZE`] bytes at a time.
    pub fn hash_reader<R: Read>(mut reader: R) -> Result<ObjectId, HasherError> {
        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HasherError::Io(e)),
            };
            hasher.update(&buf[..n]);
        }
        Ok(finish(&hasher))
    }

    /// Fold chunks produced by `next_chunk` until it returns `None`.
    ///
    /// Used by backends that hand out data in their own chunking rather than
    /// through [`Read`].
    pub fn hash_stream<F>(mut next_chunk: F) -> Result<ObjectId, HasherError>
    where
        F: FnMut() -> io::Result<Option<Vec<u8>>>,
    {
        let mut hasher = blake3::Hasher::new();
        while let Some(chunk) = next_chunk()? {
            hasher.update(&chunk);
        }
        Ok(finish(&hasher))
    }

    /// Use a backend-supplied checksum when it is in our digest format.
    ///
    /// Returns `None` when the checksum uses another algorithm or is not a
    /// 128-bit hex digest, in which case the caller must stream the content.
    pub fn from_provider_checksum(checksum: &ProviderChecksum) -> Option<ObjectId> {
        if checksum.algorithm != PROVIDER_ALGORITHM {
            return None;
        }
        ObjectId::from_hex(checksum.value.trim_matches('"')).ok()
    }

    /// Verify that data produces the expected object ID.
    pub fn verify(data: &[u8], expected: &ObjectId) -> bool {
        Self::hash(data) == *expected
    }
}

fn finish(hasher: &blake3::Hasher) -> ObjectId {
    let full = hasher.finalize();
    let mut digest = [0u8; 16];
    digest.copy_from_slice(&full.as_bytes()[..16]);
    ObjectId::from_digest(digest)
}

/// A content checksum reported by a storage backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderChecksum {
    /// Algorithm name as reported by the backend.
    pub algorithm: String,
    /// Checksum text, usually hex.
    pub value: String,
}

impl ProviderChecksum {
    pub fn new(algorithm: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            value: value.into(),
        }
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error while hashing: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(ContentHasher::hash(data), ContentHasher::hash(data));
    }

    #[test]
    fn digest_is_blake3_prefix() {
        let id = ContentHasher::hash(b"abc");
        let full = blake3::hash(b"abc");
        assert_eq!(id.as_bytes()[..], full.as_bytes()[..16]);
        assert_eq!(id.to_hex().len(), 32);
    }

    #[test]
    fn different_data_different_hash() {
        assert_ne!(ContentHasher::hash(b"a"), ContentHasher::hash(b"b"));
    }

    #[test]
    fn reader_matches_in_memory_hash_across_chunk_boundaries() {
        let data: Vec<u8> = (0..(CHUNK_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        let streamed = ContentHasher::hash_reader(Cursor::new(&data)).unwrap();
        assert_eq!(streamed, ContentHasher::hash(&data));
    }

    #[test]
    fn stream_of_chunks_matches_hash() {
        let mut chunks = vec![b"ab".to_vec(), b"cd".to_vec(), b"e".to_vec()].into_iter();
        let id = ContentHasher::hash_stream(|| Ok(chunks.next())).unwrap();
        assert_eq!(id, ContentHasher::hash(b"abcde"));
    }

    #[test]
    fn parts_match_concatenation() {
        let id = ContentHasher::hash_parts(&[b"{\"a\":1}", b"[2]"]);
        assert_eq!(id, ContentHasher::hash(b"{\"a\":1}[2]"));
    }

    #[test]
    fn json_hash_ignores_key_order() {
        let a: serde_json::Value = serde_json::from_str(r#"{"x": 1, "y": {"b": 2, "a": 3}}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"y": {"a": 3, "b": 2}, "x": 1}"#).unwrap();
        assert_eq!(
            ContentHasher::hash_json(&a).unwrap(),
            ContentHasher::hash_json(&b).unwrap()
        );
    }

    #[test]
    fn provider_checksum_accepted_only_for_matching_algorithm() {
        let expected = ContentHasher::hash(b"payload");
        let ok = ProviderChecksum::new(PROVIDER_ALGORITHM, expected.to_hex());
        assert_eq!(ContentHasher::from_provider_checksum(&ok), Some(expected));

        let md5 = ProviderChecksum::new("md5", expected.to_hex());
        assert_eq!(ContentHasher::from_provider_checksum(&md5), None);

        let bad = ProviderChecksum::new(PROVIDER_ALGORITHM, "not-hex");
        assert_eq!(ContentHasher::from_provider_checksum(&bad), None);
    }

    #[test]
    fn verify_detects_tampering() {
        let id = ContentHasher::hash(b"original");
        assert!(ContentHasher::verify(b"original", &id));
        assert!(!ContentHasher::verify(b"tampered", &id));
    }
}
