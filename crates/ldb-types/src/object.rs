use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Number of hex characters used for the shard directory of a hash path.
pub const SHARD_PREFIX_LEN: usize = 3;

const DIGEST_LEN: usize = 16;

/// Content-addressed identifier for data objects, annotations, collections
/// and dataset versions.
///
/// An `ObjectId` is a 128-bit content digest. Identical content always
/// produces the same `ObjectId`. It serializes as 32 lowercase hex
/// characters, the same text used for file names in the object store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; DIGEST_LEN]);

impl ObjectId {
    /// Create an `ObjectId` from a pre-computed digest.
    pub const fn from_digest(digest: [u8; DIGEST_LEN]) -> Self {
        Self(digest)
    }

    /// The raw 16-byte digest.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// The user-facing data object identifier, `0x` followed by the hex digest.
    pub fn to_prefixed(&self) -> String {
        format!("0x{}", self.to_hex())
    }

    /// Split the hex digest into its shard directory and file name.
    pub fn shard(&self) -> (String, String) {
        let hex = self.to_hex();
        let (dir, rest) = hex.split_at(SHARD_PREFIX_LEN);
        (dir.to_string(), rest.to_string())
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(format!("{s:?}: {e}")))?;
        if bytes.len() != DIGEST_LEN {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; DIGEST_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Parse a `0x`-prefixed data object identifier.
    pub fn from_prefixed(s: &str) -> Result<Self, TypeError> {
        match s.strip_prefix("0x") {
            Some(hex) => Self::from_hex(hex),
            None => Err(TypeError::InvalidHex(format!(
                "{s:?}: data object identifiers start with 0x"
            ))),
        }
    }

    /// Reassemble an id from a shard directory name and file name.
    pub fn from_shard(dir: &str, rest: &str) -> Result<Self, TypeError> {
        Self::from_hex(&format!("{dir}{rest}"))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; DIGEST_LEN]> for ObjectId {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> ObjectId {
        ObjectId::from_digest([
            0x2c, 0x4a, 0x1a, 0x9f, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99,
            0xaa, 0xbb,
        ])
    }

    #[test]
    fn hex_is_32_chars() {
        assert_eq!(sample().to_hex().len(), 32);
        assert_eq!(sample().to_hex(), "2c4a1a9f00112233445566778899aabb");
    }

    #[test]
    fn shard_splits_after_three_chars() {
        let (dir, rest) = sample().shard();
        assert_eq!(dir, "2c4");
        assert_eq!(rest, "a1a9f00112233445566778899aabb");
        assert_eq!(ObjectId::from_shard(&dir, &rest).unwrap(), sample());
    }

    #[test]
    fn prefixed_form() {
        let id = sample();
        let text = id.to_prefixed();
        assert!(text.starts_with("0x"));
        assert_eq!(ObjectId::from_prefixed(&text).unwrap(), id);
        assert!(ObjectId::from_prefixed(&id.to_hex()).is_err());
    }

    #[test]
    fn rejects_wrong_length() {
        let err = ObjectId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 16,
                actual: 2
            }
        );
        assert!(matches!(
            ObjectId::from_hex("zz").unwrap_err(),
            TypeError::InvalidHex(_)
        ));
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = sample();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn ordering_matches_hex_ordering() {
        let a = ObjectId::from_digest([0; 16]);
        let b = ObjectId::from_digest([1; 16]);
        assert!(a < b);
        assert!(a.to_hex() < b.to_hex());
    }

    proptest! {
        #[test]
        fn hex_roundtrip(bytes in proptest::array::uniform16(any::<u8>())) {
            let id = ObjectId::from_digest(bytes);
            prop_assert_eq!(ObjectId::from_hex(&id.to_hex()).unwrap(), id);
        }
    }
}
