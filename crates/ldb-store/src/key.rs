use std::fmt;
use std::path::PathBuf;

use ldb_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// A relative, slash-separated location inside an object store.
///
/// Keys never contain empty, `.` or `..` segments, so every backend can map
/// them onto its own namespace without escaping the store root. The empty
/// key names the store root itself.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StoreKey(String);

impl StoreKey {
    /// The store root.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parse a key from slash-separated text.
    pub fn parse(s: &str) -> StoreResult<Self> {
        let mut key = Self::root();
        for segment in s.split('/').filter(|seg| !seg.is_empty()) {
            key = key.child(segment)?;
        }
        Ok(key)
    }

    /// Append one segment.
    pub fn child(&self, segment: &str) -> StoreResult<Self> {
        validate_segment(segment)?;
        if self.0.is_empty() {
            Ok(Self(segment.to_string()))
        } else {
            Ok(Self(format!("{}/{}", self.0, segment)))
        }
    }

    /// `<self>/<hash[:3]>/<hash[3:]>`.
    pub fn sharded(&self, id: &ObjectId) -> Self {
        let (dir, rest) = id.shard();
        // Hex digests are always valid segments.
        let prefix = if self.0.is_empty() {
            String::new()
        } else {
            format!("{}/", self.0)
        };
        Self(format!("{prefix}{dir}/{rest}"))
    }

    /// Returns `true` for the store root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// The final segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// The key one level up, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// The key as a relative filesystem path.
    pub fn to_path(&self) -> PathBuf {
        self.segments().collect()
    }
}

fn validate_segment(segment: &str) -> StoreResult<()> {
    let reason = if segment.is_empty() {
        Some("empty segment")
    } else if segment == "." || segment == ".." {
        Some("relative segment")
    } else if segment.contains('/') || segment.contains('\\') {
        Some("segment contains a path separator")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(StoreError::InvalidKey {
            key: segment.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

impl fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreKey({:?})", self.0)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
