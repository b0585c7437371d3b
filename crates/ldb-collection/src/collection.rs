use std::collections::btree_map;
use std::collections::BTreeMap;

use ldb_hash::ContentHasher;
use ldb_types::ObjectId;

use crate::error::{CollectionError, CollectionResult};

/// An immutable-by-convention mapping from data object to annotation.
///
/// Entries are kept sorted by data object id, so iteration order, the
/// serialized form and therefore the hash only depend on the pair set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collection {
    entries: BTreeMap<ObjectId, Option<ObjectId>>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set the annotation for a data object, returning the previous entry.
    pub fn insert(&mut self, data_object: ObjectId, annotation: Option<ObjectId>) -> Option<Option<ObjectId>> {
        self.entries.insert(data_object, annotation)
    }

    pub fn remove(&mut self, data_object: &ObjectId) -> Option<Option<ObjectId>> {
        self.entries.remove(data_object)
    }

    pub fn contains(&self, data_object: &ObjectId) -> bool {
        self.entries.contains_key(data_object)
    }

    /// `None` if the data object is absent, `Some(None)` if it is present
    /// without an annotation.
    pub fn get(&self, data_object: &ObjectId) -> Option<Option<&ObjectId>> {
        self.entries.get(data_object).map(Option::as_ref)
    }

    /// Entries in data object order.
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, Option<&ObjectId>)> {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    pub fn data_objects(&self) -> impl Iterator<Item = &ObjectId> {
        self.entries.keys()
    }

    /// Number of entries with an annotation.
    pub fn annotated_count(&self) -> usize {
        self.entries.values().filter(|v| v.is_some()).count()
    }

    /// Union of two collections; `other` wins on shared data objects.
    pub fn union(&self, other: &Collection) -> Collection {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    /// In-place right-biased union.
    pub fn merge(&mut self, other: &Collection) {
        self.entries
            .extend(other.entries.iter().map(|(k, v)| (*k, *v)));
    }

    /// Canonical JSON bytes: an object keyed by data object hex, values are
    /// annotation hex or `""`, keys in sorted order, no whitespace.
    pub fn to_bytes(&self) -> Vec<u8> {
        let map: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|(k, v)| (k.to_hex(), v.map(|a| a.to_hex()).unwrap_or_default()))
            .collect();
        // A map of strings always serializes.
        serde_json::to_vec(&map).unwrap_or_default()
    }

    /// Content hash of the canonical bytes.
    pub fn digest(&self) -> ObjectId {
        ContentHasher::hash(&self.to_bytes())
    }

    /// Decode canonical bytes; `null` values are accepted as "no annotation".
    pub fn from_bytes(bytes: &[u8]) -> CollectionResult<Self> {
        let raw: BTreeMap<String, Option<String>> = serde_json::from_slice(bytes)?;
        raw.into_iter()
            .map(|(k, v)| {
                let key = parse_id(&k)?;
                let value = match v.as_deref() {
                    None | Some("") => None,
                    Some(hex) => Some(parse_id(hex)?),
                };
                Ok((key, value))
            })
            .collect()
    }
}

fn parse_id(value: &str) -> CollectionResult<ObjectId> {
    ObjectId::from_hex(value).map_err(|source| CollectionError::InvalidId {
        value: value.to_string(),
        source,
    })
}

impl FromIterator<(ObjectId, Option<ObjectId>)> for Collection {
    fn from_iter<I: IntoIterator<Item = (ObjectId, Option<ObjectId>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(ObjectId, Option<ObjectId>)> for Collection {
    fn extend<I: IntoIterator<Item = (ObjectId, Option<ObjectId>)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for Collection {
    type Item = (ObjectId, Option<ObjectId>);
    type IntoIter = btree_map::IntoIter<ObjectId, Option<ObjectId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = (&'a ObjectId, &'a Option<ObjectId>);
    type IntoIter = btree_map::Iter<'a, ObjectId, Option<ObjectId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
