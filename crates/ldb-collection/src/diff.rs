//! Merge-join diff of two collections.
//!
//! Both sides are consumed once, in data object order, so diffing never
//! holds more than one pending entry per side regardless of size.

use std::fmt;
use std::iter::Peekable;

use ldb_types::ObjectId;

use crate::collection::Collection;

/// How a data object differs between the two sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiffType {
    Same,
    Addition,
    Deletion,
    Modification,
}

impl DiffType {
    /// Single-character marker used in listings.
    pub fn marker(self) -> &'static str {
        match self {
            DiffType::Same => " ",
            DiffType::Addition => "+",
            DiffType::Deletion => "-",
            DiffType::Modification => "m",
        }
    }
}

/// One data object present on at least one side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffEntry {
    pub data_object: ObjectId,
    /// Annotation on the left side, `None` if absent or unannotated.
    pub annotation1: Option<ObjectId>,
    /// Annotation on the right side, `None` if absent or unannotated.
    pub annotation2: Option<ObjectId>,
    pub diff_type: DiffType,
}

/// Iterator produced by [`diff`].
pub struct MergeDiff<L: Iterator, R: Iterator> {
    left: Peekable<L>,
    right: Peekable<R>,
}

impl<L, R> Iterator for MergeDiff<L, R>
where
    L: Iterator<Item = (ObjectId, Option<ObjectId>)>,
    R: Iterator<Item = (ObjectId, Option<ObjectId>)>,
{
    type Item = DiffEntry;

    fn next(&mut self) -> Option<DiffEntry> {
        let order = match (self.left.peek(), self.right.peek()) {
            (None, None) => return None,
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (Some((l, _)), Some((r, _))) => l.cmp(r),
        };
        match order {
            std::cmp::Ordering::Less => {
                let (data_object, annotation) = self.left.next()?;
                Some(DiffEntry {
                    data_object,
                    annotation1: annotation,
                    annotation2: None,
                    diff_type: DiffType::Deletion,
                })
            }
            std::cmp::Ordering::Greater => {
                let (data_object, annotation) = self.right.next()?;
                Some(DiffEntry {
                    data_object,
                    annotation1: None,
                    annotation2: annotation,
                    diff_type: DiffType::Addition,
                })
            }
            std::cmp::Ordering::Equal => {
                let (data_object, annotation1) = self.left.next()?;
                let (_, annotation2) = self.right.next()?;
                let diff_type = if annotation1 == annotation2 {
                    DiffType::Same
                } else {
                    DiffType::Modification
                };
                Some(DiffEntry {
                    data_object,
                    annotation1,
                    annotation2,
                    diff_type,
                })
            }
        }
    }
}

/// Diff two entry streams, each sorted by data object id with unique keys.
pub fn diff<L, R>(left: L, right: R) -> MergeDiff<L::IntoIter, R::IntoIter>
where
    L: IntoIterator<Item = (ObjectId, Option<ObjectId>)>,
    R: IntoIterator<Item = (ObjectId, Option<ObjectId>)>,
{
    MergeDiff {
        left: left.into_iter().peekable(),
        right: right.into_iter().peekable(),
    }
}

/// Diff two in-memory collections.
pub fn diff_collections<'a>(
    left: &'a Collection,
    right: &'a Collection,
) -> impl Iterator<Item = DiffEntry> + 'a {
    diff(
        left.iter().map(|(k, v)| (*k, v.copied())),
        right.iter().map(|(k, v)| (*k, v.copied())),
    )
}

/// Counts of non-`Same` diff entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub deletions: usize,
    pub modifications: usize,
}

impl DiffSummary {
    pub fn record(&mut self, diff_type: DiffType) {
        match diff_type {
            DiffType::Same => {}
            DiffType::Addition => self.additions += 1,
            DiffType::Deletion => self.deletions += 1,
            DiffType::Modification => self.modifications += 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.additions == 0 && self.deletions == 0 && self.modifications == 0
    }
}

impl<'a> FromIterator<&'a DiffType> for DiffSummary {
    fn from_iter<I: IntoIterator<Item = &'a DiffType>>(iter: I) -> Self {
        let mut summary = DiffSummary::default();
        for diff_type in iter {
            summary.record(*diff_type);
        }
        summary
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Additions (+): {:8}", self.additions)?;
        writeln!(f, "  Deletions (-): {:8}", self.deletions)?;
        write!(f, "  Modifications (m): {:4}", self.modifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(n: u8) -> ObjectId {
        ObjectId::from([n; 16])
    }

    fn collection(pairs: &[(u8, Option<u8>)]) -> Collection {
        pairs.iter().map(|(k, v)| (id(*k), v.map(id))).collect()
    }

    fn types(a: &Collection, b: &Collection) -> Vec<(u8, DiffType)> {
        diff_collections(a, b)
            .map(|e| (e.data_object.as_bytes()[0], e.diff_type))
            .collect()
    }

    #[test]
    fn classifies_every_key() {
        let a = collection(&[(1, Some(1)), (2, Some(2)), (3, None), (5, None)]);
        let b = collection(&[(2, Some(2)), (3, Some(7)), (4, None), (6, Some(1))]);
        assert_eq!(
            types(&a, &b),
            vec![
                (1, DiffType::Deletion),
                (2, DiffType::Same),
                (3, DiffType::Modification),
                (4, DiffType::Addition),
                (5, DiffType::Deletion),
                (6, DiffType::Addition),
            ]
        );
    }

    #[test]
    fn empty_sides() {
        let a = collection(&[(1, None), (2, Some(3))]);
        let empty = Collection::new();
        assert!(types(&empty, &empty).is_empty());
        assert_eq!(
            types(&a, &empty),
            vec![(1, DiffType::Deletion), (2, DiffType::Deletion)]
        );
        assert_eq!(
            types(&empty, &a),
            vec![(1, DiffType::Addition), (2, DiffType::Addition)]
        );
    }

    #[test]
    fn entries_carry_both_annotations() {
        let a = collection(&[(1, Some(8))]);
        let b = collection(&[(1, Some(9))]);
        let entry = diff_collections(&a, &b).next().unwrap();
        assert_eq!(entry.annotation1, Some(id(8)));
        assert_eq!(entry.annotation2, Some(id(9)));
    }

    #[test]
    fn summary_counts_and_format() {
        let a = collection(&[(1, None), (2, Some(1))]);
        let b = collection(&[(2, Some(2)), (3, None), (4, None)]);
        let diff_types: Vec<DiffType> = diff_collections(&a, &b).map(|e| e.diff_type).collect();
        let summary: DiffSummary = diff_types.iter().collect();
        assert_eq!(
            summary,
            DiffSummary {
                additions: 2,
                deletions: 1,
                modifications: 1
            }
        );
        assert_eq!(
            summary.to_string(),
            "  Additions (+):        2\n  Deletions (-):        1\n  Modifications (m):    1"
        );
        assert!(DiffSummary::default().is_empty());
    }

    fn arb_collection() -> impl Strategy<Value = Collection> {
        proptest::collection::btree_map(0u8..40, proptest::option::of(0u8..4), 0..30)
            .prop_map(|m| m.into_iter().map(|(k, v)| (id(k), v.map(id))).collect())
    }

    proptest! {
        #[test]
        fn diff_partitions_the_key_union(a in arb_collection(), b in arb_collection()) {
            let entries: Vec<DiffEntry> = diff_collections(&a, &b).collect();
            let union = a.union(&b);
            prop_assert_eq!(entries.len(), union.len());
            for entry in &entries {
                let expected = match (a.get(&entry.data_object), b.get(&entry.data_object)) {
                    (Some(_), None) => DiffType::Deletion,
                    (None, Some(_)) => DiffType::Addition,
                    (Some(x), Some(y)) if x == y => DiffType::Same,
                    (Some(_), Some(_)) => DiffType::Modification,
                    (None, None) => unreachable!(),
                };
                prop_assert_eq!(entry.diff_type, expected);
            }
        }

        #[test]
        fn diff_is_symmetric(a in arb_collection(), b in arb_collection()) {
            let forward: Vec<DiffEntry> = diff_collections(&a, &b).collect();
            let backward: Vec<DiffEntry> = diff_collections(&b, &a).collect();
            prop_assert_eq!(forward.len(), backward.len());
            for (f, r) in forward.iter().zip(&backward) {
                prop_assert_eq!(f.data_object, r.data_object);
                prop_assert_eq!(f.annotation1, r.annotation2);
                prop_assert_eq!(f.annotation2, r.annotation1);
                let swapped = match f.diff_type {
                    DiffType::Addition => DiffType::Deletion,
                    DiffType::Deletion => DiffType::Addition,
                    other => other,
                };
                prop_assert_eq!(swapped, r.diff_type);
            }
        }
    }
}
