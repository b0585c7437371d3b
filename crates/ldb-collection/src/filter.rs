//! Filtering collections with externally supplied predicates.
//!
//! Predicates are opaque: each receives the values of the surviving entries
//! and answers one boolean per value, in order. Query languages plug in here
//! without this crate knowing their syntax.

use std::fmt::Display;

use ldb_types::ObjectId;
use serde_json::Value;

use crate::collection::Collection;
use crate::error::{CollectionError, CollectionResult};

/// A batch predicate over JSON values.
pub trait Predicate {
    fn evaluate(&self, values: &[Value]) -> Vec<bool>;
}

impl<F> Predicate for F
where
    F: Fn(&[Value]) -> Vec<bool>,
{
    fn evaluate(&self, values: &[Value]) -> Vec<bool> {
        self(values)
    }
}

/// Keep the entries every predicate accepts.
///
/// `load` produces the value each predicate sees for an entry (annotation
/// content, data object meta, ...). Predicates run in order, each one only
/// over the entries that survived the previous ones.
pub fn apply_filters<L, E>(
    collection: Collection,
    predicates: &[&dyn Predicate],
    mut load: L,
) -> CollectionResult<Collection>
where
    L: FnMut(&ObjectId, Option<&ObjectId>) -> Result<Value, E>,
    E: Display,
{
    if predicates.is_empty() {
        return Ok(collection);
    }
    let mut rows = Vec::with_capacity(collection.len());
    for (data_object, annotation) in collection {
        let value = load(&data_object, annotation.as_ref())
            .map_err(|e| CollectionError::Value(e.to_string()))?;
        rows.push(((data_object, annotation), value));
    }

    for predicate in predicates {
        let values: Vec<Value> = rows.iter().map(|(_, v)| v.clone()).collect();
        let keep = predicate.evaluate(&values);
        if keep.len() != rows.len() {
            return Err(CollectionError::PredicateLength {
                expected: rows.len(),
                actual: keep.len(),
            });
        }
        let mut keep = keep.into_iter();
        rows.retain(|_| keep.next().unwrap_or(false));
    }
    Ok(rows.into_iter().map(|(entry, _)| entry).collect())
}
