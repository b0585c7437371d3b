//! Annotation files for data objects that are already indexed.
//!
//! A file holds one record or an array of records, each shaped like
//! `{"data-object-info": {"md5": <hash>}, "annotation": <content>}`. The
//! hash may also be given as `{"ldb_meta": {"data_object_id": <hash>}}`.

use ldb_types::ObjectId;
use serde_json::Value;

use crate::error::{IndexError, IndexResult};

/// One annotation and the data object it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationRecord {
    pub data_object: ObjectId,
    pub annotation: Value,
}

pub fn parse_records(value: Value, path: &str) -> IndexResult<Vec<AnnotationRecord>> {
    let records = match value {
        Value::Array(records) => records,
        record => vec![record],
    };
    records
        .into_iter()
        .map(|record| parse_record(record, path))
        .collect()
}

fn parse_record(mut record: Value, path: &str) -> IndexResult<AnnotationRecord> {
    let hash = record
        .pointer("/data-object-info/md5")
        .or_else(|| record.pointer("/ldb_meta/data_object_id"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            IndexError::Indexing(format!(
                "Missing data-object-info.md5 key for annotation-only format: {path}"
            ))
        })?;
    let data_object = if hash.starts_with("0x") {
        ObjectId::from_prefixed(hash)
    } else {
        ObjectId::from_hex(hash)
    }
    .map_err(|e| IndexError::Indexing(format!("Invalid data object hash in {path}: {e}")))?;

    let annotation = record
        .as_object_mut()
        .and_then(|fields| fields.remove("annotation"))
        .ok_or_else(|| {
            IndexError::Indexing(format!(
                "Missing annotation key for annotation-only format: {path}"
            ))
        })?;
    Ok(AnnotationRecord {
        data_object,
        annotation,
    })
}
