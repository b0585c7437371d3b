//! Label Studio export files.
//!
//! Each task in an export points at its data object through a URL stored
//! under `data`. The key holding the URL is read from
//! `data["data-object-info"]["path_key"]` when present, otherwise taken
//! from configuration, otherwise inferred once per run as the only
//! non-reserved key under `data`.

use ldb_types::ObjectId;
use serde_json::{Map, Value};

use crate::discovery::FsPath;
use crate::error::{IndexError, IndexResult};

/// Key under `data` that LDB reserves for its own bookkeeping.
pub const DATA_OBJECT_INFO_KEY: &str = "data-object-info";

/// Split an export into its tasks. A single object counts as one task.
pub fn parse_tasks(value: Value, path: &str) -> IndexResult<Vec<Value>> {
    match value {
        Value::Array(tasks) => Ok(tasks),
        task @ Value::Object(_) => Ok(vec![task]),
        _ => Err(IndexError::Indexing(format!(
            "Annotation file must contain a JSON array or object for the label-studio format. \
             Incorrectly formatted file: {path}"
        ))),
    }
}

/// Look up a dotted key path such as `data.image`.
pub fn lookup<'a>(value: &'a Value, key_path: &str) -> Option<&'a Value> {
    key_path
        .split('.')
        .try_fold(value, |current, key| current.get(key))
}

/// Decides which key of a task holds its data object URL.
#[derive(Clone, Debug, Default)]
pub struct PathKeyResolver {
    configured: Option<String>,
    inferred: Option<String>,
}

impl PathKeyResolver {
    pub fn new(configured: Option<String>) -> Self {
        Self {
            configured,
            inferred: None,
        }
    }

    pub fn resolve(&mut self, task: &Value) -> IndexResult<String> {
        if let Some(key) = lookup(task, "data.data-object-info.path_key").and_then(Value::as_str) {
            return Ok(key.to_string());
        }
        if let Some(key) = self.configured.as_ref().or(self.inferred.as_ref()) {
            return Ok(key.clone());
        }
        let key = infer_path_key(task)?;
        self.inferred = Some(key.clone());
        Ok(key)
    }
}

fn infer_path_key(task: &Value) -> IndexResult<String> {
    let data = task
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            IndexError::Indexing("Label Studio task has no \"data\" object".to_string())
        })?;
    let mut keys = data.keys().filter(|k| k.as_str() != DATA_OBJECT_INFO_KEY);
    match (keys.next(), keys.next()) {
        (Some(key), None) => Ok(format!("data.{key}")),
        _ => Err(IndexError::Indexing(format!(
            "Unable to infer the data object path key for the label-studio format: \
             expected exactly one key under \"data\" other than {DATA_OBJECT_INFO_KEY:?}, \
             found {:?}",
            data.keys()
                .filter(|k| k.as_str() != DATA_OBJECT_INFO_KEY)
                .collect::<Vec<_>>()
        ))),
    }
}

/// The data object a task points at.
pub fn data_object_url(task: &Value, path_key: &str) -> IndexResult<FsPath> {
    let url = lookup(task, path_key).and_then(Value::as_str).ok_or_else(|| {
        IndexError::Indexing(format!(
            "Expected a string at {path_key}, the data object path key of a label-studio task"
        ))
    })?;
    FsPath::parse(url)
}

/// Record the data object's hash and path key inside the task.
///
/// A task that already carries a different hash is rejected.
pub fn tag_task(task: &mut Value, data_object: &ObjectId, path_key: &str) -> IndexResult<()> {
    let data = task
        .get_mut("data")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            IndexError::Indexing("Label Studio task has no \"data\" object".to_string())
        })?;
    let info = data
        .entry(DATA_OBJECT_INFO_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(info) = info else {
        return Err(IndexError::Indexing(format!(
            "data.{DATA_OBJECT_INFO_KEY} must be an object"
        )));
    };
    let hex = data_object.to_hex();
    match info.get("md5").and_then(Value::as_str) {
        Some(existing) if existing != hex => {
            return Err(IndexError::Indexing(format!(
                "Mismatched data object hash: data.{DATA_OBJECT_INFO_KEY}.md5 is {existing} \
                 but the data object at {path_key} hashes to {hex}"
            )));
        }
        _ => {}
    }
    info.insert("md5".to_string(), Value::String(hex));
    info.insert("path_key".to_string(), Value::String(path_key.to_string()));
    Ok(())
}
