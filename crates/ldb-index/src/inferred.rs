//! Labels inferred from directory structure.
//!
//! A file at `<root>/cat/tabby/1.png` is labelled `{"cat": "tabby"}`: the
//! nearest enclosing directory is the innermost value and each directory
//! further out wraps it as a key.

use std::sync::Arc;

use ldb_storage::{is_hidden, FileSystem};
use serde_json::{Map, Value};
use tracing::warn;

use crate::discovery::FsPath;
use crate::error::{IndexError, IndexResult};

/// How inferred labels are shaped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InferOptions {
    /// Keys the label is nested under, outermost first.
    pub label_key: Vec<String>,
    /// Label for files directly inside a root directory. Such files are
    /// skipped when unset.
    pub base_label: Option<String>,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            label_key: vec!["label".to_string()],
            base_label: None,
        }
    }
}

/// The annotation for `file` below `root`, or `None` if it gets no label.
pub fn infer_annotation(root: &str, file: &str, options: &InferOptions) -> Option<Value> {
    let relative = file
        .strip_prefix(root.trim_end_matches('/'))
        .unwrap_or(file)
        .trim_start_matches('/');
    let mut dirs: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    dirs.pop();

    let mut label = match dirs.pop() {
        Some(innermost) => Value::String(innermost.to_string()),
        None => Value::String(options.base_label.clone()?),
    };
    let wrappers = dirs
        .iter()
        .rev()
        .copied()
        .chain(options.label_key.iter().rev().map(String::as_str));
    for key in wrappers {
        label = nest(key, label);
    }
    Some(label)
}

fn nest(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// Walk each root and infer an annotation for every file found.
///
/// Annotation files are not allowed under the roots.
pub fn infer_annotations(
    roots: &[(Arc<dyn FileSystem>, FsPath)],
    options: &InferOptions,
) -> IndexResult<Vec<(FsPath, Value)>> {
    let mut annotations = Vec::new();
    let mut json_files = Vec::new();
    let mut warned = false;
    for (fs, root) in roots {
        for file in fs.walk_files(&root.path)? {
            if is_hidden(&file) {
                continue;
            }
            if file.ends_with(".json") {
                json_files.push(file);
                continue;
            }
            match infer_annotation(&root.path, &file, options) {
                Some(annotation) => {
                    annotations.push((FsPath::new(&root.protocol, file), annotation));
                }
                None if !warned => {
                    warn!(
                        root = %root,
                        "skipping files directly inside a label directory; \
                         set a base label to index them"
                    );
                    warned = true;
                }
                None => {}
            }
        }
    }
    if !json_files.is_empty() {
        return Err(IndexError::Indexing(format!(
            "No annotation files should be present for the infer format.\n\
             Found the following annotation files:\n{}",
            json_files.join("\n")
        )));
    }
    Ok(annotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    use ldb_storage::LocalFileSystem;

    #[test]
    fn nearest_directory_is_innermost() {
        let opts = InferOptions::default();
        assert_eq!(
            infer_annotation("/root", "/root/cat/tabby/1.png", &opts),
            Some(json!({"label": {"cat": "tabby"}}))
        );
        assert_eq!(
            infer_annotation("/root/", "/root/dog/2.png", &opts),
            Some(json!({"label": "dog"}))
        );
        assert_eq!(
            infer_annotation("/root", "/root/a/b/c/3.png", &opts),
            Some(json!({"label": {"a": {"b": "c"}}}))
        );
    }

    #[test]
    fn root_files_need_a_base_label() {
        let mut opts = InferOptions::default();
        assert_eq!(infer_annotation("/root", "/root/0.png", &opts), None);
        opts.base_label = Some("unknown".into());
        assert_eq!(
            infer_annotation("/root", "/root/0.png", &opts),
            Some(json!({"label": "unknown"}))
        );
    }

    #[test]
    fn label_key_nests_outermost_first() {
        let opts = InferOptions {
            label_key: vec!["meta".into(), "class".into()],
            base_label: None,
        };
        assert_eq!(
            infer_annotation("/r", "/r/cat/1.png", &opts),
            Some(json!({"meta": {"class": "cat"}}))
        );
        let bare = InferOptions {
            label_key: Vec::new(),
            base_label: None,
        };
        assert_eq!(infer_annotation("/r", "/r/cat/1.png", &bare), Some(json!("cat")));
    }

    #[test]
    fn walks_roots_and_rejects_json() {
        let dir = tempfile::Builder::new().prefix("ldb-infer").tempdir().unwrap();
        let root = dir.path().join("animals");
        for rel in ["cat/1.png", "dog/2.png", "3.png"] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, rel).unwrap();
        }
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new());
        let roots = vec![(
            Arc::clone(&fs),
            FsPath::local(root.to_string_lossy().into_owned()),
        )];

        let found = infer_annotations(&roots, &InferOptions::default()).unwrap();
        let labels: Vec<Value> = found.into_iter().map(|(_, v)| v).collect();
        assert_eq!(labels, vec![json!({"label": "cat"}), json!({"label": "dog"})]);

        fs::write(root.join("cat/1.json"), "{}").unwrap();
        let err = infer_annotations(&roots, &InferOptions::default()).unwrap_err();
        assert!(err.to_string().contains("No annotation files should be present"));
    }
}
