//! Indexing a single data object and its annotation.
//!
//! Writes go in a fixed order: data object meta, annotation version meta,
//! annotation payload, then the `current` pointer. An interrupted run can
//! leave an annotation recorded but not current; re-indexing repairs it.

use ldb_hash::{ContentHasher, HasherError};
use ldb_store::{AnnotationLdbContent, AnnotationMeta, Catalog, DataObjectMeta, FsInfo, PathInfo};
use ldb_storage::{split_extension, FileSystem};
use ldb_types::{max_timestamp, ObjectId, Timestamp};
use serde_json::Value;
use tracing::trace;

use crate::error::IndexResult;
use crate::format::MergeStrategy;
use crate::result::IndexedObject;

/// Content hash of a file, using the backend's checksum when it is usable.
pub fn file_hash(fs: &dyn FileSystem, path: &str) -> IndexResult<ObjectId> {
    if let Some(id) = fs
        .provider_checksum(path)
        .as_ref()
        .and_then(ContentHasher::from_provider_checksum)
    {
        return Ok(id);
    }
    Ok(ContentHasher::hash_reader(fs.open(path)?)?)
}

/// Where a data object's meta comes from.
pub enum DataObjectSource<'a> {
    /// A file on a filesystem.
    ///
    /// With `save_path_info` unset the object must already be indexed, and
    /// only its indexing bookkeeping and tags are refreshed.
    File {
        fs: &'a dyn FileSystem,
        path: &'a str,
        save_path_info: bool,
    },
    /// A previously indexed object whose meta is left untouched.
    Existing,
}

/// Annotation content for an item, before any merge.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationInput {
    pub content: Value,
    /// Modification time of the source annotation, if it has one.
    pub mtime: Option<Timestamp>,
}

/// Settings shared by every item in a run.
pub struct ItemContext<'a> {
    pub catalog: &'a Catalog,
    pub user: &'a str,
    pub tags: &'a [String],
    pub merge: MergeStrategy,
}

impl ItemContext<'_> {
    pub fn index_item(
        &self,
        data_object: ObjectId,
        source: DataObjectSource<'_>,
        annotation: Option<AnnotationInput>,
    ) -> IndexResult<IndexedObject> {
        let now = Timestamp::now();
        let mut result = IndexedObject {
            data_object,
            annotation: None,
            found_data_object: false,
            found_annotation: false,
            new_data_object: false,
            new_annotation: false,
            new_data_object_path: false,
        };

        if let DataObjectSource::File {
            fs,
            path,
            save_path_info,
        } = source
        {
            let previous = self.catalog.data_object_meta(&data_object)?;
            result.found_data_object = true;
            result.new_data_object = previous.is_none();
            let (new_path, meta) =
                self.data_object_meta(fs, path, save_path_info, previous, &now)?;
            result.new_data_object_path = new_path;
            self.catalog.put_data_object_meta(&data_object, &meta)?;
        }

        if let Some(annotation) = annotation {
            let (id, new) = self.write_annotation(&data_object, annotation, &now)?;
            result.found_annotation = true;
            result.new_annotation = new;
            result.annotation = Some(id);
        }
        trace!(
            data_object = %data_object,
            annotation = ?result.annotation.map(|a| a.to_hex()),
            "indexed"
        );
        Ok(result)
    }

    fn data_object_meta(
        &self,
        fs: &dyn FileSystem,
        path: &str,
        save_path_info: bool,
        previous: Option<DataObjectMeta>,
        now: &Timestamp,
    ) -> IndexResult<(bool, DataObjectMeta)> {
        let previous = match previous {
            Some(mut meta) if !save_path_info => {
                meta.last_indexed = *now;
                meta.last_indexed_by = self.user.to_string();
                meta.merge_tags(self.tags.iter().cloned());
                return Ok((false, meta));
            }
            other => other,
        };

        let info = fs.info(path)?;
        let mut fs_info = FsInfo {
            fs_id: fs.fs_id().to_string(),
            protocol: fs.protocol().to_string(),
            path: path.to_string(),
            size: info.size,
            mode: info.mode,
            uid: info.uid,
            gid: info.gid,
            atime: info.atime,
            mtime: info.mtime,
            ctime: info.ctime,
        };
        let file_type = split_extension(path).1.trim_start_matches('.').to_string();

        let mut meta = match previous {
            Some(previous) => {
                fs_info.watermark(&previous.fs);
                DataObjectMeta {
                    file_type: if file_type.is_empty() {
                        previous.file_type
                    } else {
                        file_type
                    },
                    first_indexed: previous.first_indexed,
                    last_indexed: *now,
                    last_indexed_by: self.user.to_string(),
                    tags: previous.tags,
                    alternate_paths: previous.alternate_paths,
                    fs: fs_info,
                }
            }
            None => DataObjectMeta {
                file_type,
                first_indexed: *now,
                last_indexed: *now,
                last_indexed_by: self.user.to_string(),
                tags: Default::default(),
                alternate_paths: Vec::new(),
                fs: fs_info,
            },
        };
        meta.merge_tags(self.tags.iter().cloned());
        let path_info: PathInfo = meta.fs.path_info();
        let new_path = meta.add_alternate_path(path_info);
        Ok((new_path, meta))
    }

    fn write_annotation(
        &self,
        data_object: &ObjectId,
        annotation: AnnotationInput,
        now: &Timestamp,
    ) -> IndexResult<(ObjectId, bool)> {
        let content = match self.merge {
            MergeStrategy::Replace => annotation.content,
            MergeStrategy::Merge => self.merged(data_object, annotation.content)?,
        };
        let ldb_bytes = AnnotationLdbContent::default()
            .to_bytes()
            .map_err(serialization)?;
        let user_bytes = serde_json::to_vec(&content).map_err(serialization)?;
        let id = ContentHasher::hash_parts(&[&ldb_bytes, &user_bytes]);

        let previous = self.catalog.annotation_meta(data_object, &id)?;
        let new = previous.is_none();
        let meta = match previous {
            Some(previous) => AnnotationMeta {
                version: previous.version,
                mtime: max_timestamp(previous.mtime, annotation.mtime),
                first_indexed_time: previous.first_indexed_time,
                last_indexed_time: *now,
            },
            None => AnnotationMeta {
                version: self.catalog.annotation_version_count(data_object)? as u32 + 1,
                mtime: annotation.mtime,
                first_indexed_time: *now,
                last_indexed_time: *now,
            },
        };
        self.catalog.put_annotation_meta(data_object, &id, &meta)?;
        self.catalog.put_annotation(&id, &ldb_bytes, &user_bytes)?;
        self.catalog.set_current_annotation(data_object, &id)?;
        Ok((id, new))
    }

    /// Shallow-merge `new` over the current annotation when both are objects.
    fn merged(&self, data_object: &ObjectId, new: Value) -> IndexResult<Value> {
        let Value::Object(new_fields) = new else {
            return Ok(new);
        };
        let current = match self.catalog.current_annotation(data_object) {
            Ok(Some(current)) => self.catalog.annotation_value(&current)?,
            Ok(None) | Err(ldb_store::StoreError::DataObjectNotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        match current {
            Some(Value::Object(mut fields)) => {
                fields.extend(new_fields);
                Ok(Value::Object(fields))
            }
            _ => Ok(Value::Object(new_fields)),
        }
    }
}

fn serialization(e: serde_json::Error) -> HasherError {
    HasherError::Serialization(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use ldb_store::InMemoryObjectStore;
    use ldb_storage::LocalFileSystem;
    use serde_json::json;

    struct Fixture {
        catalog: Catalog,
        dir: tempfile::TempDir,
        fs: LocalFileSystem,
        tags: Vec<String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                catalog: Catalog::new(Arc::new(InMemoryObjectStore::new())),
                dir: tempfile::Builder::new().prefix("ldb-item").tempdir().unwrap(),
                fs: LocalFileSystem::new(),
                tags: vec!["train".to_string()],
            }
        }

        fn ctx(&self, merge: MergeStrategy) -> ItemContext<'_> {
            ItemContext {
                catalog: &self.catalog,
                user: "tester",
                tags: &self.tags,
                merge,
            }
        }

        fn file(&self, name: &str, content: &[u8]) -> (String, ObjectId) {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            (path.to_string_lossy().into_owned(), ContentHasher::hash(content))
        }
    }

    fn annot(content: Value) -> Option<AnnotationInput> {
        Some(AnnotationInput {
            content,
            mtime: None,
        })
    }

    // -----------------------------------------------------------------------
    // Data objects
    // -----------------------------------------------------------------------

    #[test]
    fn new_then_found() {
        let f = Fixture::new();
        let (path, id) = f.file("a.png", b"pixels");
        let ctx = f.ctx(MergeStrategy::Replace);
        let source = || DataObjectSource::File {
            fs: &f.fs,
            path: &path,
            save_path_info: true,
        };

        let first = ctx.index_item(id, source(), None).unwrap();
        assert!(first.found_data_object && first.new_data_object && first.new_data_object_path);
        assert!(!first.found_annotation);

        let second = ctx.index_item(id, source(), None).unwrap();
        assert!(second.found_data_object);
        assert!(!second.new_data_object && !second.new_data_object_path);

        let meta = f.catalog.require_data_object_meta(&id).unwrap();
        assert_eq!(meta.file_type, "png");
        assert_eq!(meta.alternate_paths.len(), 1);
        assert_eq!(meta.fs.size, 6);
        assert!(meta.tags.contains("train"));
        assert_eq!(meta.last_indexed_by, "tester");
    }

    #[test]
    fn second_location_is_a_new_path() {
        let f = Fixture::new();
        let (a, id) = f.file("a.png", b"same");
        let (b, _) = f.file("b.jpg", b"same");
        let ctx = f.ctx(MergeStrategy::Replace);
        for path in [&a, &b] {
            ctx.index_item(
                id,
                DataObjectSource::File {
                    fs: &f.fs,
                    path,
                    save_path_info: true,
                },
                None,
            )
            .unwrap();
        }
        let meta = f.catalog.require_data_object_meta(&id).unwrap();
        assert_eq!(meta.alternate_paths.len(), 2);
        assert_eq!(meta.fs.path, b);
        assert_eq!(meta.file_type, "jpg");
    }

    #[test]
    fn refresh_keeps_path_info() {
        let f = Fixture::new();
        let (a, id) = f.file("a.png", b"same");
        let (b, _) = f.file("copy.png", b"same");
        let ctx = f.ctx(MergeStrategy::Replace);
        ctx.index_item(
            id,
            DataObjectSource::File {
                fs: &f.fs,
                path: &a,
                save_path_info: true,
            },
            None,
        )
        .unwrap();
        let before = f.catalog.require_data_object_meta(&id).unwrap();

        let tags = vec!["extra".to_string()];
        let ctx = ItemContext {
            tags: &tags,
            ..f.ctx(MergeStrategy::Replace)
        };
        let refreshed = ctx
            .index_item(
                id,
                DataObjectSource::File {
                    fs: &f.fs,
                    path: &b,
                    save_path_info: false,
                },
                None,
            )
            .unwrap();
        assert!(!refreshed.new_data_object_path);

        let after = f.catalog.require_data_object_meta(&id).unwrap();
        assert_eq!(after.alternate_paths, before.alternate_paths);
        assert_eq!(after.fs, before.fs);
        assert_eq!(after.first_indexed, before.first_indexed);
        assert!(after.tags.contains("train") && after.tags.contains("extra"));
    }

    // -----------------------------------------------------------------------
    // Annotations
    // -----------------------------------------------------------------------

    #[test]
    fn annotation_versions_are_stable() {
        let f = Fixture::new();
        let (path, id) = f.file("a.png", b"x");
        let ctx = f.ctx(MergeStrategy::Replace);
        let index = |content: Value| {
            ctx.index_item(
                id,
                DataObjectSource::File {
                    fs: &f.fs,
                    path: &path,
                    save_path_info: true,
                },
                annot(content),
            )
            .unwrap()
        };

        let v1 = index(json!({"label": 1}));
        assert!(v1.new_annotation);
        let v2 = index(json!({"label": 2}));
        assert!(v2.new_annotation);
        let again = index(json!({"label": 1}));
        assert!(again.found_annotation && !again.new_annotation);
        assert_eq!(again.annotation, v1.annotation);

        let a1 = v1.annotation.unwrap();
        let a2 = v2.annotation.unwrap();
        assert_eq!(f.catalog.annotation_version(&id, Some(&a1)).unwrap(), 1);
        assert_eq!(f.catalog.annotation_version(&id, Some(&a2)).unwrap(), 2);
        assert_eq!(f.catalog.annotation_version_count(&id).unwrap(), 2);
        // Re-indexing old content makes it current again.
        assert_eq!(f.catalog.current_annotation(&id).unwrap(), Some(a1));
    }

    #[test]
    fn annotation_hash_ignores_key_order() {
        let f = Fixture::new();
        let (path, id) = f.file("a.png", b"x");
        let ctx = f.ctx(MergeStrategy::Replace);
        let source = || DataObjectSource::File {
            fs: &f.fs,
            path: &path,
            save_path_info: true,
        };
        let a: Value = serde_json::from_str(r#"{"b": 1, "a": [1, 2]}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": [1, 2], "b": 1}"#).unwrap();
        let first = ctx.index_item(id, source(), annot(a)).unwrap();
        let second = ctx.index_item(id, source(), annot(b)).unwrap();
        assert_eq!(first.annotation, second.annotation);
        assert!(!second.new_annotation);
    }

    #[test]
    fn merge_strategy_combines_with_current() {
        let f = Fixture::new();
        let (path, id) = f.file("a.png", b"x");
        let source = || DataObjectSource::File {
            fs: &f.fs,
            path: &path,
            save_path_info: true,
        };
        f.ctx(MergeStrategy::Replace)
            .index_item(id, source(), annot(json!({"a": 1, "b": 1})))
            .unwrap();
        let merged = f
            .ctx(MergeStrategy::Merge)
            .index_item(id, source(), annot(json!({"b": 2, "c": 3})))
            .unwrap();
        let value = f
            .catalog
            .annotation_value(&merged.annotation.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(value, json!({"a": 1, "b": 2, "c": 3}));

        // Non-object content replaces.
        let replaced = f
            .ctx(MergeStrategy::Merge)
            .index_item(id, source(), annot(json!([1, 2])))
            .unwrap();
        let value = f
            .catalog
            .annotation_value(&replaced.annotation.unwrap())
            .unwrap();
        assert_eq!(value, Some(json!([1, 2])));
    }

    #[test]
    fn existing_source_leaves_meta_alone() {
        let f = Fixture::new();
        let (path, id) = f.file("a.png", b"x");
        let ctx = f.ctx(MergeStrategy::Replace);
        ctx.index_item(
            id,
            DataObjectSource::File {
                fs: &f.fs,
                path: &path,
                save_path_info: true,
            },
            None,
        )
        .unwrap();
        let before = f.catalog.require_data_object_meta(&id).unwrap();
        let result = ctx
            .index_item(id, DataObjectSource::Existing, annot(json!({"x": 1})))
            .unwrap();
        assert!(!result.found_data_object && result.found_annotation);
        assert_eq!(f.catalog.require_data_object_meta(&id).unwrap(), before);
    }

    #[test]
    fn annotation_mtime_is_watermarked() {
        let f = Fixture::new();
        let (path, id) = f.file("a.png", b"x");
        let ctx = f.ctx(MergeStrategy::Replace);
        let index = |mtime: &str| {
            ctx.index_item(
                id,
                DataObjectSource::File {
                    fs: &f.fs,
                    path: &path,
                    save_path_info: true,
                },
                Some(AnnotationInput {
                    content: json!(1),
                    mtime: Some(Timestamp::parse(mtime).unwrap()),
                }),
            )
            .unwrap()
        };
        let first = index("2024-01-02T00:00:00+00:00");
        index("2023-01-01T00:00:00+00:00");
        let meta = f
            .catalog
            .annotation_meta(&id, &first.annotation.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(
            meta.mtime,
            Some(Timestamp::parse("2024-01-02T00:00:00+00:00").unwrap())
        );
        assert_eq!(meta.version, 1);
    }
}
