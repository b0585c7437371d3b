//! Resolving command arguments to collections and editing workspaces.
//!
//! An argument is one of a dataset identifier (`ds:name.v2`, `ds:root`),
//! a data object id (`0x...`), another workspace directory, or a path to
//! index. Every argument of one call must be of the same kind.

use std::fs;
use std::path::Path;

use ldb_collection::{apply_filters, Collection, Predicate};
use ldb_dataset::{DatasetIdentifier, DatasetStore};
use ldb_index::{discover, file_hash};
use ldb_types::ObjectId;
use ldb_workspace::{Workspace, WORKSPACE_DIR};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{SdkError, SdkResult};
use crate::instance::Ldb;

/// The kind of a command argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgType {
    Dataset,
    DataObject,
    Workspace,
    Path,
}

impl ArgType {
    /// Classify one argument. `current` is the workspace being edited,
    /// which is treated as a plain path rather than a source workspace.
    pub fn of(arg: &str, current: Option<&Path>) -> ArgType {
        if arg.starts_with("ds:") {
            ArgType::Dataset
        } else if arg.starts_with("0x") {
            ArgType::DataObject
        } else if is_other_workspace(Path::new(arg), current) {
            ArgType::Workspace
        } else {
            ArgType::Path
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ArgType::Dataset => "a dataset identifier",
            ArgType::DataObject => "a data object identifier",
            ArgType::Workspace => "a workspace",
            ArgType::Path => "a path",
        }
    }
}

/// Classify `args`, requiring them all to be of the first one's kind.
pub fn resolve_arg_type(args: &[String], current: Option<&Path>) -> SdkResult<ArgType> {
    let first = args
        .first()
        .ok_or_else(|| SdkError::InvalidArgument("Must supply path".to_string()))?;
    let arg_type = ArgType::of(first, current);
    let consistent = match arg_type {
        ArgType::Dataset => args.iter().all(|a| DatasetIdentifier::is_identifier(a)),
        ArgType::DataObject => args.iter().all(|a| ObjectId::from_prefixed(a).is_ok()),
        ArgType::Workspace => args
            .iter()
            .all(|a| is_other_workspace(Path::new(a), current)),
        ArgType::Path => args.iter().all(|a| ArgType::of(a, current) == ArgType::Path),
    };
    if consistent {
        return Ok(arg_type);
    }
    let found = match arg_type {
        ArgType::Dataset => "Found path starting with 'ds'".to_string(),
        ArgType::DataObject => "Found path starting with '0x'".to_string(),
        ArgType::Workspace => format!("Found workspace {first}"),
        ArgType::Path => format!("Found path {first}"),
    };
    Err(SdkError::InvalidArgument(format!(
        "All paths must be the same type. {found}, but unable parse all paths as {}",
        arg_type.describe()
    )))
}

fn is_other_workspace(path: &Path, current: Option<&Path>) -> bool {
    if !path.join(WORKSPACE_DIR).is_dir() {
        return false;
    }
    match current {
        Some(current) => !same_dir(path, current),
        None => true,
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// What [`Ldb::add`] changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddSummary {
    /// `ds:<name>` of the workspace dataset.
    pub dataset: String,
    /// Entries selected by the arguments after filtering.
    pub num_selected: usize,
    /// Entries not previously staged.
    pub num_added: usize,
    /// Staged entries whose annotation changed.
    pub num_updated: usize,
}

/// What [`Ldb::delete`] changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteSummary {
    pub dataset: String,
    pub num_deleted: usize,
}

impl Ldb {
    /// Resolve `args` to the collection they name, combining several
    /// arguments with a right-biased union.
    ///
    /// Paths are indexed first unless every data object under them is
    /// already known. `workspace` is the workspace being edited, if any.
    pub fn select(&self, args: &[String], workspace: Option<&Path>) -> SdkResult<Collection> {
        let collection = match resolve_arg_type(args, workspace)? {
            ArgType::Dataset => {
                let mut collection = Collection::new();
                for arg in args {
                    let identifier = DatasetIdentifier::parse(arg)?;
                    collection.merge(&self.catalog().resolve_collection(&identifier)?);
                }
                collection
            }
            ArgType::DataObject => {
                let ids = args
                    .iter()
                    .map(|a| ObjectId::from_prefixed(a))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| SdkError::InvalidArgument(e.to_string()))?;
                self.current_annotations(&ids)?.into_iter().collect()
            }
            ArgType::Workspace => {
                let mut collection = Collection::new();
                for arg in args {
                    collection.merge(&Workspace::open(arg)?.collection().read_all()?);
                }
                collection
            }
            ArgType::Path => {
                let ids = self.path_data_objects(args)?;
                self.current_annotations(&ids)?.into_iter().collect()
            }
        };
        debug!(args = args.len(), entries = collection.len(), "resolved arguments");
        Ok(collection)
    }

    /// Data objects under `paths`, indexing the paths when any of them is
    /// new to this instance.
    fn path_data_objects(&self, paths: &[String]) -> SdkResult<Vec<ObjectId>> {
        let discovered = discover(self.filesystems(), paths, false)?;
        if discovered.is_empty() {
            return Err(SdkError::NoFilesFound(paths.to_vec()));
        }
        if discovered.annotations.is_empty() {
            let mut known = Vec::with_capacity(discovered.data_objects.len());
            for file in &discovered.data_objects {
                let fs = self.filesystems().get(&file.protocol)?;
                let id = file_hash(fs.as_ref(), &file.path)?;
                if !self.catalog().data_object_exists(&id)? {
                    break;
                }
                known.push(id);
            }
            if known.len() == discovered.data_objects.len() {
                return Ok(known);
            }
        }
        info!(paths = paths.len(), "indexing paths before adding");
        let result = self.index(paths, self.index_options()?)?;
        Ok(result.data_object_hashes)
    }

    /// Keep the entries of `collection` whose annotation content every
    /// predicate accepts. Unannotated entries are seen as `null`.
    pub fn filter(&self, collection: Collection, predicates: &[&dyn Predicate]) -> SdkResult<Collection> {
        let catalog = self.catalog();
        let filtered = apply_filters(collection, predicates, |_, annotation| {
            match annotation {
                Some(id) => catalog.annotation_value(id).map(Option::unwrap_or_default),
                None => Ok(Value::Null),
            }
        })?;
        Ok(filtered)
    }

    /// Stage everything `args` selects into the workspace at `root`.
    pub fn add(&self, root: &Path, args: &[String], predicates: &[&dyn Predicate]) -> SdkResult<AddSummary> {
        let workspace = Workspace::open(root)?;
        let dataset = workspace.dataset()?;
        let selected = self.filter(self.select(args, Some(root))?, predicates)?;

        let staged = workspace.collection();
        let mut summary = AddSummary {
            dataset: dataset.identifier(),
            num_selected: selected.len(),
            num_added: 0,
            num_updated: 0,
        };
        for (data_object, annotation) in selected.iter() {
            match staged.get(data_object)? {
                None => summary.num_added += 1,
                Some(existing) if existing.as_ref() != annotation => summary.num_updated += 1,
                Some(_) => continue,
            }
            staged.add(data_object, annotation)?;
        }
        info!(
            dataset = %summary.dataset,
            added = summary.num_added,
            updated = summary.num_updated,
            "added to workspace"
        );
        Ok(summary)
    }

    /// Unstage everything `args` selects from the workspace at `root`.
    /// With no arguments the workspace is emptied.
    pub fn delete(&self, root: &Path, args: &[String], predicates: &[&dyn Predicate]) -> SdkResult<DeleteSummary> {
        let workspace = Workspace::open(root)?;
        let dataset = workspace.dataset()?;
        let staged = workspace.collection();
        let selected = if args.is_empty() {
            staged.read_all()?
        } else {
            self.select(args, Some(root))?
        };
        let selected = self.filter(selected, predicates)?;

        let mut num_deleted = 0;
        for data_object in selected.data_objects() {
            if staged.remove(data_object)? {
                num_deleted += 1;
            }
        }
        info!(dataset = %dataset.identifier(), deleted = num_deleted, "deleted from workspace");
        Ok(DeleteSummary {
            dataset: dataset.identifier(),
            num_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ldb_index::IndexError;
    use ldb_types::Timestamp;
    use ldb_workspace::WorkspaceDataset;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn instance() -> (tempfile::TempDir, Ldb) {
        let tmp = tempfile::Builder::new().prefix("ldb-add").tempdir().unwrap();
        let ldb = Ldb::init(tmp.path().join("instance"), false).unwrap();
        (tmp, ldb)
    }

    // ---- Argument types ----

    #[test]
    fn classifies_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(ArgType::of("ds:cats", None), ArgType::Dataset);
        assert_eq!(ArgType::of("0xabc", None), ArgType::DataObject);
        assert_eq!(ArgType::of("some/dir", None), ArgType::Path);

        let ws = tmp.path().join("ws");
        Workspace::create(&ws, &WorkspaceDataset::new("cats", Timestamp::now())).unwrap();
        let ws_arg = ws.to_string_lossy().into_owned();
        assert_eq!(ArgType::of(&ws_arg, None), ArgType::Workspace);
        assert_eq!(ArgType::of(&ws_arg, Some(ws.as_path())), ArgType::Path);
    }

    #[test]
    fn mixed_arguments_are_rejected() {
        let err = resolve_arg_type(&args(&["ds:a", "0x00"]), None).unwrap_err();
        assert!(err.to_string().contains("Found path starting with 'ds'"));
        let err = resolve_arg_type(&args(&["0x00", "ds:a"]), None).unwrap_err();
        assert!(err.to_string().contains("Found path starting with '0x'"));
        let err = resolve_arg_type(&[], None).unwrap_err();
        assert_eq!(err.to_string(), "Must supply path");
        assert_eq!(
            resolve_arg_type(&args(&["ds:a", "ds:b.v2"]), None).unwrap(),
            ArgType::Dataset
        );
    }

    // ---- Selection ----

    #[test]
    fn unknown_data_object_ids_fail() {
        let (_tmp, ldb) = instance();
        let arg = ObjectId::from([9; 16]).to_prefixed();
        let err = ldb.select(&[arg], None).unwrap_err();
        assert!(matches!(
            err,
            SdkError::Index(IndexError::DataObjectNotFound { .. })
        ));
    }

    #[test]
    fn empty_paths_find_nothing() {
        let (tmp, ldb) = instance();
        let empty = tmp.path().join("empty");
        fs::create_dir(&empty).unwrap();
        let err = ldb
            .select(&[empty.to_string_lossy().into_owned()], None)
            .unwrap_err();
        assert!(matches!(err, SdkError::NoFilesFound(_)));
    }

    #[test]
    fn filter_sees_annotation_content() {
        let (_tmp, ldb) = instance();
        let c: Collection = [(ObjectId::from([1; 16]), None)].into_iter().collect();
        let reject_null: &dyn Predicate =
            &|values: &[Value]| -> Vec<bool> { values.iter().map(|v| !v.is_null()).collect() };
        let filtered = ldb.filter(c, &[reject_null]).unwrap();
        assert!(filtered.is_empty());
    }

    #[test]
    fn workspace_arguments_read_staged_entries() {
        let (tmp, ldb) = instance();
        let source = tmp.path().join("source");
        let ws = Workspace::create(&source, &WorkspaceDataset::new("a", Timestamp::now())).unwrap();
        ws.collection().add(&ObjectId::from([4; 16]), None).unwrap();

        let target = tmp.path().join("target");
        Workspace::create(&target, &WorkspaceDataset::new("b", Timestamp::now())).unwrap();
        let summary = ldb
            .add(&target, &[source.to_string_lossy().into_owned()], &[])
            .unwrap();
        assert_eq!(summary.dataset, "ds:b");
        assert_eq!(summary.num_added, 1);

        let summary = ldb.delete(&target, &[], &[]).unwrap();
        assert_eq!(summary.num_deleted, 1);
        assert!(Workspace::open(&target).unwrap().collection().read_all().unwrap().is_empty());
    }
}
