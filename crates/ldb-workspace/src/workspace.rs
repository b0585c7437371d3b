//! A working directory bound to one dataset being built.
//!
//! ```text
//! <root>/.ldb_workspace/workspace_dataset    descriptor (JSON)
//! <root>/.ldb_workspace/collection/...       staged entries
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ldb_collection::Collection;
use ldb_dataset::{format_identifier, DatasetStore};
use ldb_types::{ObjectId, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collection::{write_atomic, WorkspaceCollection};
use crate::error::{WorkspaceError, WorkspaceResult};

/// Name of the hidden directory marking a workspace.
pub const WORKSPACE_DIR: &str = ".ldb_workspace";
/// Collection directory inside [`WORKSPACE_DIR`].
pub const COLLECTION_DIR: &str = "collection";
/// Descriptor file inside [`WORKSPACE_DIR`].
pub const DATASET_FILE: &str = "workspace_dataset";

/// Staging state of a workspace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDataset {
    pub dataset_name: String,
    pub staged_time: Timestamp,
    /// Version the staged collection started from.
    pub parent: Option<ObjectId>,
    /// Copied into the next committed version.
    pub tags: Vec<String>,
}

impl WorkspaceDataset {
    pub fn new(dataset_name: impl Into<String>, staged_time: Timestamp) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            staged_time,
            parent: None,
            tags: Vec::new(),
        }
    }

    /// `ds:<name>`
    pub fn identifier(&self) -> String {
        format_identifier(&self.dataset_name, None)
    }
}

/// Handle on a staged workspace directory.
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Whether `root` holds a workspace descriptor.
    pub fn is_workspace(root: &Path) -> bool {
        descriptor_path(root).is_file()
    }

    /// Open an existing workspace.
    pub fn open(root: impl Into<PathBuf>) -> WorkspaceResult<Self> {
        let root = root.into();
        if !Self::is_workspace(&root) {
            return Err(WorkspaceError::NotAWorkspace(root));
        }
        Ok(Self { root })
    }

    /// Create the workspace directories and write the descriptor. Staged
    /// entries already present are kept.
    pub fn create(root: impl Into<PathBuf>, dataset: &WorkspaceDataset) -> WorkspaceResult<Self> {
        let ws = Self { root: root.into() };
        fs::create_dir_all(ws.base_dir().join(COLLECTION_DIR))?;
        ws.save_dataset(dataset)?;
        Ok(ws)
    }

    /// Bind `root` to `dataset` and make its staged entries `collection`.
    ///
    /// Without `force` this refuses to overwrite a directory that has files
    /// but is not a workspace, or a workspace whose collection differs from
    /// its parent version.
    pub fn stage<S>(
        root: impl Into<PathBuf>,
        dataset: &WorkspaceDataset,
        collection: &Collection,
        store: &S,
        force: bool,
    ) -> WorkspaceResult<Self>
    where
        S: DatasetStore + ?Sized,
    {
        let root = root.into();
        if !force {
            if Self::is_workspace(&root) {
                Self::open(&root)?.ensure_clean(store)?;
            } else if has_entries(&root)? {
                return Err(WorkspaceError::NotEmpty(root));
            }
        }
        let ws = Self::create(root, dataset)?;
        ws.collection().replace(collection)?;
        info!(
            dataset = %dataset.identifier(),
            root = %ws.root.display(),
            entries = collection.len(),
            "staged workspace"
        );
        Ok(ws)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/.ldb_workspace`
    pub fn base_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn collection(&self) -> WorkspaceCollection {
        WorkspaceCollection::new(self.base_dir().join(COLLECTION_DIR))
    }

    /// Read the descriptor.
    pub fn dataset(&self) -> WorkspaceResult<WorkspaceDataset> {
        let path = descriptor_path(&self.root);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WorkspaceError::NotAWorkspace(self.root.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|source| WorkspaceError::Json { path, source })
    }

    /// Overwrite the descriptor.
    pub fn save_dataset(&self, dataset: &WorkspaceDataset) -> WorkspaceResult<()> {
        let path = descriptor_path(&self.root);
        let bytes = serde_json::to_vec(dataset).map_err(|source| WorkspaceError::Json {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &bytes)?;
        debug!(path = %path.display(), dataset = %dataset.dataset_name, "wrote workspace dataset");
        Ok(())
    }

    /// Point the workspace at a freshly committed version.
    pub fn record_commit(&self, version: ObjectId, time: Timestamp) -> WorkspaceResult<()> {
        let mut dataset = self.dataset()?;
        dataset.parent = Some(version);
        dataset.staged_time = time;
        self.save_dataset(&dataset)
    }

    /// Whether the staged collection equals the parent version's collection
    /// (or is empty without a parent).
    pub fn is_clean<S>(&self, store: &S) -> WorkspaceResult<bool>
    where
        S: DatasetStore + ?Sized,
    {
        let dataset = self.dataset()?;
        let parent = store.version_collection(dataset.parent.as_ref())?;
        Ok(self.collection().read_all()? == parent)
    }

    /// Fail with [`WorkspaceError::Uncommitted`] unless clean.
    pub fn ensure_clean<S>(&self, store: &S) -> WorkspaceResult<()>
    where
        S: DatasetStore + ?Sized,
    {
        if self.is_clean(store)? {
            return Ok(());
        }
        Err(WorkspaceError::Uncommitted {
            dataset: self.dataset()?.identifier(),
        })
    }
}

fn descriptor_path(root: &Path) -> PathBuf {
    root.join(WORKSPACE_DIR).join(DATASET_FILE)
}

fn has_entries(dir: &Path) -> io::Result<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
