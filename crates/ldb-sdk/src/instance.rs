//! The [`Ldb`] instance handle.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ldb_index::{IndexOptions, Indexer, IndexingResult};
use ldb_storage::{AddOutcome, FileSystems, StorageConfig, StorageLocation};
use ldb_store::layout::{DATASETS, DATA_OBJECT_INFO, INSTANCE_DIRS};
use ldb_store::{Catalog, FsObjectStore, StoreError};
use ldb_types::{current_user, ObjectId};
use tracing::{debug, info};

use crate::config::{default_instance_dir, Config, CONFIG_FILE, STORAGE_FILE};
use crate::error::{SdkError, SdkResult};

/// Counts reported by [`Ldb::tag`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TagSummary {
    pub num_selected: usize,
    pub num_updated: usize,
}

/// An open LDB instance.
///
/// Holds the catalog over the instance directory, the parsed instance
/// config and the filesystems indexing may read from. Nothing is global;
/// every operation goes through a handle.
pub struct Ldb {
    dir: PathBuf,
    catalog: Catalog,
    config: Config,
    fss: FileSystems,
    user: String,
}

impl std::fmt::Debug for Ldb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ldb")
            .field("dir", &self.dir)
            .field("config", &self.config)
            .field("user", &self.user)
            .finish()
    }
}

impl Ldb {
    /// Create an instance at `dir`.
    ///
    /// Fails on a non-empty directory. With `force`, an existing instance
    /// at `dir` is deleted and recreated; other directories are never
    /// cleared.
    pub fn init(dir: impl Into<PathBuf>, force: bool) -> SdkResult<Self> {
        let dir = dir.into();
        if has_entries(&dir)? {
            if !(force && is_instance(&dir)) {
                return Err(SdkError::DirectoryNotEmpty(dir));
            }
            info!(dir = %dir.display(), "removing existing instance");
            fs::remove_dir_all(&dir)?;
        }
        for sub in INSTANCE_DIRS {
            fs::create_dir_all(dir.join(sub))?;
        }
        for file in [CONFIG_FILE, STORAGE_FILE] {
            fs::write(dir.join(file), b"")?;
        }
        info!(dir = %dir.display(), "initialized instance");
        Self::open(dir)
    }

    /// Open an existing instance.
    pub fn open(dir: impl Into<PathBuf>) -> SdkResult<Self> {
        let dir = dir.into();
        if !is_instance(&dir) {
            return Err(SdkError::NotInitialized(dir));
        }
        let config = Config::load(&dir.join(CONFIG_FILE))?;
        let catalog = Catalog::new(Arc::new(FsObjectStore::new(&dir)));
        debug!(dir = %dir.display(), "opened instance");
        Ok(Self {
            dir,
            catalog,
            config,
            fss: FileSystems::local(),
            user: current_user(),
        })
    }

    /// Open the instance named by `LDB_DIR`, the user config, or the
    /// default location.
    pub fn open_default() -> SdkResult<Self> {
        Self::open(default_instance_dir()?)
    }

    /// Use `fss` for every filesystem access instead of local-only.
    pub fn with_filesystems(mut self, fss: FileSystems) -> Self {
        self.fss = fss;
        self
    }

    /// Record `user` as the author of commits and indexing runs.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn filesystems(&self) -> &FileSystems {
        &self.fss
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn storage_path(&self) -> PathBuf {
        self.dir.join(STORAGE_FILE)
    }

    /// The current storage registry.
    pub fn storage(&self) -> SdkResult<StorageConfig> {
        Ok(StorageConfig::load(&self.storage_path())?)
    }

    /// Register a storage location; the registry file is only rewritten on
    /// success.
    pub fn add_storage(&self, location: StorageLocation, force: bool) -> SdkResult<AddOutcome> {
        Ok(StorageConfig::add_to_file(&self.storage_path(), location, force)?)
    }

    /// Index options seeded from the instance config.
    pub fn index_options(&self) -> SdkResult<IndexOptions> {
        Ok(IndexOptions {
            format: self.config.default_format()?,
            read_any_cloud_location: self.config.core.read_any_cloud_location,
            ..IndexOptions::default()
        })
    }

    /// Index `paths` into this instance.
    pub fn index(&self, paths: &[String], options: IndexOptions) -> SdkResult<IndexingResult> {
        let storage = self.storage()?;
        let result = Indexer::new(&self.catalog, &storage, &self.fss, options)
            .with_user(self.user.clone())
            .index(paths)?;
        Ok(result)
    }

    /// Add and remove tags on indexed data objects. Meta files are only
    /// rewritten when their tag set changes.
    pub fn tag(&self, data_objects: &[ObjectId], add: &[String], remove: &[String]) -> SdkResult<TagSummary> {
        let mut summary = TagSummary::default();
        let unique: BTreeSet<&ObjectId> = data_objects.iter().collect();
        for id in unique {
            let mut meta = self.catalog.require_data_object_meta(id)?;
            summary.num_selected += 1;
            if meta.update_tags(add, remove) {
                self.catalog.put_data_object_meta(id, &meta)?;
                summary.num_updated += 1;
            }
        }
        info!(selected = summary.num_selected, updated = summary.num_updated, "tagged data objects");
        Ok(summary)
    }

    /// Current annotation of each data object, in order.
    pub fn current_annotations(&self, data_objects: &[ObjectId]) -> SdkResult<Vec<(ObjectId, Option<ObjectId>)>> {
        data_objects
            .iter()
            .map(|id| match self.catalog.current_annotation(id) {
                Ok(annotation) => Ok((*id, annotation)),
                Err(StoreError::DataObjectNotFound(id)) => {
                    Err(ldb_index::IndexError::DataObjectNotFound { id, path: None }.into())
                }
                Err(e) => Err(e.into()),
            })
            .collect()
    }
}

fn is_instance(dir: &Path) -> bool {
    dir.join(DATA_OBJECT_INFO).is_dir() && dir.join(DATASETS).is_dir()
}

fn has_entries(dir: &Path) -> std::io::Result<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
