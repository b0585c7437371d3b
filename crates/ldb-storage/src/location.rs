//! The storage location registry.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::fs::LOCAL_PROTOCOL;
use crate::path::{isin, normalize_path};

/// Backend options passed through to the filesystem of a location.
pub type FsOptions = BTreeMap<String, serde_json::Value>;

/// One registered storage root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageLocation {
    pub path: String,
    pub protocol: String,
    pub fs_id: String,
    pub read_access_verified: bool,
    pub write_access_verified: bool,
    /// Destination for auto-imported ephemeral files. At most one location
    /// in a registry may set this.
    pub read_and_add: bool,
    pub options: FsOptions,
}

impl Default for StorageLocation {
    fn default() -> Self {
        Self {
            path: String::new(),
            protocol: LOCAL_PROTOCOL.to_string(),
            fs_id: String::new(),
            read_access_verified: false,
            write_access_verified: false,
            read_and_add: false,
            options: FsOptions::new(),
        }
    }
}

impl StorageLocation {
    /// Build a local location from a user-supplied path.
    ///
    /// The path is made absolute against the current directory and
    /// lexically normalized; read and write access are probed on the
    /// directory as it is now.
    pub fn local(path: impl AsRef<Path>, read_and_add: bool, options: FsOptions) -> StorageResult<Self> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let normalized = normalize_path(&absolute);
        let display = normalized.to_string_lossy().into_owned();
        Ok(Self {
            read_access_verified: fs::read_dir(&normalized).is_ok(),
            write_access_verified: fs::metadata(&normalized)
                .map(|m| !m.permissions().readonly())
                .unwrap_or(false),
            path: display,
            read_and_add,
            options,
            ..Self::default()
        })
    }

    /// A location on a non-local backend, e.g. `("s3", "bucket/prefix")`.
    pub fn remote(protocol: impl Into<String>, path: impl Into<String>, options: FsOptions) -> Self {
        let path: String = path.into();
        Self {
            path: path.trim_end_matches('/').to_string(),
            protocol: protocol.into(),
            options,
            ..Self::default()
        }
    }

    /// Whether `path` on `protocol` lies strictly inside this location.
    pub fn contains(&self, path: &str, protocol: &str) -> bool {
        self.protocol == protocol && isin(path, &self.path)
    }

    fn describe_changes(&self, new: &StorageLocation) -> Vec<String> {
        let mut changes = Vec::new();
        let mut field = |name: &str, old: String, new: String| {
            if old != new {
                changes.push(format!("{name}: {old} -> {new}"));
            }
        };
        field("fs_id", format!("{:?}", self.fs_id), format!("{:?}", new.fs_id));
        field(
            "read_access_verified",
            self.read_access_verified.to_string(),
            new.read_access_verified.to_string(),
        );
        field(
            "write_access_verified",
            self.write_access_verified.to_string(),
            new.write_access_verified.to_string(),
        );
        field(
            "read_and_add",
            self.read_and_add.to_string(),
            new.read_and_add.to_string(),
        );
        field(
            "options",
            serde_json::to_string(&self.options).unwrap_or_default(),
            serde_json::to_string(&new.options).unwrap_or_default(),
        );
        changes
    }
}

/// How a path relates to the registered storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathClass {
    /// Inside a registered location; referenced in place.
    Storage,
    /// A local file outside every location; must be imported first.
    Ephemeral,
    /// A remote file outside every location.
    Foreign,
}

/// What `add_location` did to the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added { path: String },
    /// An existing entry for the same path was replaced.
    Updated { path: String, changes: Vec<String> },
    /// The new parent location replaced these children.
    ReplacedChildren { path: String, children: Vec<String> },
}

impl std::fmt::Display for AddOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddOutcome::Added { path } => write!(f, "Added storage location {path:?}"),
            AddOutcome::Updated { path, changes } => {
                write!(f, "Updated storage location {path:?}:")?;
                for change in changes {
                    write!(f, "\n  {change}")?;
                }
                Ok(())
            }
            AddOutcome::ReplacedChildren { path, children } => {
                write!(f, "Added storage location {path:?}\nRemoved its children:")?;
                for child in children {
                    write!(f, "\n  {child:?}")?;
                }
                Ok(())
            }
        }
    }
}

/// The registry persisted in an instance's `storage` file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub locations: Vec<StorageLocation>,
}

impl StorageConfig {
    /// Load a registry; a missing or empty file is an empty registry.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Validate and atomically write the registry.
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        self.validate()?;
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
        fs::create_dir_all(parent)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
        debug!(path = %path.display(), locations = self.locations.len(), "saved storage registry");
        Ok(())
    }

    /// Check registry-wide constraints.
    pub fn validate(&self) -> StorageResult<()> {
        if self.locations.iter().filter(|loc| loc.read_and_add).count() > 1 {
            return Err(StorageError::Configuration(
                "Only one storage location may be set as read-add".to_string(),
            ));
        }
        Ok(())
    }

    /// Register a location, enforcing the nesting rules.
    ///
    /// Leaves `self` untouched on error.
    pub fn add_location(&mut self, location: StorageLocation, force: bool) -> StorageResult<AddOutcome> {
        let mut location = location;
        let mut kept = Vec::with_capacity(self.locations.len() + 1);
        let mut replaced: Option<StorageLocation> = None;
        let mut children = Vec::new();

        for existing in &self.locations {
            if existing.protocol != location.protocol {
                kept.push(existing.clone());
                continue;
            }
            if existing.path == location.path {
                let newly_read_add = location.read_and_add && !existing.read_and_add;
                if newly_read_add || existing.options != location.options {
                    replaced = Some(existing.clone());
                    continue;
                }
                return Err(StorageError::AlreadyExists(location.path));
            }
            if isin(&location.path, &existing.path) {
                return Err(StorageError::InsideExisting {
                    path: location.path,
                    existing: existing.path.clone(),
                });
            }
            if isin(&existing.path, &location.path) {
                children.push(existing.clone());
                continue;
            }
            kept.push(existing.clone());
        }

        let inherits_read_add = match &replaced {
            Some(old) => old.read_and_add,
            None => children.iter().any(|c| c.read_and_add),
        };
        if inherits_read_add {
            location.read_and_add = true;
        }

        let outcome = if let Some(old) = &replaced {
            AddOutcome::Updated {
                path: location.path.clone(),
                changes: old.describe_changes(&location),
            }
        } else if !children.is_empty() {
            let paths: Vec<String> = children.into_iter().map(|c| c.path).collect();
            if !force {
                return Err(StorageError::ParentOfExisting {
                    path: location.path,
                    children: paths,
                });
            }
            AddOutcome::ReplacedChildren {
                path: location.path.clone(),
                children: paths,
            }
        } else {
            AddOutcome::Added {
                path: location.path.clone(),
            }
        };

        kept.push(location);
        let candidate = StorageConfig { locations: kept };
        candidate.validate()?;
        *self = candidate;
        info!(%outcome, "storage registry updated");
        Ok(outcome)
    }

    /// Load, add, validate and save in one step.
    ///
    /// The file is only rewritten when the whole operation succeeds.
    pub fn add_to_file(path: &Path, location: StorageLocation, force: bool) -> StorageResult<AddOutcome> {
        let mut config = Self::load(path)?;
        let outcome = config.add_location(location, force)?;
        config.save(path)?;
        Ok(outcome)
    }

    /// The single read-and-add location, if configured.
    pub fn read_add_location(&self) -> Option<&StorageLocation> {
        self.locations.iter().find(|loc| loc.read_and_add)
    }

    /// The registered location containing `path`, if any.
    pub fn containing_location(&self, path: &str, protocol: &str) -> Option<&StorageLocation> {
        self.locations.iter().find(|loc| loc.contains(path, protocol))
    }

    pub fn classify(&self, path: &str, protocol: &str) -> PathClass {
        if self.containing_location(path, protocol).is_some() {
            PathClass::Storage
        } else if protocol == LOCAL_PROTOCOL {
            PathClass::Ephemeral
        } else {
            PathClass::Foreign
        }
    }
}
