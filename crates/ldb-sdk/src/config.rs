//! Instance configuration and instance directory resolution.
//!
//! Each instance has a TOML `config` file. A user-level `~/.ldb/config`
//! may additionally set `core.ldb_dir` to choose the default instance.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ldb_index::Format;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SdkError, SdkResult};

/// Environment variable naming the instance directory.
pub const LDB_DIR_ENV: &str = "LDB_DIR";
/// User-level directory under the home directory.
pub const GLOBAL_BASE: &str = ".ldb";
/// Default instance directory inside [`GLOBAL_BASE`].
pub const DEFAULT_INSTANCE: &str = "private_instance";
/// Config file name, both per instance and user level.
pub const CONFIG_FILE: &str = "config";
/// Storage registry file name inside an instance.
pub const STORAGE_FILE: &str = "storage";

/// `[core]`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Index files on non-local backends outside every storage location.
    pub read_any_cloud_location: bool,
    /// Default instance directory; only honored in the user-level config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ldb_dir: Option<PathBuf>,
}

/// `[index]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Format used when a command does not name one.
    pub default_format: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            default_format: Format::default().name().to_string(),
        }
    }
}

/// A parsed config file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub core: CoreConfig,
    pub index: IndexConfig,
}

impl Config {
    /// Load a config file; a missing or empty file yields the defaults.
    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&text).map_err(|source| SdkError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> SdkResult<()> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// The configured default format.
    pub fn default_format(&self) -> SdkResult<Format> {
        self.index.default_format.parse().map_err(|_| {
            SdkError::InvalidArgument(format!(
                "invalid index.default_format in config: {:?}",
                self.index.default_format
            ))
        })
    }
}

/// `~/.ldb`
pub fn global_base() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_BASE))
}

/// The instance directory to use when none is given explicitly.
///
/// Checked in order: the `LDB_DIR` environment variable, `core.ldb_dir` in
/// `~/.ldb/config`, then `~/.ldb/private_instance`.
pub fn default_instance_dir() -> SdkResult<PathBuf> {
    if let Some(dir) = std::env::var_os(LDB_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let base = global_base().ok_or(SdkError::NoHomeDirectory)?;
    instance_dir_from_base(&base)
}

fn instance_dir_from_base(base: &Path) -> SdkResult<PathBuf> {
    let global = Config::load(&base.join(CONFIG_FILE))?;
    Ok(global
        .core
        .ldb_dir
        .unwrap_or_else(|| base.join(DEFAULT_INSTANCE)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert!(!c.core.read_any_cloud_location);
        assert!(c.core.ldb_dir.is_none());
        assert_eq!(c.index.default_format, "auto");
        assert_eq!(c.default_format().unwrap(), Format::Auto);
    }

    #[test]
    fn missing_and_empty_files_are_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        assert_eq!(Config::load(&path).unwrap(), Config::default());
        fs::write(&path, "").unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[core]\nread_any_cloud_location = true\n").unwrap();
        let c = Config::load(&path).unwrap();
        assert!(c.core.read_any_cloud_location);
        assert_eq!(c.index.default_format, "auto");
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(CONFIG_FILE);
        let mut c = Config::default();
        c.index.default_format = "bare".into();
        c.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.default_format().unwrap(), Format::Bare);
        assert!(!fs::read_to_string(&path).unwrap().contains("ldb_dir"));
    }

    #[test]
    fn bad_files_are_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[core\n").unwrap();
        assert!(matches!(Config::load(&path), Err(SdkError::Config { .. })));

        let mut c = Config::default();
        c.index.default_format = "nope".into();
        assert!(matches!(c.default_format(), Err(SdkError::InvalidArgument(_))));
    }

    #[test]
    fn instance_dir_from_user_config() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            instance_dir_from_base(tmp.path()).unwrap(),
            tmp.path().join(DEFAULT_INSTANCE)
        );
        fs::write(tmp.path().join(CONFIG_FILE), "[core]\nldb_dir = \"/data/ldb\"\n").unwrap();
        assert_eq!(
            instance_dir_from_base(tmp.path()).unwrap(),
            PathBuf::from("/data/ldb")
        );
    }
}
