use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreResult;
use crate::key::StoreKey;
use crate::traits::{ObjectStore, WriteMode};

/// Directory-backed object store.
///
/// Each key maps to a file below `root`. Writes go to a temporary file in
/// the destination directory which is then renamed over the target, so
/// readers only ever see complete files. Hidden entries (names starting
/// with `.`, which includes in-flight temporary files) are never listed.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, key: &StoreKey) -> PathBuf {
        self.root.join(key.to_path())
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, key: &StoreKey) -> StoreResult<Option<Vec<u8>>> {
        let path = self.full_path(key);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) if path.is_dir() => {
                debug!(path = %path.display(), error = %e, "read of a directory key");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &StoreKey, data: &[u8], mode: WriteMode) -> StoreResult<bool> {
        let target = self.full_path(key);
        if mode == WriteMode::IfAbsent && target.exists() {
            return Ok(false);
        }
        let parent = match target.parent() {
            Some(parent) => parent.to_path_buf(),
            None => self.root.clone(),
        };
        fs::create_dir_all(&parent)?;

        let mut tmp = NamedTempFile::new_in(&parent)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;

        match mode {
            WriteMode::Overwrite => {
                tmp.persist(&target).map_err(|e| e.error)?;
            }
            WriteMode::IfAbsent => match tmp.persist_noclobber(&target) {
                Ok(_) => {}
                // Lost a race with another writer of the same content.
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
                Err(e) => return Err(e.error.into()),
            },
        }
        debug!(key = %key, bytes = data.len(), "wrote object");
        Ok(true)
    }

    fn exists(&self, key: &StoreKey) -> StoreResult<bool> {
        Ok(self.full_path(key).exists())
    }

    fn delete(&self, key: &StoreKey) -> StoreResult<bool> {
        let path = self.full_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        if let Some(parent) = path.parent() {
            if parent != self.root && is_empty_dir(parent)? {
                fs::remove_dir(parent)?;
            }
        }
        Ok(true)
    }

    fn list(&self, prefix: &StoreKey) -> StoreResult<Vec<String>> {
        let dir = self.full_path(prefix);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn path_for(&self, key: &StoreKey) -> Option<PathBuf> {
        Some(self.full_path(key))
    }
}

fn is_empty_dir(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> StoreKey {
        StoreKey::parse(s).unwrap()
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(store
            .write(&key("objects/abc/def"), b"payload", WriteMode::IfAbsent)
            .unwrap());
        let on_disk = fs::read(dir.path().join("objects/abc/def")).unwrap();
        assert_eq!(on_disk, b"payload");
    }

    #[test]
    fn if_absent_is_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store.write(&key("a/b"), b"first", WriteMode::IfAbsent).unwrap();
        assert!(!store.write(&key("a/b"), b"second", WriteMode::IfAbsent).unwrap());
        assert_eq!(store.read(&key("a/b")).unwrap().unwrap(), b"first");

        store.write(&key("a/b"), b"third", WriteMode::Overwrite).unwrap();
        assert_eq!(store.read(&key("a/b")).unwrap().unwrap(), b"third");
    }

    #[test]
    fn no_temporary_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        for i in 0..5 {
            store
                .write(&key("d/file"), format!("{i}").as_bytes(), WriteMode::Overwrite)
                .unwrap();
        }
        let names: Vec<_> = fs::read_dir(dir.path().join("d"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("file")]);
    }

    #[test]
    fn read_missing_and_directory_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(store.read(&key("missing")).unwrap().is_none());
        store.write(&key("lvl/x"), b"1", WriteMode::Overwrite).unwrap();
        assert!(store.read(&key("lvl")).unwrap().is_none());
        assert!(store.exists(&key("lvl")).unwrap());
    }

    #[test]
    fn delete_prunes_empty_shard_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store.write(&key("coll/abc/one"), b"", WriteMode::Overwrite).unwrap();
        store.write(&key("coll/abc/two"), b"", WriteMode::Overwrite).unwrap();

        assert!(store.delete(&key("coll/abc/one")).unwrap());
        assert!(dir.path().join("coll/abc").is_dir());
        assert!(store.delete(&key("coll/abc/two")).unwrap());
        assert!(!dir.path().join("coll/abc").exists());
        assert!(dir.path().join("coll").is_dir());
        assert!(!store.delete(&key("coll/abc/two")).unwrap());
    }

    #[test]
    fn list_skips_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store.write(&key("l/b"), b"", WriteMode::Overwrite).unwrap();
        store.write(&key("l/a"), b"", WriteMode::Overwrite).unwrap();
        fs::write(dir.path().join("l/.tmp123"), b"").unwrap();
        assert_eq!(store.list(&key("l")).unwrap(), vec!["a", "b"]);
        assert!(store.list(&key("nothing")).unwrap().is_empty());
    }

    #[test]
    fn path_for_points_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert_eq!(
            store.path_for(&key("x/y")).unwrap(),
            dir.path().join("x").join("y")
        );
    }
}
