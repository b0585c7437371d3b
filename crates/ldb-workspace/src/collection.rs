//! The staged collection, one small file per data object.
//!
//! Entries live at `<dir>/<hash[:3]>/<hash[3:]>` and contain the annotation
//! hash as text, or nothing for an unannotated data object. Adding or
//! removing one entry touches one file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ldb_collection::Collection;
use ldb_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{WorkspaceError, WorkspaceResult};

/// Handle on a workspace collection directory.
#[derive(Clone, Debug)]
pub struct WorkspaceCollection {
    dir: PathBuf,
}

impl WorkspaceCollection {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, data_object: &ObjectId) -> PathBuf {
        let (shard, rest) = data_object.shard();
        self.dir.join(shard).join(rest)
    }

    /// `None` if the data object is not staged, `Some(None)` if it is staged
    /// without an annotation.
    pub fn get(&self, data_object: &ObjectId) -> WorkspaceResult<Option<Option<ObjectId>>> {
        let path = self.entry_path(data_object);
        match fs::read_to_string(&path) {
            Ok(text) => parse_annotation(&path, &text).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Stage a data object. Returns `true` if the entry was created or its
    /// annotation changed.
    pub fn add(&self, data_object: &ObjectId, annotation: Option<&ObjectId>) -> WorkspaceResult<bool> {
        let path = self.entry_path(data_object);
        let text = annotation.map(ObjectId::to_hex).unwrap_or_default();
        match fs::read(&path) {
            Ok(existing) if existing == text.as_bytes() => return Ok(false),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        write_atomic(&path, text.as_bytes())?;
        Ok(true)
    }

    /// Stage every entry of `collection`, returning how many changed.
    pub fn add_all(&self, collection: &Collection) -> WorkspaceResult<usize> {
        let mut changed = 0;
        for (data_object, annotation) in collection.iter() {
            if self.add(data_object, annotation)? {
                changed += 1;
            }
        }
        debug!(dir = %self.dir.display(), entries = collection.len(), changed, "staged entries");
        Ok(changed)
    }

    /// Unstage a data object, pruning its shard directory once empty.
    /// Returns `true` if it was staged.
    pub fn remove(&self, data_object: &ObjectId) -> WorkspaceResult<bool> {
        let path = self.entry_path(data_object);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        if let Some(shard) = path.parent() {
            if fs::read_dir(shard)?.next().is_none() {
                fs::remove_dir(shard)?;
            }
        }
        Ok(true)
    }

    /// Rebuild the full collection by walking the shard directories.
    pub fn read_all(&self) -> WorkspaceResult<Collection> {
        if !self.dir.exists() {
            return Ok(Collection::new());
        }
        let mut collection = Collection::new();
        for entry in WalkDir::new(&self.dir).min_depth(2).max_depth(2) {
            let entry = entry.map_err(io::Error::from)?;
            let name = entry.file_name().to_string_lossy();
            // In-flight temporary files are hidden.
            if !entry.file_type().is_file() || name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            let shard = path
                .parent()
                .and_then(Path::file_name)
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let data_object = ObjectId::from_shard(&shard, &name).map_err(|e| {
                WorkspaceError::InvalidEntry {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            })?;
            let text = fs::read_to_string(path)?;
            collection.insert(data_object, parse_annotation(path, &text)?);
        }
        Ok(collection)
    }

    /// Make the staged entries exactly `collection`.
    pub fn replace(&self, collection: &Collection) -> WorkspaceResult<()> {
        self.clear()?;
        self.add_all(collection)?;
        Ok(())
    }

    /// Remove every entry, leaving an empty collection directory.
    pub fn clear(&self) -> WorkspaceResult<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

fn parse_annotation(path: &Path, text: &str) -> WorkspaceResult<Option<ObjectId>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    ObjectId::from_hex(text)
        .map(Some)
        .map_err(|e| WorkspaceError::InvalidEntry {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Write through a temporary file in the target directory and rename it
/// into place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(n: u8) -> ObjectId {
        ObjectId::from([n; 16])
    }

    fn staged() -> (tempfile::TempDir, WorkspaceCollection) {
        let tmp = tempfile::tempdir().unwrap();
        let wc = WorkspaceCollection::new(tmp.path().join("collection"));
        (tmp, wc)
    }

    // ---- Single entries ----

    #[test]
    fn add_reports_changes() {
        let (_tmp, wc) = staged();
        assert!(wc.add(&id(1), None).unwrap());
        assert!(!wc.add(&id(1), None).unwrap());
        assert!(wc.add(&id(1), Some(&id(2))).unwrap());
        assert!(!wc.add(&id(1), Some(&id(2))).unwrap());
        assert_eq!(wc.get(&id(1)).unwrap(), Some(Some(id(2))));
        assert_eq!(wc.get(&id(3)).unwrap(), None);
    }

    #[test]
    fn entry_file_layout() {
        let (_tmp, wc) = staged();
        wc.add(&id(0xab), Some(&id(7))).unwrap();
        let hex = id(0xab).to_hex();
        let path = wc.dir().join(&hex[..3]).join(&hex[3..]);
        assert_eq!(fs::read_to_string(path).unwrap(), id(7).to_hex());

        wc.add(&id(0xcd), None).unwrap();
        let hex = id(0xcd).to_hex();
        assert_eq!(fs::read_to_string(wc.dir().join(&hex[..3]).join(&hex[3..])).unwrap(), "");
    }

    #[test]
    fn remove_prunes_empty_shards() {
        let (_tmp, wc) = staged();
        wc.add(&id(1), None).unwrap();
        let shard = wc.dir().join(&id(1).to_hex()[..3]);
        assert!(shard.is_dir());
        assert!(wc.remove(&id(1)).unwrap());
        assert!(!shard.exists());
        assert!(!wc.remove(&id(1)).unwrap());
    }

    #[test]
    fn remove_keeps_shared_shard() {
        let (_tmp, wc) = staged();
        let a = ObjectId::from_hex("abc00000000000000000000000000001").unwrap();
        let b = ObjectId::from_hex("abc00000000000000000000000000002").unwrap();
        wc.add(&a, None).unwrap();
        wc.add(&b, None).unwrap();
        wc.remove(&a).unwrap();
        assert!(wc.dir().join("abc").is_dir());
        assert_eq!(wc.read_all().unwrap().len(), 1);
    }

    // ---- Whole collections ----

    #[test]
    fn missing_dir_reads_empty() {
        let (_tmp, wc) = staged();
        assert!(wc.read_all().unwrap().is_empty());
    }

    #[test]
    fn replace_discards_previous_entries() {
        let (_tmp, wc) = staged();
        wc.add(&id(1), None).unwrap();
        let next: Collection = [(id(2), Some(id(3)))].into_iter().collect();
        wc.replace(&next).unwrap();
        assert_eq!(wc.read_all().unwrap(), next);
    }

    #[test]
    fn read_all_skips_hidden_and_rejects_garbage() {
        let (_tmp, wc) = staged();
        wc.add(&id(1), None).unwrap();
        let shard = wc.dir().join(&id(1).to_hex()[..3]);
        fs::write(shard.join(".tmpXYZ"), "partial").unwrap();
        assert_eq!(wc.read_all().unwrap().len(), 1);

        fs::write(shard.join("zz"), "").unwrap();
        assert!(matches!(
            wc.read_all(),
            Err(WorkspaceError::InvalidEntry { .. })
        ));
    }

    fn arb_collection() -> impl Strategy<Value = Collection> {
        proptest::collection::btree_map(any::<u8>(), proptest::option::of(0u8..4), 0..20)
            .prop_map(|m| m.into_iter().map(|(k, v)| (id(k), v.map(id))).collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn staged_files_read_back(c in arb_collection()) {
            let (_tmp, wc) = staged();
            prop_assert_eq!(wc.add_all(&c).unwrap(), c.len());
            prop_assert_eq!(wc.read_all().unwrap(), c);
        }
    }
}
