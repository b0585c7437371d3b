//! The filesystem capability consumed by discovery, indexing and import.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::overrides::OverrideBuilder;
use ldb_hash::ProviderChecksum;
use ldb_types::Timestamp;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{StorageError, StorageResult};
use crate::path::{is_hidden, normalize_path};

/// Protocol name of the local filesystem.
pub const LOCAL_PROTOCOL: &str = "file";

const GLOB_CHARS: &[char] = &['*', '?', '['];

/// Stat information for one file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub mode: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub atime: Option<Timestamp>,
    pub mtime: Option<Timestamp>,
    pub ctime: Option<Timestamp>,
}

/// A filesystem LDB can discover, read and copy files on.
///
/// Paths are absolute, `/`-separated strings in the backend's own
/// namespace (a local path, or a bucket key for object stores). Hidden
/// paths are never yielded by `expand` or `walk_files`.
pub trait FileSystem: Send + Sync {
    /// Protocol name, e.g. `"file"` or `"s3"`.
    fn protocol(&self) -> &str;

    /// Identifier distinguishing filesystems that share a protocol.
    fn fs_id(&self) -> &str {
        ""
    }

    /// Paths (files and directories) matching a glob pattern, sorted.
    ///
    /// A pattern without glob characters matches itself if it exists.
    fn expand(&self, pattern: &str) -> StorageResult<Vec<String>>;

    /// Every file below `dir`, recursively, sorted.
    fn walk_files(&self, dir: &str) -> StorageResult<Vec<String>>;

    fn exists(&self, path: &str) -> bool;

    fn is_dir(&self, path: &str) -> bool;

    fn is_file(&self, path: &str) -> bool;

    /// Open a file for streaming reads.
    fn open(&self, path: &str) -> StorageResult<Box<dyn Read + Send>>;

    /// Read a whole file.
    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.open(path)?.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Stat a file.
    fn info(&self, path: &str) -> StorageResult<FileInfo>;

    /// Create (or replace) `path` with everything `reader` yields,
    /// creating parent directories. Returns the number of bytes written.
    fn create(&self, path: &str, reader: &mut dyn Read) -> StorageResult<u64>;

    /// Delete a file. A missing file is not an error.
    fn remove_file(&self, path: &str) -> StorageResult<()>;

    /// Copy a file within this filesystem.
    fn copy_file(&self, from: &str, to: &str) -> StorageResult<u64> {
        let mut reader = self.open(from)?;
        self.create(to, &mut reader)
    }

    /// A content checksum the backend already knows, if any.
    fn provider_checksum(&self, _path: &str) -> Option<ProviderChecksum> {
        None
    }
}

/// The local disk.
#[derive(Clone, Debug, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn protocol(&self) -> &str {
        LOCAL_PROTOCOL
    }

    fn expand(&self, pattern: &str) -> StorageResult<Vec<String>> {
        let normalized = path_string(&normalize_path(Path::new(pattern)));
        if is_hidden(&normalized) {
            return Ok(Vec::new());
        }
        if !normalized.contains(GLOB_CHARS) {
            return Ok(if Path::new(&normalized).exists() {
                vec![normalized]
            } else {
                Vec::new()
            });
        }

        let (base, remainder) = split_glob_base(&normalized);
        if !Path::new(&base).is_dir() {
            return Ok(Vec::new());
        }
        let matcher = OverrideBuilder::new(&base)
            .add(&format!("/{remainder}"))
            .and_then(|builder| builder.build())
            .map_err(|e| StorageError::Glob {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        let mut walker = WalkDir::new(&base).min_depth(1).follow_links(true);
        if !remainder.contains("**") {
            walker = walker.max_depth(remainder.split('/').count());
        }
        let mut matches = Vec::new();
        for entry in walker
            .into_iter()
            .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry during glob expansion");
                    continue;
                }
            };
            let is_dir = entry.file_type().is_dir();
            if matcher.matched(entry.path(), is_dir).is_whitelist() {
                matches.push(path_string(entry.path()));
            }
        }
        matches.sort();
        Ok(matches)
    }

    fn walk_files(&self, dir: &str) -> StorageResult<Vec<String>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry.map_err(|e| {
                StorageError::Io(e.into_io_error().unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::Other, "filesystem loop")
                }))
            })?;
            if entry.file_type().is_file() {
                files.push(path_string(entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn is_dir(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn is_file(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn open(&self, path: &str) -> StorageResult<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(path)?))
    }

    fn info(&self, path: &str) -> StorageResult<FileInfo> {
        let meta = fs::metadata(path)?;
        Ok(file_info(&meta))
    }

    fn create(&self, path: &str, reader: &mut dyn Read) -> StorageResult<u64> {
        let target = PathBuf::from(path);
        let parent = target
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
        fs::create_dir_all(parent)?;
        // The target only appears once every byte is on disk.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        let written = io::copy(reader, &mut tmp)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| StorageError::Io(e.error))?;
        Ok(written)
    }

    fn remove_file(&self, path: &str) -> StorageResult<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Filesystems available to an instance, keyed by protocol.
#[derive(Clone)]
pub struct FileSystems {
    by_protocol: BTreeMap<String, Arc<dyn FileSystem>>,
}

impl FileSystems {
    /// A registry holding only the local filesystem.
    pub fn local() -> Self {
        let mut fss = Self {
            by_protocol: BTreeMap::new(),
        };
        fss.register(Arc::new(LocalFileSystem::new()));
        fss
    }

    /// Add or replace the filesystem for its protocol.
    pub fn register(&mut self, fs: Arc<dyn FileSystem>) {
        self.by_protocol.insert(fs.protocol().to_string(), fs);
    }

    pub fn get(&self, protocol: &str) -> StorageResult<Arc<dyn FileSystem>> {
        self.by_protocol
            .get(protocol)
            .cloned()
            .ok_or_else(|| StorageError::UnsupportedProtocol(protocol.to_string()))
    }

    pub fn protocols(&self) -> impl Iterator<Item = &str> {
        self.by_protocol.keys().map(String::as_str)
    }
}

impl Default for FileSystems {
    fn default() -> Self {
        Self::local()
    }
}

impl std::fmt::Debug for FileSystems {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.by_protocol.keys()).finish()
    }
}

/// Split a normalized glob into the literal directory prefix and the rest.
fn split_glob_base(pattern: &str) -> (String, String) {
    let components: Vec<&str> = pattern.split('/').collect();
    let first_glob = components
        .iter()
        .position(|c| c.contains(GLOB_CHARS))
        .unwrap_or(components.len());
    let base = components[..first_glob].join("/");
    let base = if base.is_empty() { "/".to_string() } else { base };
    (base, components[first_glob..].join("/"))
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(unix)]
fn file_info(meta: &fs::Metadata) -> FileInfo {
    use std::os::unix::fs::MetadataExt;
    use std::time::{Duration, UNIX_EPOCH};

    let ctime = UNIX_EPOCH
        .checked_add(Duration::new(meta.ctime().max(0) as u64, meta.ctime_nsec().max(0) as u32));
    FileInfo {
        size: meta.len(),
        mode: meta.mode(),
        uid: Some(meta.uid()),
        gid: Some(meta.gid()),
        atime: meta.accessed().ok().map(Timestamp::from_system_time),
        mtime: meta.modified().ok().map(Timestamp::from_system_time),
        ctime: ctime.map(Timestamp::from_system_time),
    }
}

#[cfg(not(unix))]
fn file_info(meta: &fs::Metadata) -> FileInfo {
    let created: Option<std::time::SystemTime> = meta.created().ok();
    FileInfo {
        size: meta.len(),
        mode: if meta.permissions().readonly() { 0o444 } else { 0o644 },
        uid: None,
        gid: None,
        atime: meta.accessed().ok().map(Timestamp::from_system_time),
        mtime: meta.modified().ok().map(Timestamp::from_system_time),
        ctime: created.map(Timestamp::from_system_time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel.as_bytes()).unwrap();
    }

    fn rel(root: &Path, paths: Vec<String>) -> Vec<String> {
        let prefix = format!("{}/", root.display());
        paths
            .into_iter()
            .map(|p| p.strip_prefix(&prefix).unwrap_or(&p).to_string())
            .collect()
    }

    // Default temp dirs are named `.tmpXXXX`, which would make every path hidden.
    fn tempdir() -> tempfile::TempDir {
        tempfile::Builder::new().prefix("ldb-fs").tempdir().unwrap()
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempdir();
        for f in [
            "data/a.png",
            "data/a.json",
            "data/b.png",
            "data/sub/c.png",
            "data/sub/deep/d.png",
            "data/.hidden/e.png",
            "data/.f.png",
        ] {
            touch(dir.path(), f);
        }
        dir
    }

    #[test]
    fn expand_literal_path() {
        let dir = fixture();
        let fs = LocalFileSystem::new();
        let root = dir.path().display().to_string();
        assert_eq!(
            rel(dir.path(), fs.expand(&format!("{root}/data/a.png")).unwrap()),
            vec!["data/a.png"]
        );
        assert!(fs.expand(&format!("{root}/data/zzz.png")).unwrap().is_empty());
        assert!(fs.expand(&format!("{root}/data/.f.png")).unwrap().is_empty());
    }

    #[test]
    fn expand_single_level_glob() {
        let dir = fixture();
        let fs = LocalFileSystem::new();
        let root = dir.path().display().to_string();
        assert_eq!(
            rel(dir.path(), fs.expand(&format!("{root}/data/*.png")).unwrap()),
            vec!["data/a.png", "data/b.png"]
        );
        assert_eq!(
            rel(dir.path(), fs.expand(&format!("{root}/data/*")).unwrap()),
            vec!["data/a.json", "data/a.png", "data/b.png", "data/sub"]
        );
    }

    #[test]
    fn expand_recursive_glob_skips_hidden() {
        let dir = fixture();
        let fs = LocalFileSystem::new();
        let root = dir.path().display().to_string();
        let found = rel(dir.path(), fs.expand(&format!("{root}/data/**/*.png")).unwrap());
        assert!(found.contains(&"data/sub/c.png".to_string()));
        assert!(found.contains(&"data/sub/deep/d.png".to_string()));
        assert!(!found.iter().any(|p| p.contains(".hidden") || p.contains(".f.png")));
    }

    #[test]
    fn walk_files_is_recursive_and_skips_hidden() {
        let dir = fixture();
        let fs = LocalFileSystem::new();
        let files = rel(
            dir.path(),
            fs.walk_files(&format!("{}/data", dir.path().display())).unwrap(),
        );
        assert_eq!(
            files,
            vec![
                "data/a.json",
                "data/a.png",
                "data/b.png",
                "data/sub/c.png",
                "data/sub/deep/d.png"
            ]
        );
    }

    #[test]
    fn info_and_create() {
        let dir = tempdir();
        let fs = LocalFileSystem::new();
        let target = format!("{}/x/y/z.bin", dir.path().display());
        let written = fs.create(&target, &mut Cursor::new(b"12345".to_vec())).unwrap();
        assert_eq!(written, 5);
        assert!(fs.is_file(&target));
        let info = fs.info(&target).unwrap();
        assert_eq!(info.size, 5);
        assert!(info.mtime.is_some());
        assert_eq!(fs.read(&target).unwrap(), b"12345");
    }

    struct FailingReader {
        sent: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "source went away"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"PART");
            Ok(4)
        }
    }

    #[test]
    fn failed_create_leaves_nothing_behind() {
        let dir = tempdir();
        let fs = LocalFileSystem::new();
        let target = format!("{}/sub/img.png", dir.path().display());
        assert!(fs.create(&target, &mut FailingReader { sent: false }).is_err());
        assert!(!fs.exists(&target));
        assert!(fs.walk_files(&format!("{}/sub", dir.path().display())).unwrap().is_empty());

        fs.create(&target, &mut Cursor::new(b"old".to_vec())).unwrap();
        assert!(fs.create(&target, &mut FailingReader { sent: false }).is_err());
        assert_eq!(fs.read(&target).unwrap(), b"old");

        fs.remove_file(&target).unwrap();
        assert!(!fs.exists(&target));
        fs.remove_file(&target).unwrap();
    }

    #[test]
    fn copy_within_filesystem() {
        let dir = tempdir();
        let fs = LocalFileSystem::new();
        let from = format!("{}/a.txt", dir.path().display());
        let to = format!("{}/nested/b.txt", dir.path().display());
        fs::write(&from, b"abc").unwrap();
        assert_eq!(fs.copy_file(&from, &to).unwrap(), 3);
        assert_eq!(fs.read(&to).unwrap(), b"abc");
    }

    #[test]
    fn registry_lookup() {
        let fss = FileSystems::default();
        assert_eq!(fss.get("file").unwrap().protocol(), "file");
        assert!(matches!(
            fss.get("s3"),
            Err(StorageError::UnsupportedProtocol(_))
        ));
        assert_eq!(fss.protocols().collect::<Vec<_>>(), vec!["file"]);
    }

    #[test]
    fn glob_base_split() {
        assert_eq!(
            split_glob_base("/a/b/*.png"),
            ("/a/b".to_string(), "*.png".to_string())
        );
        assert_eq!(
            split_glob_base("/a/**/c"),
            ("/a".to_string(), "**/c".to_string())
        );
        assert_eq!(split_glob_base("/*"), ("/".to_string(), "*".to_string()));
    }
}
