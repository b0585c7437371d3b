//! Turning user path arguments into concrete data object and annotation files.
//!
//! Arguments may be files, directories or globs, optionally ending in `/**`
//! (which changes nothing, since directories are always walked). Hidden
//! paths are skipped everywhere.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use ldb_storage::{
    absolute_path, is_hidden, split_extension, split_protocol, strip_recursive_suffix, FileSystem,
    FileSystems, LOCAL_PROTOCOL,
};

use crate::error::{IndexError, IndexResult};

/// A file on a specific filesystem.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FsPath {
    pub protocol: String,
    pub path: String,
}

impl FsPath {
    pub fn new(protocol: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            path: path.into(),
        }
    }

    pub fn local(path: impl Into<String>) -> Self {
        Self::new(LOCAL_PROTOCOL, path)
    }

    pub fn is_local(&self) -> bool {
        self.protocol == LOCAL_PROTOCOL
    }

    pub fn is_annotation(&self) -> bool {
        self.path.ends_with(".json")
    }

    /// The `.json` sibling of this file.
    pub fn annotation_path(&self) -> FsPath {
        let (stem, _) = split_extension(&self.path);
        FsPath::new(&self.protocol, format!("{stem}.json"))
    }

    /// Parse a user argument: `proto://path` or a local path, made absolute.
    pub fn parse(arg: &str) -> IndexResult<FsPath> {
        let (protocol, path) = split_protocol(arg);
        if protocol == LOCAL_PROTOCOL {
            Ok(FsPath::local(absolute_path(path)?))
        } else {
            Ok(FsPath::new(protocol, path.trim_end_matches('/')))
        }
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}://{}", self.protocol, self.path)
        }
    }
}

/// Files found for an indexing run, in discovery order without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Discovered {
    pub data_objects: Vec<FsPath>,
    pub annotations: Vec<FsPath>,
}

impl Discovered {
    pub fn is_empty(&self) -> bool {
        self.data_objects.is_empty() && self.annotations.is_empty()
    }
}

/// Expand path arguments and split the files into data objects and
/// annotations.
///
/// With `pairing`, every matched file also pulls in its counterpart: a
/// data object brings its `.json` sibling and an annotation brings every
/// file sharing its stem.
pub fn discover(fss: &FileSystems, args: &[String], pairing: bool) -> IndexResult<Discovered> {
    let mut seen = HashSet::new();
    let mut out = Discovered::default();
    for arg in args {
        let target = FsPath::parse(arg)?;
        let fs = fss.get(&target.protocol)?;
        for path in expand_single(fs.as_ref(), &target.path, pairing)? {
            let file = FsPath::new(&target.protocol, path);
            if !seen.insert(file.clone()) || !fs.is_file(&file.path) {
                continue;
            }
            if file.is_annotation() {
                out.annotations.push(file);
            } else {
                out.data_objects.push(file);
            }
        }
    }
    Ok(out)
}

/// Files matched by one argument on one filesystem. May contain duplicates.
pub fn expand_single(fs: &dyn FileSystem, path: &str, pairing: bool) -> IndexResult<Vec<String>> {
    if is_hidden(path) {
        return Ok(Vec::new());
    }
    let (path, _) = strip_recursive_suffix(path);

    let mut globs = Vec::new();
    for matched in fs.expand(&path)? {
        if is_hidden(&matched) || !fs.is_file(&matched) {
            continue;
        }
        globs.push(matched.clone());
        if pairing {
            let (stem, ext) = split_extension(&matched);
            if ext == ".json" {
                globs.push(stem.to_string());
                globs.push(format!("{stem}.*"));
            } else {
                globs.push(format!("{stem}.json"));
            }
        }
    }

    let mut files = Vec::new();
    for glob in &globs {
        files.extend(fs.expand(glob)?);
    }
    for matched in fs.expand(&path)? {
        if !is_hidden(&matched) && fs.is_dir(&matched) {
            files.extend(fs.walk_files(&matched)?);
        }
    }
    files.retain(|f| !is_hidden(f));
    Ok(files)
}

/// Directories matched by the arguments, for directory-labelled formats.
///
/// Arguments must match directories, so a trailing `/**` is rejected, and
/// matched directories may not contain one another.
pub fn expand_dirs(
    fss: &FileSystems,
    args: &[String],
    format_name: &str,
) -> IndexResult<Vec<(Arc<dyn FileSystem>, FsPath)>> {
    let mut by_protocol: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for arg in args {
        let (_, stripped) = strip_recursive_suffix(arg);
        if stripped {
            return Err(IndexError::Indexing(format!(
                "Paths passed with the {format_name} format should only match directories, \
                 so globs with a final /** should not be used"
            )));
        }
        let target = FsPath::parse(arg)?;
        if is_hidden(&target.path) {
            continue;
        }
        let fs = fss.get(&target.protocol)?;
        let dirs = by_protocol.entry(target.protocol.clone()).or_default();
        for matched in fs.expand(&target.path)? {
            if !is_hidden(&matched) && fs.is_dir(&matched) && !dirs.contains(&matched) {
                dirs.push(matched);
            }
        }
    }

    let mut out = Vec::new();
    for (protocol, mut dirs) in by_protocol {
        dirs.sort();
        for pair in dirs.windows(2) {
            let parent = format!("{}/", pair[0].trim_end_matches('/'));
            let child = format!("{}/", pair[1].trim_end_matches('/'));
            if child.starts_with(&parent) {
                return Err(IndexError::Indexing(format!(
                    "Paths passed with the {format_name} format should match non-overlapping \
                     directories. Found overlapping directories:\n{:?}\n{:?}",
                    pair[0], pair[1]
                )));
            }
        }
        let fs = fss.get(&protocol)?;
        out.extend(
            dirs.into_iter()
                .map(|dir| (Arc::clone(&fs), FsPath::new(&protocol, dir))),
        );
    }
    Ok(out)
}
