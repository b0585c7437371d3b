//! Copying ephemeral files into the read-add storage location.
//!
//! Each run copies into its own directory,
//! `<read-add>/ldb-autoimport/<date>/<unique id>/<protocol>/<original path>`,
//! so concurrent imports into the same location never collide.

use std::collections::HashSet;
use std::sync::Arc;

use ldb_storage::{split_extension, FileSystem, FileSystems, StorageError, StorageLocation};
use ldb_types::{ObjectId, Timestamp};
use tracing::{debug, warn};

use crate::discovery::FsPath;
use crate::error::IndexResult;

/// Name of the directory imports are placed under.
pub const AUTOIMPORT_DIR: &str = "ldb-autoimport";

/// Old and new locations of everything an import copied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Imported {
    /// Run directory the files were copied under.
    pub base_dir: Option<FsPath>,
    /// `(ephemeral source, copy)` for data objects, in input order.
    pub data_objects: Vec<(FsPath, FsPath)>,
    /// `(ephemeral source, copy)` for annotations.
    pub annotations: Vec<(FsPath, FsPath)>,
}

/// Copy ephemeral data objects, and the `.json` siblings among
/// `annotations`, into the read-add location.
///
/// Under `strict`, objects without an annotation are not copied. When a
/// copy cannot be written at its path-preserving destination (usually a
/// path too long for the destination), the object is copied to
/// `<run dir>/<hash><suffix>` instead.
pub fn import_ephemeral(
    fss: &FileSystems,
    read_add: &StorageLocation,
    files: &[(FsPath, ObjectId)],
    annotations: &HashSet<FsPath>,
    strict: bool,
) -> IndexResult<Imported> {
    let dest_fs = fss.get(&read_add.protocol)?;
    let base_dir = format!(
        "{}/{}/{}/{}",
        read_add.path.trim_end_matches('/'),
        AUTOIMPORT_DIR,
        Timestamp::now().date_string(),
        unique_id()
    );
    let mut imported = Imported {
        base_dir: Some(FsPath::new(&read_add.protocol, &base_dir)),
        ..Imported::default()
    };

    for (source, hash) in files {
        let source_fs = fss.get(&source.protocol)?;
        let annotation = Some(source.annotation_path()).filter(|a| annotations.contains(a));
        if strict && annotation.is_none() {
            continue;
        }

        let preserved = format!(
            "{base_dir}/{}/{}",
            source.protocol,
            source.path.trim_start_matches('/')
        );
        let (dest, annotation_dest) = match copy_pair(
            &source_fs,
            source,
            annotation.as_ref(),
            &dest_fs,
            &preserved,
        ) {
            Ok(annotation_dest) => (preserved, annotation_dest),
            Err(CopyError::Source(e)) => return Err(e.into()),
            Err(CopyError::Destination(e)) => {
                let (_, suffix) = split_extension(&source.path);
                let fallback = format!("{base_dir}/{}{suffix}", hash.to_hex());
                warn!(
                    source = %source,
                    error = %e,
                    fallback = %fallback,
                    "could not copy to path-preserving destination, naming copy by hash"
                );
                match copy_pair(&source_fs, source, annotation.as_ref(), &dest_fs, &fallback) {
                    Ok(annotation_dest) => (fallback, annotation_dest),
                    Err(CopyError::Source(e) | CopyError::Destination(e)) => return Err(e.into()),
                }
            }
        };
        debug!(source = %source, dest = %dest, "imported ephemeral data object");

        let dest = FsPath::new(&read_add.protocol, dest);
        if let (Some(old), Some(new)) = (annotation, annotation_dest) {
            imported
                .annotations
                .push((old, FsPath::new(&read_add.protocol, new)));
        }
        imported.data_objects.push((source.clone(), dest));
    }
    Ok(imported)
}

enum CopyError {
    Source(StorageError),
    Destination(StorageError),
}

/// Copy the annotation (first) and the data object to `dest`, returning the
/// annotation's destination. If the data object cannot be copied, the
/// annotation copy is removed again.
fn copy_pair(
    source_fs: &Arc<dyn FileSystem>,
    source: &FsPath,
    annotation: Option<&FsPath>,
    dest_fs: &Arc<dyn FileSystem>,
    dest: &str,
) -> Result<Option<String>, CopyError> {
    let annotation_dest = match annotation {
        Some(annotation) => {
            let annotation_dest = format!("{}.json", split_extension(dest).0);
            copy_file(source_fs, &annotation.path, dest_fs, &annotation_dest)?;
            Some(annotation_dest)
        }
        None => None,
    };
    if let Err(e) = copy_file(source_fs, &source.path, dest_fs, dest) {
        if let Some(orphan) = &annotation_dest {
            if let Err(cleanup) = dest_fs.remove_file(orphan) {
                warn!(path = %orphan, error = %cleanup, "could not remove partial annotation copy");
            }
        }
        return Err(e);
    }
    Ok(annotation_dest)
}

fn copy_file(
    source_fs: &Arc<dyn FileSystem>,
    from: &str,
    dest_fs: &Arc<dyn FileSystem>,
    to: &str,
) -> Result<u64, CopyError> {
    let mut reader = source_fs.open(from).map_err(CopyError::Source)?;
    dest_fs.create(to, &mut reader).map_err(CopyError::Destination)
}

fn unique_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use std::path::Path;

    use ldb_storage::{FileInfo, LocalFileSystem, StorageResult};

    fn tempdir() -> tempfile::TempDir {
        tempfile::Builder::new().prefix("ldb-import").tempdir().unwrap()
    }

    fn write(root: &Path, rel: &str, content: &str) -> FsPath {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        FsPath::local(path.to_string_lossy().into_owned())
    }

    fn read_add(dir: &Path) -> StorageLocation {
        StorageLocation {
            path: dir.to_string_lossy().into_owned(),
            read_and_add: true,
            ..StorageLocation::default()
        }
    }

    fn id(n: u8) -> ObjectId {
        ObjectId::from([n; 16])
    }

    #[test]
    fn copies_preserve_paths_and_pair_annotations() {
        let src = tempdir();
        let storage = tempdir();
        let a = write(src.path(), "x/a.png", "a");
        let a_json = write(src.path(), "x/a.json", "{}");
        let b = write(src.path(), "x/b.png", "b");
        let annotations: HashSet<FsPath> = [a_json.clone()].into_iter().collect();

        let imported = import_ephemeral(
            &FileSystems::local(),
            &read_add(storage.path()),
            &[(a.clone(), id(1)), (b.clone(), id(2))],
            &annotations,
            false,
        )
        .unwrap();

        let base = imported.base_dir.clone().unwrap().path;
        assert!(base.starts_with(&format!("{}/ldb-autoimport/", storage.path().display())));
        assert_eq!(imported.data_objects.len(), 2);
        let (old, new) = &imported.data_objects[0];
        assert_eq!(old, &a);
        assert_eq!(new.path, format!("{base}/file{}", a.path));
        assert_eq!(fs::read_to_string(&new.path).unwrap(), "a");
        assert_eq!(imported.annotations, vec![(a_json, new.annotation_path())]);
        assert_eq!(fs::read_to_string(new.annotation_path().path).unwrap(), "{}");
    }

    #[test]
    fn strict_skips_unpaired() {
        let src = tempdir();
        let storage = tempdir();
        let b = write(src.path(), "b.png", "b");
        let imported = import_ephemeral(
            &FileSystems::local(),
            &read_add(storage.path()),
            &[(b, id(2))],
            &HashSet::new(),
            true,
        )
        .unwrap();
        assert!(imported.data_objects.is_empty());
    }

    /// Local disk that refuses to create the paths `reject` matches.
    struct Picky {
        inner: LocalFileSystem,
        reject: Box<dyn Fn(&str) -> bool + Send + Sync>,
    }

    impl FileSystem for Picky {
        fn protocol(&self) -> &str {
            self.inner.protocol()
        }
        fn expand(&self, pattern: &str) -> StorageResult<Vec<String>> {
            self.inner.expand(pattern)
        }
        fn walk_files(&self, dir: &str) -> StorageResult<Vec<String>> {
            self.inner.walk_files(dir)
        }
        fn exists(&self, path: &str) -> bool {
            self.inner.exists(path)
        }
        fn is_dir(&self, path: &str) -> bool {
            self.inner.is_dir(path)
        }
        fn is_file(&self, path: &str) -> bool {
            self.inner.is_file(path)
        }
        fn open(&self, path: &str) -> StorageResult<Box<dyn Read + Send>> {
            self.inner.open(path)
        }
        fn info(&self, path: &str) -> StorageResult<FileInfo> {
            self.inner.info(path)
        }
        fn create(&self, path: &str, reader: &mut dyn Read) -> StorageResult<u64> {
            if (self.reject)(path) {
                return Err(StorageError::InvalidPath(path.to_string()));
            }
            self.inner.create(path, reader)
        }
        fn remove_file(&self, path: &str) -> StorageResult<()> {
            self.inner.remove_file(path)
        }
    }

    fn picky(reject: impl Fn(&str) -> bool + Send + Sync + 'static) -> FileSystems {
        let mut fss = FileSystems::local();
        fss.register(Arc::new(Picky {
            inner: LocalFileSystem::new(),
            reject: Box::new(reject),
        }));
        fss
    }

    #[test]
    fn too_long_destination_falls_back_to_hash_name() {
        let src = tempdir();
        let storage = tempdir();
        let deep = write(src.path(), &format!("{}/img.tar.gz", "d".repeat(120)), "x");
        let deep_json = write(src.path(), &format!("{}/img.tar.json", "d".repeat(120)), "1");

        let limit = storage.path().to_string_lossy().len() + 120;
        let fss = picky(move |path| path.len() > limit);
        let annotations: HashSet<FsPath> = [deep_json.clone()].into_iter().collect();
        let imported = import_ephemeral(
            &fss,
            &read_add(storage.path()),
            &[(deep, id(7))],
            &annotations,
            false,
        )
        .unwrap();

        let base = imported.base_dir.unwrap().path;
        let (_, new) = &imported.data_objects[0];
        assert_eq!(new.path, format!("{base}/{}.gz", id(7).to_hex()));
        assert_eq!(fs::read_to_string(&new.path).unwrap(), "x");
        assert_eq!(
            imported.annotations[0].1.path,
            format!("{base}/{}.json", id(7).to_hex())
        );
    }

    #[test]
    fn failed_data_object_copy_drops_its_annotation() {
        let src = tempdir();
        let storage = tempdir();
        let img = write(src.path(), "x/img.png", "x");
        let img_json = write(src.path(), "x/img.json", "{}");

        // Only the data object's path-preserving copy fails.
        let fss = picky(|path| path.contains("/file/") && path.ends_with(".png"));
        let annotations: HashSet<FsPath> = [img_json].into_iter().collect();
        let imported = import_ephemeral(
            &fss,
            &read_add(storage.path()),
            &[(img.clone(), id(3))],
            &annotations,
            false,
        )
        .unwrap();

        let base = imported.base_dir.unwrap().path;
        let preserved_json = format!("{base}/file{}", img.annotation_path().path);
        assert!(!Path::new(&preserved_json).exists());
        assert_eq!(imported.data_objects[0].1.path, format!("{base}/{}.png", id(3).to_hex()));
        assert_eq!(
            imported.annotations[0].1.path,
            format!("{base}/{}.json", id(3).to_hex())
        );
        let left: Vec<String> = LocalFileSystem::new()
            .walk_files(&base)
            .unwrap()
            .into_iter()
            .filter(|p| p.ends_with(".json"))
            .collect();
        assert_eq!(left, vec![format!("{base}/{}.json", id(3).to_hex())]);
    }

    #[test]
    fn missing_source_is_an_error() {
        let storage = tempdir();
        let missing = FsPath::local("/definitely/not/here.png");
        let result = import_ephemeral(
            &FileSystems::local(),
            &read_add(storage.path()),
            &[(missing, id(1))],
            &HashSet::new(),
            false,
        );
        assert!(result.is_err());
    }
}
