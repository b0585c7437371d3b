//! Persisted layout of an LDB instance.
//!
//! Every function here returns a [`StoreKey`] relative to the instance
//! directory. The directory names are part of the on-disk format.

use ldb_types::ObjectId;

use crate::error::StoreResult;
use crate::key::StoreKey;

pub const DATA_OBJECT_INFO: &str = "data_object_info";
pub const DATASETS: &str = "datasets";
pub const OBJECTS: &str = "objects";
pub const ANNOTATIONS: &str = "annotations";
pub const COLLECTIONS: &str = "collections";
pub const DATASET_VERSIONS: &str = "dataset_versions";

pub const META_FILE: &str = "meta";
pub const CURRENT_FILE: &str = "current";
pub const USER_FILE: &str = "user";
pub const LDB_FILE: &str = "ldb";

/// Directories created by `init`, relative to the instance root.
pub const INSTANCE_DIRS: &[&str] = &[
    DATA_OBJECT_INFO,
    DATASETS,
    OBJECTS,
    "objects/annotations",
    "objects/collections",
    "objects/dataset_versions",
];

fn area(parts: &[&str]) -> StoreKey {
    // Constant segments are always valid.
    StoreKey::parse(&parts.join("/")).unwrap_or_default()
}

/// `data_object_info/`
pub fn data_object_info_root() -> StoreKey {
    area(&[DATA_OBJECT_INFO])
}

/// `data_object_info/<h[:3]>/<h[3:]>`
pub fn data_object_dir(id: &ObjectId) -> StoreKey {
    data_object_info_root().sharded(id)
}

/// `data_object_info/<h[:3]>/<h[3:]>/meta`
pub fn data_object_meta(id: &ObjectId) -> StoreKey {
    file_in(data_object_dir(id), META_FILE)
}

/// `data_object_info/<h[:3]>/<h[3:]>/current`
pub fn current_annotation(id: &ObjectId) -> StoreKey {
    file_in(data_object_dir(id), CURRENT_FILE)
}

/// `data_object_info/<h[:3]>/<h[3:]>/annotations`
pub fn annotation_versions_dir(id: &ObjectId) -> StoreKey {
    file_in(data_object_dir(id), ANNOTATIONS)
}

/// `data_object_info/<h[:3]>/<h[3:]>/annotations/<annotation hash>`
pub fn annotation_version_meta(id: &ObjectId, annotation: &ObjectId) -> StoreKey {
    file_in(annotation_versions_dir(id), &annotation.to_hex())
}

/// `objects/annotations/<h[:3]>/<h[3:]>`
pub fn annotation_dir(annotation: &ObjectId) -> StoreKey {
    area(&[OBJECTS, ANNOTATIONS]).sharded(annotation)
}

/// `objects/annotations/<h[:3]>/<h[3:]>/user`
pub fn annotation_user(annotation: &ObjectId) -> StoreKey {
    file_in(annotation_dir(annotation), USER_FILE)
}

/// `objects/annotations/<h[:3]>/<h[3:]>/ldb`
pub fn annotation_ldb(annotation: &ObjectId) -> StoreKey {
    file_in(annotation_dir(annotation), LDB_FILE)
}

/// `objects/collections/<h[:3]>/<h[3:]>`
pub fn collection(id: &ObjectId) -> StoreKey {
    area(&[OBJECTS, COLLECTIONS]).sharded(id)
}

/// `objects/dataset_versions/<h[:3]>/<h[3:]>`
pub fn dataset_version(id: &ObjectId) -> StoreKey {
    area(&[OBJECTS, DATASET_VERSIONS]).sharded(id)
}

/// `datasets/`
pub fn datasets_root() -> StoreKey {
    area(&[DATASETS])
}

/// `datasets/<name>`
pub fn dataset(name: &str) -> StoreResult<StoreKey> {
    datasets_root().child(name)
}

fn file_in(dir: StoreKey, name: &str) -> StoreKey {
    // Callers only pass constant names and hex digests.
    dir.child(name).unwrap_or(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ObjectId {
        ObjectId::from_hex("abcdef0123456789abcdef0123456789").unwrap()
    }

    #[test]
    fn data_object_paths() {
        assert_eq!(
            data_object_meta(&id()).as_str(),
            "data_object_info/abc/def0123456789abcdef0123456789/meta"
        );
        assert_eq!(
            current_annotation(&id()).as_str(),
            "data_object_info/abc/def0123456789abcdef0123456789/current"
        );
        let annot = ObjectId::from_hex("00000000000000000000000000000001").unwrap();
        assert_eq!(
            annotation_version_meta(&id(), &annot).as_str(),
            "data_object_info/abc/def0123456789abcdef0123456789/annotations/00000000000000000000000000000001"
        );
    }

    #[test]
    fn object_paths() {
        assert_eq!(
            annotation_user(&id()).as_str(),
            "objects/annotations/abc/def0123456789abcdef0123456789/user"
        );
        assert_eq!(
            collection(&id()).as_str(),
            "objects/collections/abc/def0123456789abcdef0123456789"
        );
        assert_eq!(
            dataset_version(&id()).as_str(),
            "objects/dataset_versions/abc/def0123456789abcdef0123456789"
        );
        assert_eq!(dataset("cats").unwrap().as_str(), "datasets/cats");
        assert!(dataset("a/b").is_err());
    }
}
