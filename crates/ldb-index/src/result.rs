//! Per-item and aggregate indexing results.

use std::fmt;

use ldb_collection::Collection;
use ldb_types::ObjectId;

/// Outcome of indexing one data object (and possibly its annotation).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedObject {
    pub data_object: ObjectId,
    pub annotation: Option<ObjectId>,
    /// A data object meta was read or written. `false` for annotation-only
    /// items, which never touch data object meta.
    pub found_data_object: bool,
    pub found_annotation: bool,
    pub new_data_object: bool,
    pub new_annotation: bool,
    /// The item's location had not been recorded for this data object.
    pub new_data_object_path: bool,
}

/// Running totals for an indexing run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexingResult {
    pub num_found_data_objects: usize,
    pub num_found_annotations: usize,
    pub num_new_data_objects: usize,
    pub num_new_annotations: usize,
    pub num_new_data_object_paths: usize,
    /// Every processed data object in order; repeats are kept.
    pub data_object_hashes: Vec<ObjectId>,
    /// Each processed data object with the annotation it was indexed with.
    /// A later item for the same data object wins.
    pub collection: Collection,
    /// Ephemeral files copied into the read-add location.
    pub num_imported: usize,
    /// Where imported files were copied, if any were.
    pub import_dir: Option<String>,
}

impl IndexingResult {
    pub fn record(&mut self, item: &IndexedObject) {
        self.num_found_data_objects += usize::from(item.found_data_object);
        self.num_found_annotations += usize::from(item.found_annotation);
        self.num_new_data_objects += usize::from(item.new_data_object);
        self.num_new_annotations += usize::from(item.new_annotation);
        self.num_new_data_object_paths += usize::from(item.new_data_object_path);
        self.data_object_hashes.push(item.data_object);
        self.collection.insert(item.data_object, item.annotation);
    }

    /// Human-readable summary, headed according to whether the run finished.
    pub fn summary(&self, finished: bool) -> String {
        let heading = if finished {
            "Finished indexing:"
        } else {
            "Unable to finish indexing. Partial indexing results:"
        };
        format!("{heading}\n{self}")
    }
}

impl fmt::Display for IndexingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Found data objects:    {:9}", self.num_found_data_objects)?;
        writeln!(f, "  Found annotations:     {:9}", self.num_found_annotations)?;
        writeln!(f, "  New data objects:      {:9}", self.num_new_data_objects)?;
        writeln!(f, "  New annotations:       {:9}", self.num_new_annotations)?;
        write!(f, "  New data object paths: {:9}", self.num_new_data_object_paths)
    }
}
