//! The indexing run: discovery, classification, import and per-item writes.

use std::collections::{HashMap, HashSet};

use ldb_storage::{FileSystem, FileSystems, PathClass, StorageConfig};
use ldb_store::Catalog;
use ldb_types::{current_user, ObjectId, Timestamp};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::annotation_only::parse_records;
use crate::discovery::{discover, expand_dirs, FsPath};
use crate::error::{IndexError, IndexResult};
use crate::format::{Format, MergeStrategy};
use crate::import::import_ephemeral;
use crate::inferred::{infer_annotations, InferOptions};
use crate::item::{file_hash, AnnotationInput, DataObjectSource, ItemContext};
use crate::label_studio::{data_object_url, parse_tasks, tag_task, PathKeyResolver};
use crate::result::IndexingResult;

/// Options for one indexing run.
#[derive(Clone, Debug, Default)]
pub struct IndexOptions {
    pub format: Format,
    /// Tags added to every indexed data object.
    pub tags: Vec<String>,
    pub merge_strategy: MergeStrategy,
    /// Index non-local files outside every storage location in place
    /// instead of rejecting them.
    pub read_any_cloud_location: bool,
    /// Label shaping for [`Format::Infer`].
    pub infer: InferOptions,
    /// Key path of the data object URL for [`Format::LabelStudio`], e.g.
    /// `data.image`. Inferred when unset.
    pub path_key: Option<String>,
}

/// A data object to index and where to read it from.
#[derive(Clone, Debug)]
struct Job {
    /// Where discovery found it.
    source: FsPath,
    /// Where it is indexed from: the source, or its imported copy.
    target: FsPath,
    save_path_info: bool,
}

/// Indexes files into an instance.
pub struct Indexer<'a> {
    catalog: &'a Catalog,
    storage: &'a StorageConfig,
    fss: &'a FileSystems,
    options: IndexOptions,
    user: String,
    hashes: HashMap<FsPath, ObjectId>,
    result: IndexingResult,
}

impl<'a> Indexer<'a> {
    pub fn new(
        catalog: &'a Catalog,
        storage: &'a StorageConfig,
        fss: &'a FileSystems,
        options: IndexOptions,
    ) -> Self {
        Self {
            catalog,
            storage,
            fss,
            options,
            user: current_user(),
            hashes: HashMap::new(),
            result: IndexingResult::default(),
        }
    }

    /// Record `user` as `last_indexed_by` instead of the current OS user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Index everything the path arguments match.
    ///
    /// Fails with [`IndexError::NoFilesFound`] when the paths match nothing.
    /// Any other failure is [`IndexError::Interrupted`], carrying the
    /// results recorded so far. Everything already written stays written,
    /// so re-running over the same paths resumes the work.
    pub fn index(mut self, paths: &[String]) -> IndexResult<IndexingResult> {
        match self.run(paths) {
            Ok(()) => {
                info!(
                    data_objects = self.result.num_found_data_objects,
                    annotations = self.result.num_found_annotations,
                    new_data_objects = self.result.num_new_data_objects,
                    new_annotations = self.result.num_new_annotations,
                    "finished indexing"
                );
                Ok(self.result)
            }
            Err(IndexError::NoFilesFound) => Err(IndexError::NoFilesFound),
            Err(e) => {
                warn!(
                    indexed = self.result.data_object_hashes.len(),
                    error = %e,
                    "indexing interrupted"
                );
                Err(IndexError::Interrupted {
                    partial: Box::new(self.result),
                    source: Box::new(e),
                })
            }
        }
    }

    fn run(&mut self, paths: &[String]) -> IndexResult<()> {
        match self.options.format {
            Format::Infer => self.index_inferred(paths),
            Format::LabelStudio => self.index_label_studio(paths),
            requested => {
                let discovered = discover(self.fss, paths, requested.pairs())?;
                if discovered.is_empty() {
                    return Err(IndexError::NoFilesFound);
                }
                let format = requested.autodetect(
                    discovered.data_objects.len(),
                    discovered.annotations.len(),
                );
                debug!(
                    %format,
                    data_objects = discovered.data_objects.len(),
                    annotations = discovered.annotations.len(),
                    "discovered files"
                );
                match format {
                    Format::Annotation => self.index_annotation_only(&discovered.annotations),
                    _ => {
                        let mut annotations: HashSet<FsPath> =
                            discovered.annotations.into_iter().collect();
                        let strict = format == Format::Strict;
                        let jobs =
                            self.process_files(discovered.data_objects, &mut annotations, strict)?;
                        self.index_pairs(jobs, annotations, strict)
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Classification and import
    // -----------------------------------------------------------------------

    /// Sort data objects into storage files and ephemeral files, import the
    /// ephemeral files not yet known, and return what to index in order:
    /// storage files, imported copies, then already indexed ephemeral files.
    ///
    /// Imported annotation copies are added to `annotations`.
    fn process_files(
        &mut self,
        data_objects: Vec<FsPath>,
        annotations: &mut HashSet<FsPath>,
        strict: bool,
    ) -> IndexResult<Vec<Job>> {
        let mut jobs = Vec::new();
        let mut ephemeral = Vec::new();
        for file in data_objects {
            match self.storage.classify(&file.path, &file.protocol) {
                PathClass::Storage => jobs.push(Job::in_place(file, true)),
                PathClass::Ephemeral => ephemeral.push(file),
                PathClass::Foreign if self.options.read_any_cloud_location => {
                    jobs.push(Job::in_place(file, true))
                }
                PathClass::Foreign => {
                    return Err(IndexError::NotAStorageLocation(file.to_string()))
                }
            }
        }

        let mut indexed = Vec::new();
        let mut to_copy = Vec::new();
        for file in ephemeral {
            let hash = self.hash(&file)?;
            if self.catalog.data_object_exists(&hash)? {
                indexed.push(Job::in_place(file, false));
            } else {
                to_copy.push((file, hash));
            }
        }

        if !to_copy.is_empty() {
            let read_add = self
                .storage
                .read_add_location()
                .ok_or(IndexError::NoReadAddStorage)?;
            let imported = import_ephemeral(self.fss, read_add, &to_copy, annotations, strict)?;
            if let Some(base_dir) = &imported.base_dir {
                info!(
                    dest = %base_dir,
                    data_objects = imported.data_objects.len(),
                    annotations = imported.annotations.len(),
                    "copied ephemeral files to storage"
                );
                self.result.import_dir = Some(base_dir.to_string());
            }
            self.result.num_imported += imported.data_objects.len();
            annotations.extend(imported.annotations.into_iter().map(|(_, new)| new));
            for (old, new) in imported.data_objects {
                if let Some(hash) = self.hashes.get(&old).copied() {
                    self.hashes.insert(new.clone(), hash);
                }
                jobs.push(Job {
                    source: old,
                    target: new,
                    save_path_info: true,
                });
            }
        }
        jobs.extend(indexed);
        Ok(jobs)
    }

    fn hash(&mut self, file: &FsPath) -> IndexResult<ObjectId> {
        if let Some(hash) = self.hashes.get(file) {
            return Ok(*hash);
        }
        let fs = self.fss.get(&file.protocol)?;
        let hash = file_hash(fs.as_ref(), &file.path)?;
        self.hashes.insert(file.clone(), hash);
        Ok(hash)
    }

    // -----------------------------------------------------------------------
    // Formats
    // -----------------------------------------------------------------------

    fn index_pairs(
        &mut self,
        jobs: Vec<Job>,
        mut annotations: HashSet<FsPath>,
        strict: bool,
    ) -> IndexResult<()> {
        for job in jobs {
            let annotation_path = job.target.annotation_path();
            let has_annotation = annotations.remove(&annotation_path);
            if strict && !has_annotation {
                continue;
            }
            let fs = self.fss.get(&job.target.protocol)?;
            let annotation = if has_annotation {
                Some(read_annotation(fs.as_ref(), &annotation_path)?)
            } else {
                None
            };
            self.index_job(&job, fs.as_ref(), annotation)?;
        }
        Ok(())
    }

    fn index_inferred(&mut self, paths: &[String]) -> IndexResult<()> {
        let roots = expand_dirs(self.fss, paths, Format::Infer.name())?;
        let inferred = infer_annotations(&roots, &self.options.infer)?;
        if inferred.is_empty() {
            return Err(IndexError::NoFilesFound);
        }
        let data_objects = inferred.iter().map(|(path, _)| path.clone()).collect();
        let mut labels: HashMap<FsPath, Value> = inferred.into_iter().collect();
        let jobs = self.process_files(data_objects, &mut HashSet::new(), false)?;
        for job in jobs {
            let fs = self.fss.get(&job.target.protocol)?;
            let annotation = labels.remove(&job.source).map(|content| AnnotationInput {
                content,
                mtime: None,
            });
            self.index_job(&job, fs.as_ref(), annotation)?;
        }
        Ok(())
    }

    fn index_label_studio(&mut self, paths: &[String]) -> IndexResult<()> {
        let discovered = discover(self.fss, paths, false)?;
        if discovered.is_empty() {
            return Err(IndexError::NoFilesFound);
        }
        if let Some(file) = discovered.data_objects.first() {
            return Err(IndexError::Indexing(format!(
                "Only JSON files should be passed for the label-studio format. Found: {file}"
            )));
        }

        let mut resolver = PathKeyResolver::new(self.options.path_key.clone());
        let mut tasks = Vec::new();
        for file in &discovered.annotations {
            let fs = self.fss.get(&file.protocol)?;
            let mtime = fs.info(&file.path)?.mtime;
            for task in parse_tasks(read_json(fs.as_ref(), file)?, &file.path)? {
                let path_key = resolver.resolve(&task)?;
                let url = data_object_url(&task, &path_key)?;
                tasks.push((url, path_key, task, mtime));
            }
        }

        let mut seen = HashSet::new();
        let data_objects = tasks
            .iter()
            .filter(|(url, ..)| seen.insert(url.clone()))
            .map(|(url, ..)| url.clone())
            .collect();
        let jobs: HashMap<FsPath, Job> = self
            .process_files(data_objects, &mut HashSet::new(), false)?
            .into_iter()
            .map(|job| (job.source.clone(), job))
            .collect();

        for (url, path_key, mut task, mtime) in tasks {
            let Some(job) = jobs.get(&url) else {
                continue;
            };
            let hash = self.hash(&job.target)?;
            tag_task(&mut task, &hash, &path_key)?;
            let fs = self.fss.get(&job.target.protocol)?;
            self.index_job(
                job,
                fs.as_ref(),
                Some(AnnotationInput {
                    content: task,
                    mtime,
                }),
            )?;
        }
        Ok(())
    }

    fn index_annotation_only(&mut self, files: &[FsPath]) -> IndexResult<()> {
        for file in files {
            let fs = self.fss.get(&file.protocol)?;
            let mtime = fs.info(&file.path)?.mtime;
            for record in parse_records(read_json(fs.as_ref(), file)?, &file.path)? {
                if !self.catalog.data_object_exists(&record.data_object)? {
                    return Err(IndexError::DataObjectNotFound {
                        id: record.data_object,
                        path: Some(file.to_string()),
                    });
                }
                let item = self.item_context().index_item(
                    record.data_object,
                    DataObjectSource::Existing,
                    Some(AnnotationInput {
                        content: record.annotation,
                        mtime,
                    }),
                )?;
                self.result.record(&item);
            }
        }
        Ok(())
    }

    fn index_job(
        &mut self,
        job: &Job,
        fs: &dyn FileSystem,
        annotation: Option<AnnotationInput>,
    ) -> IndexResult<()> {
        let hash = self.hash(&job.target)?;
        let item = self.item_context().index_item(
            hash,
            DataObjectSource::File {
                fs,
                path: &job.target.path,
                save_path_info: job.save_path_info,
            },
            annotation,
        )?;
        self.result.record(&item);
        Ok(())
    }

    fn item_context(&self) -> ItemContext<'_> {
        ItemContext {
            catalog: self.catalog,
            user: &self.user,
            tags: &self.options.tags,
            merge: self.options.merge_strategy,
        }
    }
}

impl Job {
    fn in_place(file: FsPath, save_path_info: bool) -> Self {
        Self {
            source: file.clone(),
            target: file,
            save_path_info,
        }
    }
}

fn read_json(fs: &dyn FileSystem, file: &FsPath) -> IndexResult<Value> {
    let bytes = fs.read(&file.path)?;
    serde_json::from_slice(&bytes).map_err(|source| IndexError::Json {
        path: file.to_string(),
        source,
    })
}

fn read_annotation(fs: &dyn FileSystem, file: &FsPath) -> IndexResult<AnnotationInput> {
    let content = read_json(fs, file)?;
    let mtime: Option<Timestamp> = fs.info(&file.path)?.mtime;
    Ok(AnnotationInput { content, mtime })
}
