use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ldb",
    about = "LDB: content-addressed, versioned metadata for datasets",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Instance directory; defaults to $LDB_DIR, core.ldb_dir in
    /// ~/.ldb/config, then ~/.ldb/private_instance
    #[arg(long, global = true)]
    pub ldb_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new instance
    Init(InitArgs),
    /// Register a storage location
    AddStorage(AddStorageArgs),
    /// Index data objects and annotations
    Index(IndexArgs),
    /// Bind a workspace to a dataset
    Stage(StageArgs),
    /// Add data objects to the workspace
    Add(AddArgs),
    /// Remove data objects from the workspace
    Del(DelArgs),
    /// Save the workspace as a new dataset version
    Commit(CommitArgs),
    /// Compare datasets and the workspace
    Diff(DiffArgs),
    /// Summarize the workspace or a dataset
    Status(StatusArgs),
    /// List datasets
    Ds(DsArgs),
    /// Add or remove data object tags
    Tag(TagArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
    /// Overwrite an existing instance
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AddStorageArgs {
    pub path: String,
    /// Copy ephemeral files into this location when indexing
    #[arg(short = 'a', long)]
    pub read_add: bool,
    /// Replace registered locations inside this one
    #[arg(short, long)]
    pub force: bool,
    /// Filesystem option as KEY=VALUE
    #[arg(short = 'o', long = "option")]
    pub options: Vec<String>,
}

#[derive(Args)]
pub struct IndexArgs {
    #[arg(required = true)]
    pub paths: Vec<String>,
    /// auto, strict, bare, annot, infer or label-studio
    #[arg(short = 'm', long)]
    pub format: Option<String>,
    /// Tag added to every indexed data object
    #[arg(long = "add-tags", value_delimiter = ',')]
    pub tags: Vec<String>,
    /// replace or merge
    #[arg(long, default_value = "replace")]
    pub annotation_merge: String,
    /// Dotted key the inferred label is stored under
    #[arg(long, default_value = "label")]
    pub label_key: String,
    /// Label for files directly inside a root directory
    #[arg(long)]
    pub base_label: Option<String>,
    /// Dotted key of the data object URL in label studio tasks
    #[arg(long)]
    pub path_key: Option<String>,
}

#[derive(Args)]
pub struct StageArgs {
    /// ds:<name> or ds:<name>.v<N>
    pub dataset: String,
    /// Workspace directory
    #[arg(default_value = ".")]
    pub workspace: PathBuf,
    /// Discard uncommitted changes
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Dataset identifiers, 0x data object ids, workspaces or paths
    pub paths: Vec<String>,
    #[arg(short, long, default_value = ".")]
    pub workspace: PathBuf,
}

#[derive(Args)]
pub struct DelArgs {
    /// Everything staged when empty
    pub paths: Vec<String>,
    #[arg(short, long, default_value = ".")]
    pub workspace: PathBuf,
}

#[derive(Args)]
pub struct CommitArgs {
    #[arg(short, long, default_value = "")]
    pub message: String,
    #[arg(short, long, default_value = ".")]
    pub workspace: PathBuf,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Up to two selections to compare
    pub datasets: Vec<String>,
    #[arg(short, long, default_value = ".")]
    pub workspace: PathBuf,
    /// Only print the summary
    #[arg(short, long)]
    pub summary: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    pub dataset: Option<String>,
    #[arg(short, long, default_value = ".")]
    pub workspace: PathBuf,
}

#[derive(Args)]
pub struct DsArgs {
    #[command(subcommand)]
    pub action: Option<DsAction>,
}

#[derive(Subcommand)]
pub enum DsAction {
    /// List datasets with their latest version
    List,
}

#[derive(Args)]
pub struct TagArgs {
    /// 0x data object ids
    #[arg(required = true)]
    pub data_objects: Vec<String>,
    #[arg(short, long = "add", value_delimiter = ',')]
    pub add: Vec<String>,
    #[arg(short, long = "remove", value_delimiter = ',')]
    pub remove: Vec<String>,
}
