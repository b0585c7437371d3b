use std::path::PathBuf;

use colored::Colorize;
use ldb_sdk::{
    default_instance_dir, CommitOutcome, DiffType, FsOptions, IndexError, IndexingResult, Ldb,
    ObjectId, SdkError, StorageLocation,
};
use ldb_storage::{split_protocol, LOCAL_PROTOCOL};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    if let Command::Init(args) = cli.command {
        return cmd_init(args, cli.ldb_dir);
    }
    let ldb = match cli.ldb_dir {
        Some(dir) => Ldb::open(dir)?,
        None => Ldb::open_default()?,
    };
    match cli.command {
        Command::Init(_) => Ok(()),
        Command::AddStorage(args) => cmd_add_storage(&ldb, args),
        Command::Index(args) => cmd_index(&ldb, args),
        Command::Stage(args) => cmd_stage(&ldb, args),
        Command::Add(args) => cmd_add(&ldb, args),
        Command::Del(args) => cmd_del(&ldb, args),
        Command::Commit(args) => cmd_commit(&ldb, args),
        Command::Diff(args) => cmd_diff(&ldb, args),
        Command::Status(args) => cmd_status(&ldb, args),
        Command::Ds(args) => cmd_ds(&ldb, args),
        Command::Tag(args) => cmd_tag(&ldb, args),
    }
}

fn cmd_init(args: InitArgs, ldb_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = match args.path.or(ldb_dir) {
        Some(dir) => dir,
        None => default_instance_dir()?,
    };
    let ldb = Ldb::init(&dir, args.force)?;
    println!(
        "{} Initialized LDB instance at {}",
        "✓".green().bold(),
        ldb.dir().display().to_string().bold()
    );
    Ok(())
}

fn cmd_add_storage(ldb: &Ldb, args: AddStorageArgs) -> anyhow::Result<()> {
    let options = parse_options(&args.options)?;
    let (protocol, path) = split_protocol(&args.path);
    let location = if protocol == LOCAL_PROTOCOL {
        StorageLocation::local(path, args.read_add, options)?
    } else {
        let mut location = StorageLocation::remote(protocol, path, options);
        location.read_and_add = args.read_add;
        location
    };
    let outcome = ldb.add_storage(location, args.force)?;
    println!("{outcome}");
    Ok(())
}

/// `KEY=VALUE` pairs; values that parse as JSON keep their type.
fn parse_options(pairs: &[String]) -> anyhow::Result<FsOptions> {
    let mut options = FsOptions::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("option must be KEY=VALUE, got {pair:?}"))?;
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        options.insert(key.to_string(), value);
    }
    Ok(options)
}

fn cmd_index(ldb: &Ldb, args: IndexArgs) -> anyhow::Result<()> {
    let mut options = ldb.index_options()?;
    if let Some(format) = &args.format {
        options.format = format.parse()?;
    }
    options.tags = args.tags;
    options.merge_strategy = args.annotation_merge.parse()?;
    options.infer.label_key = args.label_key.split('.').map(str::to_string).collect();
    options.infer.base_label = args.base_label;
    options.path_key = args.path_key;

    match ldb.index(&args.paths, options) {
        Ok(result) => {
            print_index_result(&result, true);
            Ok(())
        }
        Err(SdkError::Index(IndexError::Interrupted { partial, source })) => {
            print_index_result(&partial, false);
            Err((*source).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_index_result(result: &IndexingResult, finished: bool) {
    if let Some(dir) = &result.import_dir {
        println!("Copied {} ephemeral files to {}", result.num_imported, dir.cyan());
    }
    let summary = result.summary(finished);
    if finished {
        println!("{summary}");
    } else {
        println!("{}", summary.yellow());
    }
}

fn cmd_stage(ldb: &Ldb, args: StageArgs) -> anyhow::Result<()> {
    let workspace = ldb.stage(&args.dataset, &args.workspace, args.force)?;
    let dataset = workspace.dataset()?;
    println!(
        "Staged {} at {}",
        args.dataset.yellow().bold(),
        workspace.root().display()
    );
    if dataset.parent.is_none() {
        println!("  New dataset; it is created by the first commit");
    }
    Ok(())
}

fn cmd_add(ldb: &Ldb, args: AddArgs) -> anyhow::Result<()> {
    let summary = ldb.add(&args.workspace, &args.paths, &[])?;
    println!(
        "Added {} data objects to {}",
        summary.num_selected,
        summary.dataset.yellow()
    );
    if summary.num_updated > 0 {
        println!("  New: {}  Updated annotations: {}", summary.num_added, summary.num_updated);
    }
    Ok(())
}

fn cmd_del(ldb: &Ldb, args: DelArgs) -> anyhow::Result<()> {
    let summary = ldb.delete(&args.workspace, &args.paths, &[])?;
    println!(
        "Deleted {} data objects from {}",
        summary.num_deleted,
        summary.dataset.yellow()
    );
    Ok(())
}

fn cmd_commit(ldb: &Ldb, args: CommitArgs) -> anyhow::Result<()> {
    match ldb.commit(&args.workspace, args.message)? {
        CommitOutcome::NothingToCommit => println!("Nothing to commit."),
        CommitOutcome::Committed { identifier, .. } => {
            println!("{} Committed {}", "✓".green().bold(), identifier.yellow().bold())
        }
    }
    Ok(())
}

fn cmd_diff(ldb: &Ldb, args: DiffArgs) -> anyhow::Result<()> {
    let report = ldb.diff(&args.datasets, &args.workspace)?;
    if !args.summary {
        for entry in report.changes() {
            let marker = match entry.diff_type {
                DiffType::Addition => entry.diff_type.marker().green(),
                DiffType::Deletion => entry.diff_type.marker().red(),
                _ => entry.diff_type.marker().yellow(),
            };
            println!(
                "{marker} {}  {}  {} -> {}",
                entry.data_object.to_prefixed().dimmed(),
                entry.path,
                entry.annotation_version1,
                entry.annotation_version2
            );
        }
    }
    println!("{}", report.summary);
    Ok(())
}

fn cmd_status(ldb: &Ldb, args: StatusArgs) -> anyhow::Result<()> {
    let status = ldb.status(args.dataset.as_deref(), &args.workspace)?;
    println!("{status}");
    Ok(())
}

fn cmd_ds(ldb: &Ldb, args: DsArgs) -> anyhow::Result<()> {
    match args.action.unwrap_or(DsAction::List) {
        DsAction::List => {
            for dataset in ldb.datasets()? {
                println!("{}", dataset.latest_identifier());
            }
        }
    }
    Ok(())
}

fn cmd_tag(ldb: &Ldb, args: TagArgs) -> anyhow::Result<()> {
    let ids = args
        .data_objects
        .iter()
        .map(|arg| ObjectId::from_prefixed(arg))
        .collect::<Result<Vec<_>, _>>()?;
    let summary = ldb.tag(&ids, &args.add, &args.remove)?;
    println!("  Data objects: {:8}", summary.num_selected);
    println!("  Num updated:  {:8}", summary.num_updated);
    Ok(())
}
