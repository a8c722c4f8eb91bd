use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use casedesk_fs::{CaseDeletion, FolderLifecycleManager, Migration, StageRemoval};
use casedesk_model::{CaseRecord, CasedeskConfig};
use casedesk_sheet::SpreadsheetAnalyzer;
use casedesk_storage::{import_workbook, CaseRecordStore, FolderSync, JsonRecordStore};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::Serialize;

/// Config file read from the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "casedesk.json";
/// Record store file inside the data directory.
const RECORDS_FILE: &str = "records.json";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "casedesk", about = "Import case spreadsheets and manage case folders.")]
pub struct Args {
    /// JSON config file (default: ./casedesk.json if present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Data directory holding case folders and records.json. Overrides `folders.base_dir`.
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect header rows, columns and case types without importing anything.
    Analyze {
        workbook: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Import every processable sheet into the record store and create case folders.
    Import {
        workbook: PathBuf,
        /// Only store records; do not create folders.
        #[arg(long)]
        no_folders: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Case folder operations, addressed by case id.
    #[command(subcommand)]
    Folder(FolderCommand),
}

#[derive(Subcommand, Debug)]
enum FolderCommand {
    /// Create the case folder and its stage folders.
    Create(CaseArg),
    /// Print the folder path of a case, if it exists.
    Resolve(CaseArg),
    /// Change a case id; the folder follows.
    Rename {
        case_id: String,
        new_case_id: String,
    },
    /// Record a progress stage and create its folder.
    StageAdd {
        case_id: String,
        stage: String,
        /// Stage date, `YYYY-MM-DD`.
        #[arg(long)]
        date: String,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        time: Option<String>,
    },
    /// Remove a progress stage and its folder.
    StageRemove { case_id: String, stage: String },
    /// Delete a case record and its folder. Without `--yes` only shows what would be removed.
    Delete {
        case_id: String,
        #[arg(long)]
        yes: bool,
    },
    /// Show file count and size of a case folder.
    Usage(CaseArg),
    /// Move a legacy-named folder to its canonical name.
    Migrate(CaseArg),
}

#[derive(ClapArgs, Debug)]
struct CaseArg {
    case_id: String,
}

pub fn run() -> Result<()> {
    run_with_args(Args::parse())
}

pub fn run_with_args(args: Args) -> Result<()> {
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => CasedeskConfig::load(path)?,
        None => CasedeskConfig::load_or_default(DEFAULT_CONFIG_FILE)?,
    };
    if let Some(data_dir) = &args.data_dir {
        config.folders.base_dir = data_dir.clone();
    }
    log::debug!("data directory: {}", config.folders.base_dir.display());

    match args.command {
        Command::Analyze { workbook, format } => analyze(&config, &workbook, format),
        Command::Import {
            workbook,
            no_folders,
            format,
        } => import(&config, &workbook, no_folders, format),
        Command::Folder(command) => folder(&config, command),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // A second init (tests calling `run_with_args` repeatedly) is harmless.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}

fn analyze(config: &CasedeskConfig, workbook: &Path, format: OutputFormat) -> Result<()> {
    let analyzer = SpreadsheetAnalyzer::from_config(config)?;
    let (_, analysis) = analyzer
        .analyze_path(workbook)
        .with_context(|| format!("analyze {}", workbook.display()))?;
    match format {
        OutputFormat::Text => print_line(&analysis.report),
        OutputFormat::Json => print_json(&analysis),
    }
}

fn import(
    config: &CasedeskConfig,
    workbook: &Path,
    no_folders: bool,
    format: OutputFormat,
) -> Result<()> {
    let analyzer = SpreadsheetAnalyzer::from_config(config)?;
    let mut store = open_store(config)?;
    let sync = FolderSync::new(FolderLifecycleManager::new(config.folders.clone()));
    let summary = import_workbook(
        &analyzer,
        workbook,
        &mut store,
        (!no_folders).then_some(&sync),
    )
    .with_context(|| format!("import {}", workbook.display()))?;
    log::info!(
        "imported {} record(s) from {}",
        summary.records_imported,
        workbook.display()
    );
    match format {
        OutputFormat::Text => print_line(&format!("Imported {}: {summary}", workbook.display())),
        OutputFormat::Json => print_json(&summary),
    }
}

fn folder(config: &CasedeskConfig, command: FolderCommand) -> Result<()> {
    let manager = FolderLifecycleManager::new(config.folders.clone());
    let sync = FolderSync::new(manager.clone());
    let mut store = open_store(config)?;
    store.subscribe(Arc::new(sync.clone()));

    match command {
        FolderCommand::Create(CaseArg { case_id }) => {
            let record = find_record(&store, &case_id)?;
            let folder = sync
                .sync_record(&record)
                .with_context(|| format!("create folder for case {case_id}"))?;
            let verb = if folder.created { "Created" } else { "Exists" };
            print_line(&format!("{verb}: {}", folder.path.display()))
        }
        FolderCommand::Resolve(CaseArg { case_id }) => {
            let record = find_record(&store, &case_id)?;
            match manager.resolver().resolve(&record)? {
                Some(found) if found.verified => print_line(&format!(
                    "{} ({:?})",
                    found.path.display(),
                    found.match_kind
                )),
                Some(found) => print_line(&format!(
                    "{} ({:?}, client name only; not used until it carries the case id)",
                    found.path.display(),
                    found.match_kind
                )),
                None => print_line(&format!(
                    "No folder yet; it would be created at {}",
                    manager.resolver().derive(&record)?.display()
                )),
            }
        }
        FolderCommand::Rename {
            case_id,
            new_case_id,
        } => {
            let record = store
                .change_case_id(&case_id, &new_case_id)
                .with_context(|| format!("change case id {case_id} -> {new_case_id}"))?;
            log::info!("case {case_id} renamed to {}", record.case_id);
            print_line(&format!("Case {case_id} is now {}", record.case_id))
        }
        FolderCommand::StageAdd {
            case_id,
            stage,
            date,
            note,
            time,
        } => {
            let mut record = find_record(&store, &case_id)?;
            record.set_stage(&stage, &date, note.as_deref(), time.as_deref())?;
            let path = manager
                .ensure_stage_folder(&record, &stage)
                .with_context(|| format!("create stage folder `{stage}` for case {case_id}"))?;
            store.update(record)?;
            print_line(&format!("Stage folder: {}", path.display()))
        }
        FolderCommand::StageRemove { case_id, stage } => {
            let mut record = find_record(&store, &case_id)?;
            let recorded = record.remove_stage(&stage);
            let removal = manager
                .delete_stage_folder(&record, &stage)
                .with_context(|| format!("delete stage folder `{stage}` for case {case_id}"))?;
            if recorded {
                store.update(record)?;
            }
            match removal {
                StageRemoval::NothingToDelete => print_line("Nothing to delete"),
                StageRemoval::Removed { path, usage } => print_line(&format!(
                    "Removed {} ({} file(s), {} byte(s))",
                    path.display(),
                    usage.file_count,
                    usage.total_bytes
                )),
            }
        }
        FolderCommand::Delete { case_id, yes } => {
            let record = find_record(&store, &case_id)?;
            if !yes {
                return match manager.delete_case(&record, false)? {
                    CaseDeletion::NeedsConfirmation { path, usage } => print_line(&format!(
                        "Would delete {} ({} file(s), {} byte(s)) and the record of case {case_id}; rerun with --yes",
                        path.display(),
                        usage.file_count,
                        usage.total_bytes
                    )),
                    _ => print_line(&format!(
                        "Case {case_id} has no folder; rerun with --yes to delete the record"
                    )),
                };
            }
            store
                .delete(&case_id)
                .with_context(|| format!("delete case {case_id}"))?;
            log::info!("deleted case {case_id}");
            print_line(&format!("Deleted case {case_id}"))
        }
        FolderCommand::Usage(CaseArg { case_id }) => {
            let record = find_record(&store, &case_id)?;
            match manager.usage(&record)? {
                Some((found, usage)) => print_line(&format!(
                    "{}: {} file(s), {} folder(s), {} byte(s), {:?}",
                    found.path.display(),
                    usage.file_count,
                    usage.dir_count,
                    usage.total_bytes,
                    manager.state(&record)?
                )),
                None => print_line(&format!("Case {case_id} has no folder")),
            }
        }
        FolderCommand::Migrate(CaseArg { case_id }) => {
            let record = find_record(&store, &case_id)?;
            match manager.migrate(&record)? {
                Migration::NotFound => print_line(&format!("Case {case_id} has no folder")),
                Migration::AlreadyCurrent { path } => {
                    print_line(&format!("Already current: {}", path.display()))
                }
                Migration::Moved { from, to } => {
                    print_line(&format!("Moved {} -> {}", from.display(), to.display()))
                }
            }
        }
    }
}

fn open_store(config: &CasedeskConfig) -> Result<JsonRecordStore> {
    let path = config.folders.base_dir.join(RECORDS_FILE);
    JsonRecordStore::open(&path).with_context(|| format!("open record store {}", path.display()))
}

fn find_record(store: &JsonRecordStore, case_id: &str) -> Result<CaseRecord> {
    store
        .get_record(case_id)
        .cloned()
        .with_context(|| format!("no case with id {case_id}"))
}

fn print_line(text: &str) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{text}")?;
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    handle.write_all(b"\n")?;
    Ok(())
}
