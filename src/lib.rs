//! Scout: a local, file-backed metadata index of a directory tree.
//!
//! One SQLite file per tracked root records:
//!
//! - the **root** itself, persisted in `fs_meta` so reopening a store never
//!   re-targets it;
//! - the **directory hierarchy**, as a closure table answering ancestor and
//!   descendant queries with a single indexed lookup;
//! - **file observations** (size, mtime, SHA-256 of the content), appended on
//!   every scan and queried with composable filters.
//!
//! Every operation opens its own short-lived connection; nothing is held
//! open between calls.
//!
//! # Examples
//!
//! ```bash
//! scout init ~/photos
//! scout --repo ~/photos/.scout.db dir add ~/photos/2024/june
//! scout --repo ~/photos/.scout.db file add ~/photos/2024/june/a.jpg --stat
//! scout --repo ~/photos/.scout.db file ls --where size__gt=1000000
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: errors, config, logging, path normalization and the store connector
//! - [`index`]: the directory store, the file repository and the [`ScoutManager`] facade

pub mod core;
pub mod index;

mod cli;

pub use crate::core::connector::Connector;
pub use crate::core::error::ScoutError;
pub use crate::core::model::{AncestorEdge, ContentHash, Directory, FileRecord};
pub use crate::core::paths::{NormalizedPath, PathLike};
pub use crate::index::dirs::{DirKey, DirQuery, DirectoryStore, ROOT_DIR_ID};
pub use crate::index::files::{Column, Comparison, FileRepo, Filter, FilterValue};
pub use crate::index::manager::{IndexStats, ScoutManager};

use clap::Parser;
use cli::{Cli, Command, DirCommand, FileCommand, OutputFormat};
use colored::Colorize;
use crate::core::{logging, schemas, time};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub fn run() -> Result<(), ScoutError> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;
    let format = cli.format;

    match cli.command {
        Command::Init { target } => {
            let root = cwd_absolute(target.as_deref().unwrap_or(Path::new(".")))?;
            let store_path = match &cli.repo {
                Some(repo) => repo.clone(),
                None => root.join(schemas::DEFAULT_DB_NAME),
            };
            let manager = ScoutManager::create(&store_path, Some(&root))?;
            let stats = manager.stats()?;
            emit(format, &stats, || {
                println!(
                    "{} {} tracking {}",
                    "Initialized".green().bold(),
                    stats.store.display(),
                    stats.root.display()
                );
            })
        }
        Command::Status => {
            let manager = open_existing(cli.repo.as_deref())?;
            let stats = manager.stats()?;
            emit(format, &stats, || {
                println!("store:       {}", stats.store.display());
                println!("root:        {}", stats.root.display());
                println!(
                    "schema:      {}",
                    stats.schema_version.as_deref().unwrap_or("unknown")
                );
                println!("directories: {}", stats.directories);
                println!("files:       {}", stats.files);
            })
        }
        Command::Dir(dir_cli) => {
            let manager = open_existing(cli.repo.as_deref())?;
            run_dir_command(&manager, dir_cli.command, format)
        }
        Command::File(file_cli) => {
            let manager = open_existing(cli.repo.as_deref())?;
            run_file_command(&manager, file_cli.command, format)
        }
    }
}

fn open_existing(repo: Option<&Path>) -> Result<ScoutManager, ScoutError> {
    let store_path = repo
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(schemas::DEFAULT_DB_NAME));
    if !store_path.exists() {
        return Err(ScoutError::InvalidArgument(format!(
            "no scout store at {}; run `scout init` first",
            store_path.display()
        )));
    }
    ScoutManager::open(&store_path, None)
}

/// Command-line paths are relative to the working directory, not the root.
fn cwd_absolute(path: &Path) -> Result<PathBuf, ScoutError> {
    Ok(std::path::absolute(path)?)
}

fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(),
) -> Result<(), ScoutError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn print_dirs(dirs: &[Directory]) {
    for dir in dirs {
        let id = dir.id.map(|id| id.to_string()).unwrap_or_default();
        println!("{:>6}  {}", id.cyan(), dir.path.display());
    }
}

fn print_files(files: &[FileRecord]) {
    for file in files {
        println!(
            "{:>6}  {:>10}  {:>12}  {}  {}",
            file.id.map(|id| id.to_string()).unwrap_or_default().cyan(),
            file.size.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            file.mtime
                .map(time::format_epoch_z)
                .unwrap_or_else(|| "-".to_string()),
            file.content_hash
                .map(|h| h.to_hex()[..12].to_string())
                .unwrap_or_else(|| "-".to_string())
                .dimmed(),
            file.path.display()
        );
    }
}

fn run_dir_command(
    manager: &ScoutManager,
    command: DirCommand,
    format: OutputFormat,
) -> Result<(), ScoutError> {
    let dirs = manager.dirs();
    match command {
        DirCommand::Add { paths } => {
            let mut added = Vec::new();
            for path in &paths {
                added.extend(dirs.add(&cwd_absolute(path)?)?);
            }
            let mut seen = HashSet::new();
            added.retain(|d| seen.insert(d.id));
            emit(format, &added, || print_dirs(&added))
        }
        DirCommand::Get { path, id } => {
            let query = DirQuery {
                id,
                path: path.as_deref().map(cwd_absolute).transpose()?,
                dir: None,
            };
            let found = dirs.get_one(&query)?.ok_or_else(|| {
                ScoutError::InvalidArgument("no such directory in the index".to_string())
            })?;
            emit(format, &found, || print_dirs(std::slice::from_ref(&found)))
        }
        DirCommand::Ancestors { path, depth } => {
            let found = dirs.ancestors(cwd_absolute(&path)?, depth)?;
            emit(format, &found, || print_dirs(&found))
        }
        DirCommand::Descendants { path, depth } => {
            let key = match path {
                Some(path) => DirKey::Path(cwd_absolute(&path)?),
                None => DirKey::Id(ROOT_DIR_ID),
            };
            let found = dirs.descendants(key, depth)?;
            emit(format, &found, || print_dirs(&found))
        }
    }
}

fn run_file_command(
    manager: &ScoutManager,
    command: FileCommand,
    format: OutputFormat,
) -> Result<(), ScoutError> {
    let files = manager.files();
    match command {
        FileCommand::Add {
            path,
            dir_id,
            size,
            mtime,
            hash,
            stat,
            parents,
        } => {
            let path = cwd_absolute(&path)?;
            let mut record = FileRecord::new(&path);
            record.dir_id = dir_id;
            if stat {
                let meta = fs::metadata(&path)?;
                record.size = Some(meta.len());
                record.mtime = Some(time::epoch_secs(meta.modified()?));
                record.content_hash = Some(ContentHash::from_path(&path)?);
            }
            if size.is_some() {
                record.size = size;
            }
            if mtime.is_some() {
                record.mtime = mtime;
            }
            if let Some(hash) = hash {
                record.content_hash = Some(ContentHash::from_hex(&hash)?);
            }
            if parents && dir_id.is_none() {
                if let Some(parent) = path.parent() {
                    manager.dirs().add(parent)?;
                }
            }
            let stored = files.add_one(&record)?;
            emit(format, &stored, || print_files(std::slice::from_ref(&stored)))
        }
        FileCommand::Ls { filters } => {
            let filters = filters
                .iter()
                .map(|raw| parse_where(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let found = files.get(&filters)?;
            emit(format, &found, || print_files(&found))
        }
    }
}

fn parse_where(raw: &str) -> Result<Filter, ScoutError> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        ScoutError::InvalidArgument(format!("filter '{}' is not KEY=VALUE", raw))
    })?;
    match Filter::parse(key.trim(), value)? {
        Filter::Path(path) => Ok(Filter::Path(cwd_absolute(&path)?)),
        filter => Ok(filter),
    }
}
