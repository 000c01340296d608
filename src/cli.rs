//! CLI struct definitions for the scout command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "scout",
    version = env!("CARGO_PKG_VERSION"),
    about = "Scout keeps a local SQLite index of a directory tree and the files in it."
)]
pub(crate) struct Cli {
    /// Store file. Defaults to `.scout.db` in the current directory.
    #[clap(long, global = true)]
    pub repo: Option<PathBuf>,
    /// Output format.
    #[clap(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,
    /// Log debug diagnostics to stderr.
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create a new store tracking TARGET (default: the working directory).
    ///
    /// The store goes to TARGET/.scout.db unless --repo names another file.
    Init {
        target: Option<PathBuf>,
    },
    /// Show the store's root and row counts.
    Status,
    /// Directory hierarchy commands.
    Dir(DirCli),
    /// File metadata commands.
    File(FileCli),
}

#[derive(clap::Args, Debug)]
pub(crate) struct DirCli {
    #[clap(subcommand)]
    pub command: DirCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum DirCommand {
    /// Register directories and all of their parents.
    Add {
        #[clap(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Look up one directory by path or id.
    Get {
        path: Option<PathBuf>,
        #[clap(long)]
        id: Option<i64>,
    },
    /// List the directories above PATH, nearest first.
    Ancestors {
        path: PathBuf,
        #[clap(long)]
        depth: Option<u32>,
    },
    /// List the directories below PATH (the root when omitted), shallowest first.
    Descendants {
        path: Option<PathBuf>,
        #[clap(long)]
        depth: Option<u32>,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct FileCli {
    #[clap(subcommand)]
    pub command: FileCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum FileCommand {
    /// Record a metadata observation for a file.
    Add {
        path: PathBuf,
        /// Parent directory id; overrides the parent taken from PATH.
        #[clap(long)]
        dir_id: Option<i64>,
        #[clap(long)]
        size: Option<u64>,
        /// Modification time in epoch seconds.
        #[clap(long)]
        mtime: Option<i64>,
        /// Hex-encoded SHA-256 of the content.
        #[clap(long)]
        hash: Option<String>,
        /// Fill size, mtime and hash from the file on disk.
        #[clap(long)]
        stat: bool,
        /// Register the parent directories first.
        #[clap(long)]
        parents: bool,
    },
    /// List stored observations matching every --where filter.
    Ls {
        /// Filter as KEY=VALUE, e.g. size__gt=100, content_hash__null=true, path=a/b.txt.
        #[clap(long = "where", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },
}
