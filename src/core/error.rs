use rusqlite;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Store path {} must exist inside a valid directory", .0.display())]
    NotInDirectory(PathBuf),
    #[error("Store path {} is occupied by a file that is not a scout store", .0.display())]
    FileOccupied(PathBuf),
    #[error("Root {} must be an existing directory", .0.display())]
    RootNotDirectory(PathBuf),
    #[error("Store {} has no fs_meta table", .0.display())]
    MissingMetadataTable(PathBuf),
    #[error("Store {} has no root property in its fs_meta table", .0.display())]
    MissingRootProperty(PathBuf),
    #[error("Path {} is not supported: relative ancestor (..) and non UTF-8 components are rejected", .0.display())]
    PathNotSupported(PathBuf),
    #[error("Path {} is outside of root {}", .path.display(), .root.display())]
    PathOutsideTarget { path: PathBuf, root: PathBuf },
    #[error("No directory is registered for {0}")]
    MissingParentDirectory(String),
    #[error("Store {} is already an initialized scout repository", .0.display())]
    AlreadyInitialized(PathBuf),
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ScoutError {
    /// Stable name of the error kind, used by the CLI when rendering remediation text.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoutError::RusqliteError(_) => "SqliteError",
            ScoutError::IoError(_) => "IoError",
            ScoutError::JsonError(_) => "JsonError",
            ScoutError::NotInDirectory(_) => "NotInDirectory",
            ScoutError::FileOccupied(_) => "FileOccupied",
            ScoutError::RootNotDirectory(_) => "RootNotDirectory",
            ScoutError::MissingMetadataTable(_) => "MissingMetadataTable",
            ScoutError::MissingRootProperty(_) => "MissingRootProperty",
            ScoutError::PathNotSupported(_) => "PathNotSupported",
            ScoutError::PathOutsideTarget { .. } => "PathOutsideTarget",
            ScoutError::MissingParentDirectory(_) => "MissingParentDirectory",
            ScoutError::AlreadyInitialized(_) => "AlreadyInitialized",
            ScoutError::UnsupportedFilter(_) => "UnsupportedFilter",
            ScoutError::InvalidArgument(_) => "InvalidArgument",
            ScoutError::ConfigError(_) => "ConfigError",
        }
    }
}
