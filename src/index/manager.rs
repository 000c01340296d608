use crate::core::connector::Connector;
use crate::core::error::ScoutError;
use crate::core::schemas;
use crate::index::dirs::{self, DirectoryStore};
use crate::index::files::{self, FileRepo};
use rusqlite::OptionalExtension;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Summary of a store, as shown by `scout status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub store: PathBuf,
    pub root: PathBuf,
    pub schema_version: Option<String>,
    pub directories: i64,
    pub files: i64,
}

/// Owns a [`Connector`] with every index table in place.
#[derive(Debug, Clone)]
pub struct ScoutManager {
    db: Connector,
}

impl ScoutManager {
    pub fn open(path: impl AsRef<Path>, root: Option<&Path>) -> Result<Self, ScoutError> {
        Self::from_connector(Connector::open(path, root)?)
    }

    /// Initializes a new store; fails if one already exists at `path`.
    pub fn create(path: impl AsRef<Path>, root: Option<&Path>) -> Result<Self, ScoutError> {
        Self::from_connector(Connector::create(path, root)?)
    }

    pub fn from_connector(db: Connector) -> Result<Self, ScoutError> {
        db.with_tx("index.init", |conn| {
            dirs::ensure_schema(conn)?;
            files::ensure_schema(conn)
        })?;
        Ok(Self { db })
    }

    pub fn connector(&self) -> &Connector {
        &self.db
    }

    pub fn dirs(&self) -> DirectoryStore<'_> {
        DirectoryStore::attach(&self.db)
    }

    pub fn files(&self) -> FileRepo<'_> {
        FileRepo::attach(&self.db)
    }

    pub fn stats(&self) -> Result<IndexStats, ScoutError> {
        self.db.with_conn("index.stats", |conn| {
            let schema_version: Option<String> = conn
                .query_row(
                    "SELECT value FROM fs_meta WHERE property = ?1",
                    [schemas::META_VERSION_PROPERTY],
                    |row| row.get(0),
                )
                .optional()?;
            let directories = conn.query_row("SELECT COUNT(*) FROM dir", [], |row| row.get(0))?;
            let files = conn.query_row("SELECT COUNT(*) FROM file", [], |row| row.get(0))?;
            Ok(IndexStats {
                store: self.db.path().to_path_buf(),
                root: self.db.root().to_path_buf(),
                schema_version,
                directories,
                files,
            })
        })
    }
}
