//! Store connector.
//!
//! A [`Connector`] binds one SQLite store file to the directory tree it
//! indexes. It validates or initializes the store on open and hands out
//! short-lived, scoped connections; nothing stays open between operations.

use crate::core::config::StoreConfig;
use crate::core::error::ScoutError;
use crate::core::paths::{self, NormalizedPath, PathLike};
use crate::core::schemas;
use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior, params};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct Connector {
    path: PathBuf,
    root: PathBuf,
    config: StoreConfig,
}

impl Connector {
    /// Opens the store at `path`, creating it when absent.
    ///
    /// A new store tracks `root`, or the directory holding the store file when
    /// `root` is `None`. An existing store always keeps its persisted root.
    pub fn open(path: impl AsRef<Path>, root: Option<&Path>) -> Result<Self, ScoutError> {
        let path = Self::validate_store_path(path.as_ref())?;
        let config = StoreConfig::load(&path)?;
        Self::open_validated(path, root, config)
    }

    pub fn open_with_config(
        path: impl AsRef<Path>,
        root: Option<&Path>,
        config: StoreConfig,
    ) -> Result<Self, ScoutError> {
        let path = Self::validate_store_path(path.as_ref())?;
        Self::open_validated(path, root, config)
    }

    /// Like [`Connector::open`], but refuses to reuse an existing store.
    pub fn create(path: impl AsRef<Path>, root: Option<&Path>) -> Result<Self, ScoutError> {
        let path = Self::validate_store_path(path.as_ref())?;
        if path.exists() {
            if path.is_file() && Self::is_scout_db_file(&path)? {
                return Err(ScoutError::AlreadyInitialized(path));
            }
            return Err(ScoutError::FileOccupied(path));
        }
        let config = StoreConfig::load(&path)?;
        Self::open_validated(path, root, config)
    }

    fn open_validated(
        path: PathBuf,
        root: Option<&Path>,
        config: StoreConfig,
    ) -> Result<Self, ScoutError> {
        if path.exists() {
            if !(path.is_file() && Self::is_scout_db_file(&path)?) {
                return Err(ScoutError::FileOccupied(path));
            }
            let stored_root = Self::read_root(&path)?;
            if let Some(requested) = root {
                let same = requested == stored_root
                    || paths::resolve_existing(requested).as_deref() == Some(stored_root.as_path());
                if !same {
                    warn!(
                        store = %path.display(),
                        requested = %requested.display(),
                        root = %stored_root.display(),
                        "ignoring requested root, store already tracks another root"
                    );
                }
            }
            debug!(store = %path.display(), root = %stored_root.display(), "opened existing store");
            return Ok(Self {
                path,
                root: stored_root,
                config,
            });
        }

        let root = Self::validate_root(&path, root)?;
        let connector = Self {
            path,
            root,
            config,
        };
        connector.init_db()?;
        info!(
            store = %connector.path.display(),
            root = %connector.root.display(),
            "initialized scout store"
        );
        Ok(connector)
    }

    fn validate_store_path(path: &Path) -> Result<PathBuf, ScoutError> {
        let absolute = std::path::absolute(path)
            .map_err(|_| ScoutError::NotInDirectory(path.to_path_buf()))?;
        match absolute.parent() {
            Some(parent) if parent.is_dir() && absolute.file_name().is_some() => Ok(absolute),
            _ => Err(ScoutError::NotInDirectory(absolute)),
        }
    }

    fn validate_root(store_path: &Path, root: Option<&Path>) -> Result<PathBuf, ScoutError> {
        let root = match root {
            Some(root) => std::path::absolute(root)?,
            None => store_path
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| ScoutError::NotInDirectory(store_path.to_path_buf()))?,
        };
        if !root.is_dir() {
            return Err(ScoutError::RootNotDirectory(root));
        }
        Ok(root.canonicalize()?)
    }

    fn init_db(&self) -> Result<(), ScoutError> {
        let root = self
            .root
            .to_str()
            .ok_or_else(|| ScoutError::PathNotSupported(self.root.clone()))?
            .to_string();
        let mut conn = Connection::open(&self.path)?;
        self.apply_pragmas(&conn)?;
        let tx = conn.transaction()?;
        tx.execute(schemas::META_DB_SCHEMA, [])?;
        tx.execute(
            "INSERT INTO fs_meta (property, value) VALUES (?1, ?2)",
            params![schemas::META_ROOT_PROPERTY, root],
        )?;
        tx.execute(
            "INSERT INTO fs_meta (property, value) VALUES (?1, ?2)",
            params![schemas::META_VERSION_PROPERTY, schemas::SCHEMA_VERSION],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Whether `path` starts with the SQLite 3 file header.
    pub fn is_db_file(path: &Path) -> Result<bool, ScoutError> {
        if !path.is_file() {
            return Ok(false);
        }
        let mut header = Vec::with_capacity(schemas::SQLITE_HEADER.len());
        File::open(path)?
            .take(schemas::SQLITE_HEADER.len() as u64)
            .read_to_end(&mut header)?;
        Ok(header == schemas::SQLITE_HEADER)
    }

    /// Whether `path` is a SQLite file carrying scout metadata with a root.
    pub fn is_scout_db_file(path: &Path) -> Result<bool, ScoutError> {
        if !Self::is_db_file(path)? {
            return Ok(false);
        }
        match Self::read_root(path) {
            Ok(_) => Ok(true),
            Err(ScoutError::MissingMetadataTable(_)) | Err(ScoutError::MissingRootProperty(_)) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Reads the persisted root of the store at `path` without modifying it.
    pub fn read_root(path: &Path) -> Result<PathBuf, ScoutError> {
        // Read-only: a foreign file, hot journal included, must stay as it is.
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        if !table_exists_in(&conn, schemas::META_TABLE)? {
            return Err(ScoutError::MissingMetadataTable(path.to_path_buf()));
        }
        let root: Option<String> = conn
            .query_row(
                "SELECT value FROM fs_meta WHERE property = ?1",
                params![schemas::META_ROOT_PROPERTY],
                |row| row.get(0),
            )
            .optional()?;
        root.map(PathBuf::from)
            .ok_or_else(|| ScoutError::MissingRootProperty(path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn apply_pragmas(&self, conn: &Connection) -> Result<(), ScoutError> {
        conn.busy_timeout(self.config.busy_timeout())?;
        // journal_mode returns the resulting mode as a row.
        conn.query_row(
            &format!("PRAGMA journal_mode={};", self.config.journal_mode.as_pragma()),
            [],
            |_| Ok(()),
        )?;
        let fk = if self.config.foreign_keys { "ON" } else { "OFF" };
        conn.execute_batch(&format!("PRAGMA foreign_keys={};", fk))?;
        Ok(())
    }

    /// Opens a fresh read-write connection to the existing store file.
    pub fn connect(&self) -> Result<Connection, ScoutError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        self.apply_pragmas(&conn)?;
        Ok(conn)
    }

    /// Runs `f` on a scoped connection that is closed on return.
    pub fn with_conn<F, R>(&self, op_name: &str, f: F) -> Result<R, ScoutError>
    where
        F: FnOnce(&Connection) -> Result<R, ScoutError>,
    {
        let conn = self.connect()?;
        let result = f(&conn);
        debug!(op = op_name, ok = result.is_ok(), "scoped connection released");
        result
    }

    /// Runs `f` inside a write transaction. Commits on `Ok`, rolls back otherwise.
    pub fn with_tx<F, R>(&self, op_name: &str, f: F) -> Result<R, ScoutError>
    where
        F: FnOnce(&Connection) -> Result<R, ScoutError>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&*tx) {
            Ok(value) => {
                tx.commit()?;
                debug!(op = op_name, "transaction committed");
                Ok(value)
            }
            Err(e) => {
                // Dropping an uncommitted transaction rolls it back.
                drop(tx);
                debug!(op = op_name, error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, ScoutError> {
        self.with_conn("table_exists", |conn| table_exists_in(conn, name))
    }

    /// Applies `f` to `path` and the root. The persisted root is canonical, so
    /// an absolute path reached through a symlink is retried once resolved.
    fn against_root<T>(
        &self,
        path: &Path,
        f: impl Fn(&Path, &Path) -> Result<T, ScoutError>,
    ) -> Result<T, ScoutError> {
        match f(&self.root, path) {
            Err(ScoutError::PathOutsideTarget { path: outside, root }) => {
                match paths::resolve_existing(path) {
                    Some(resolved) if resolved.as_path() != path => {
                        debug!(path = %path.display(), resolved = %resolved.display(), "resolved symlinked path");
                        f(&self.root, &resolved)
                    }
                    _ => Err(ScoutError::PathOutsideTarget { path: outside, root }),
                }
            }
            other => other,
        }
    }

    pub fn normalize_path<'a>(&self, path: impl Into<PathLike<'a>>) -> Result<NormalizedPath, ScoutError> {
        self.against_root(path.into().as_path(), paths::normalize)
    }

    pub fn denormalize_path<'a>(&self, path: impl Into<PathLike<'a>>) -> Result<PathBuf, ScoutError> {
        self.against_root(path.into().as_path(), paths::denormalize)
    }

    pub fn ancestor_paths<'a>(
        &self,
        path: impl Into<PathLike<'a>>,
    ) -> Result<Vec<NormalizedPath>, ScoutError> {
        self.against_root(path.into().as_path(), paths::ancestor_paths)
    }
}

pub(crate) fn table_exists_in(conn: &Connection, name: &str) -> Result<bool, ScoutError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        params![name],
        |row| row.get(0),
    )?;
    Ok(exists)
}
