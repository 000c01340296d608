//! Directory hierarchy store.
//!
//! Directories live in the `dir` arena; `dir_ancestor` is a closure table
//! holding one row per (directory, strict ancestor) pair plus a depth-0 row
//! per directory. The tracked root is not a row: it is addressed by
//! [`ROOT_DIR_ID`] or the empty path and is the implicit ancestor of every
//! top-level directory.

use crate::core::connector::Connector;
use crate::core::error::ScoutError;
use crate::core::model::{AncestorEdge, Directory};
use crate::core::paths::{NormalizedPath, PathLike};
use crate::core::schemas;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Id of the tracked root. No `dir` row carries it.
pub const ROOT_DIR_ID: i64 = 0;

/// Depth bound used when the caller asks for an unbounded walk.
const UNBOUNDED_DEPTH: i64 = i32::MAX as i64;

/// Identifies one directory, by id or by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirKey {
    Id(i64),
    Path(PathBuf),
}

impl From<i64> for DirKey {
    fn from(id: i64) -> Self {
        DirKey::Id(id)
    }
}

impl From<&str> for DirKey {
    fn from(path: &str) -> Self {
        DirKey::Path(PathBuf::from(path))
    }
}

impl From<&Path> for DirKey {
    fn from(path: &Path) -> Self {
        DirKey::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for DirKey {
    fn from(path: PathBuf) -> Self {
        DirKey::Path(path)
    }
}

impl From<&PathBuf> for DirKey {
    fn from(path: &PathBuf) -> Self {
        DirKey::Path(path.clone())
    }
}

impl From<&NormalizedPath> for DirKey {
    fn from(path: &NormalizedPath) -> Self {
        DirKey::Path(path.to_path_buf())
    }
}

/// A stored directory is addressed by its id, an unsaved one by its path.
impl From<&Directory> for DirKey {
    fn from(dir: &Directory) -> Self {
        match dir.id {
            Some(id) => DirKey::Id(id),
            None => DirKey::Path(dir.path.clone()),
        }
    }
}

/// Lookup arguments for [`DirectoryStore::get_one`]. When several are set,
/// `id` wins over `path`, and `path` wins over `dir`.
#[derive(Debug, Clone, Default)]
pub struct DirQuery {
    pub id: Option<i64>,
    pub path: Option<PathBuf>,
    pub dir: Option<Directory>,
}

impl DirQuery {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn by_dir(dir: Directory) -> Self {
        Self {
            dir: Some(dir),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_dir(mut self, dir: Directory) -> Self {
        self.dir = Some(dir);
        self
    }

    pub fn key(&self) -> Result<DirKey, ScoutError> {
        if let Some(id) = self.id {
            return Ok(DirKey::Id(id));
        }
        if let Some(path) = &self.path {
            return Ok(DirKey::Path(path.clone()));
        }
        if let Some(dir) = &self.dir {
            return Ok(DirKey::from(dir));
        }
        Err(ScoutError::InvalidArgument(
            "directory lookup needs an id, a path or a directory".to_string(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Ancestors,
    Descendants,
}

pub(crate) fn ensure_schema(conn: &Connection) -> Result<(), ScoutError> {
    conn.execute(schemas::DIR_DB_SCHEMA, [])?;
    conn.execute(schemas::DIR_ANCESTOR_DB_SCHEMA, [])?;
    conn.execute(schemas::DIR_ANCESTOR_DB_SCHEMA_INDEX, [])?;
    Ok(())
}

/// Closure rows for a root-first chain of ids: `(ids[i], ids[j], i - j)` for every `j <= i`.
pub fn closure_edges(ids: &[i64]) -> Vec<AncestorEdge> {
    let mut edges = Vec::with_capacity(ids.len() * (ids.len() + 1) / 2);
    for (i, &dir_id) in ids.iter().enumerate() {
        for j in (0..=i).rev() {
            edges.push(AncestorEdge {
                dir_id,
                ancestor_id: ids[j],
                depth: (i - j) as i64,
            });
        }
    }
    edges
}

fn insert_directory_row(conn: &Connection, path: &NormalizedPath) -> Result<i64, ScoutError> {
    if path.is_root() {
        return Ok(ROOT_DIR_ID);
    }
    conn.execute(
        "INSERT INTO dir (path) VALUES (?1) ON CONFLICT(path) DO NOTHING",
        params![path.as_str()],
    )?;
    let id = conn.query_row(
        "SELECT id FROM dir WHERE path = ?1",
        params![path.as_str()],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn insert_edge_rows(conn: &Connection, edges: &[AncestorEdge]) -> Result<usize, ScoutError> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO dir_ancestor (dir_id, ancestor_id, depth) VALUES (?1, ?2, ?3)
         ON CONFLICT(dir_id, ancestor_id) DO NOTHING",
    )?;
    let mut inserted = 0;
    for edge in edges {
        inserted += stmt.execute(params![edge.dir_id, edge.ancestor_id, edge.depth])?;
    }
    Ok(inserted)
}

pub(crate) fn select_dir_id(
    conn: &Connection,
    path: &NormalizedPath,
) -> Result<Option<i64>, ScoutError> {
    if path.is_root() {
        return Ok(Some(ROOT_DIR_ID));
    }
    Ok(conn
        .query_row(
            "SELECT id FROM dir WHERE path = ?1",
            params![path.as_str()],
            |row| row.get(0),
        )
        .optional()?)
}

pub(crate) fn select_dir_path(
    conn: &Connection,
    id: i64,
) -> Result<Option<NormalizedPath>, ScoutError> {
    if id == ROOT_DIR_ID {
        return Ok(Some(NormalizedPath::root()));
    }
    let path: Option<String> = conn
        .query_row("SELECT path FROM dir WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(path.map(NormalizedPath::from_stored))
}

fn depth_bound(max_depth: Option<u32>) -> i64 {
    max_depth.map(i64::from).unwrap_or(UNBOUNDED_DEPTH)
}

/// Related directories of `id`, nearest first, ties broken by id.
fn related_rows(
    conn: &Connection,
    id: i64,
    direction: Direction,
    max_depth: i64,
) -> Result<Vec<(i64, NormalizedPath)>, ScoutError> {
    if direction == Direction::Ancestors && id == ROOT_DIR_ID {
        // The root has no strict ancestors and no edges of its own.
        return Ok(Vec::new());
    }
    let read = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(i64, String)> {
        Ok((row.get(0)?, row.get(1)?))
    };
    let rows = if direction == Direction::Descendants && id == ROOT_DIR_ID {
        // A directory's depth below the root equals its number of closure rows.
        let mut stmt = conn.prepare(
            "SELECT d.id, d.path FROM dir d
             JOIN (SELECT dir_id, COUNT(*) AS depth FROM dir_ancestor GROUP BY dir_id) c
               ON c.dir_id = d.id
             WHERE c.depth <= ?1
             ORDER BY c.depth, d.id",
        )?;
        let rows = stmt
            .query_map(params![max_depth], read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    } else {
        let sql = match direction {
            Direction::Ancestors => {
                "SELECT d.id, d.path FROM dir_ancestor da
                 JOIN dir d ON d.id = da.ancestor_id
                 WHERE da.dir_id = ?1 AND da.depth > 0 AND da.depth <= ?2
                 ORDER BY da.depth, d.id"
            }
            Direction::Descendants => {
                "SELECT d.id, d.path FROM dir_ancestor da
                 JOIN dir d ON d.id = da.dir_id
                 WHERE da.ancestor_id = ?1 AND da.depth > 0 AND da.depth <= ?2
                 ORDER BY da.depth, d.id"
            }
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![id, max_depth], read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    Ok(rows
        .into_iter()
        .map(|(id, path)| (id, NormalizedPath::from_stored(path)))
        .collect())
}

pub struct DirectoryStore<'c> {
    db: &'c Connector,
}

impl<'c> DirectoryStore<'c> {
    /// Binds to `db`, creating the hierarchy tables if they are missing.
    pub fn new(db: &'c Connector) -> Result<Self, ScoutError> {
        db.with_conn("dir.init", ensure_schema)?;
        Ok(Self { db })
    }

    /// Binds to `db` whose schema is known to exist.
    pub(crate) fn attach(db: &'c Connector) -> Self {
        Self { db }
    }

    pub fn connector(&self) -> &'c Connector {
        self.db
    }

    fn to_directory(&self, id: i64, path: &NormalizedPath) -> Result<Directory, ScoutError> {
        Ok(Directory::with_id(id, self.db.denormalize_path(path)?))
    }

    fn root_directory(&self) -> Directory {
        Directory::with_id(ROOT_DIR_ID, self.db.root())
    }

    /// Inserts one directory row and returns its id. Existing rows are reused;
    /// the root maps to [`ROOT_DIR_ID`] without touching the store.
    pub fn insert_directory<'a>(&self, path: impl Into<PathLike<'a>>) -> Result<i64, ScoutError> {
        let path = self.db.normalize_path(path)?;
        if path.is_root() {
            return Ok(ROOT_DIR_ID);
        }
        self.db
            .with_tx("dir.insert_directory", |conn| insert_directory_row(conn, &path))
    }

    /// Inserts closure rows, skipping ones already present. Returns how many were new.
    pub fn insert_ancestor_edges(&self, edges: &[AncestorEdge]) -> Result<usize, ScoutError> {
        if edges.is_empty() {
            return Ok(0);
        }
        self.db
            .with_tx("dir.insert_ancestor_edges", |conn| insert_edge_rows(conn, edges))
    }

    /// Registers `path` and every directory above it, root-first.
    ///
    /// Returns the whole chain with ids assigned. Re-adding a known path
    /// changes nothing and returns the same ids. The root yields an empty chain.
    pub fn add<'a>(&self, path: impl Into<PathLike<'a>>) -> Result<Vec<Directory>, ScoutError> {
        let chain = self.db.ancestor_paths(path)?;
        if chain.is_empty() {
            return Ok(Vec::new());
        }
        let ids = self.db.with_tx("dir.add", |conn| {
            let ids = chain
                .iter()
                .map(|path| insert_directory_row(conn, path))
                .collect::<Result<Vec<_>, _>>()?;
            let inserted = insert_edge_rows(conn, &closure_edges(&ids))?;
            debug!(dirs = ids.len(), new_edges = inserted, "directory chain stored");
            Ok(ids)
        })?;
        chain
            .iter()
            .zip(ids)
            .map(|(path, id)| self.to_directory(id, path))
            .collect()
    }

    /// Same as [`DirectoryStore::add`], and records the leaf id on `dir`.
    pub fn add_dir(&self, dir: &mut Directory) -> Result<Vec<Directory>, ScoutError> {
        let path = dir.path.clone();
        let chain = self.add(&path)?;
        dir.id = Some(chain.last().and_then(|d| d.id).unwrap_or(ROOT_DIR_ID));
        Ok(chain)
    }

    fn resolve_id(&self, conn: &Connection, key: &DirKey) -> Result<Option<i64>, ScoutError> {
        match key {
            DirKey::Id(id) => Ok(Some(*id)),
            DirKey::Path(path) => select_dir_id(conn, &self.db.normalize_path(path)?),
        }
    }

    fn related(
        &self,
        op_name: &str,
        key: DirKey,
        direction: Direction,
        max_depth: Option<u32>,
    ) -> Result<Vec<(i64, NormalizedPath)>, ScoutError> {
        let max_depth = depth_bound(max_depth);
        self.db.with_conn(op_name, |conn| match self.resolve_id(conn, &key)? {
            Some(id) => related_rows(conn, id, direction, max_depth),
            None => Ok(Vec::new()),
        })
    }

    /// Ids of strict ancestors of `dir` within `max_depth` levels, nearest first.
    /// The root is never listed. Unknown directories have none.
    pub fn ancestor_ids_of(
        &self,
        dir: impl Into<DirKey>,
        max_depth: Option<u32>,
    ) -> Result<Vec<i64>, ScoutError> {
        Ok(self
            .related("dir.ancestor_ids", dir.into(), Direction::Ancestors, max_depth)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// Ids of strict descendants of `dir` within `max_depth` levels,
    /// ordered by depth and then id.
    pub fn descendant_ids_of(
        &self,
        dir: impl Into<DirKey>,
        max_depth: Option<u32>,
    ) -> Result<Vec<i64>, ScoutError> {
        Ok(self
            .related("dir.descendant_ids", dir.into(), Direction::Descendants, max_depth)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    pub fn ancestors(
        &self,
        dir: impl Into<DirKey>,
        max_depth: Option<u32>,
    ) -> Result<Vec<Directory>, ScoutError> {
        self.related("dir.ancestors", dir.into(), Direction::Ancestors, max_depth)?
            .iter()
            .map(|(id, path)| self.to_directory(*id, path))
            .collect()
    }

    pub fn descendants(
        &self,
        dir: impl Into<DirKey>,
        max_depth: Option<u32>,
    ) -> Result<Vec<Directory>, ScoutError> {
        self.related("dir.descendants", dir.into(), Direction::Descendants, max_depth)?
            .iter()
            .map(|(id, path)| self.to_directory(*id, path))
            .collect()
    }

    /// Looks up a single directory. The root is synthesized rather than read.
    pub fn get_one(&self, query: &DirQuery) -> Result<Option<Directory>, ScoutError> {
        let key = query.key()?;
        let found = match key {
            DirKey::Id(ROOT_DIR_ID) => return Ok(Some(self.root_directory())),
            DirKey::Id(id) => self
                .db
                .with_conn("dir.get_one", |conn| select_dir_path(conn, id))?
                .map(|path| (id, path)),
            DirKey::Path(path) => {
                let path = self.db.normalize_path(&path)?;
                if path.is_root() {
                    return Ok(Some(self.root_directory()));
                }
                self.db
                    .with_conn("dir.get_one", |conn| select_dir_id(conn, &path))?
                    .map(|id| (id, path))
            }
        };
        found
            .map(|(id, path)| self.to_directory(id, &path))
            .transpose()
    }

    pub fn get(&self, dir: impl Into<DirKey>) -> Result<Option<Directory>, ScoutError> {
        match dir.into() {
            DirKey::Id(id) => self.get_one(&DirQuery::by_id(id)),
            DirKey::Path(path) => self.get_one(&DirQuery::by_path(path)),
        }
    }
}
