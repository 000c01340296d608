//! File metadata repository.
//!
//! Every [`FileRepo::add`] appends new rows; earlier observations of the same
//! file are kept. Queries combine [`Filter`]s with AND.

use crate::core::connector::Connector;
use crate::core::error::ScoutError;
use crate::core::model::{ContentHash, FileRecord};
use crate::core::paths::NormalizedPath;
use crate::core::schemas;
use crate::core::time::{Timestamp, now_epoch_secs};
use crate::index::dirs::{self, DirKey, ROOT_DIR_ID};
use rusqlite::types::ToSql;
use rusqlite::{Connection, params};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Filterable columns of the `file` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    DirId,
    Name,
    ContentHash,
    Size,
    Mtime,
    Updated,
}

impl Column {
    pub fn parse(name: &str) -> Result<Self, ScoutError> {
        match name {
            "id" => Ok(Column::Id),
            "dir_id" => Ok(Column::DirId),
            "name" => Ok(Column::Name),
            "content_hash" => Ok(Column::ContentHash),
            "size" => Ok(Column::Size),
            "mtime" => Ok(Column::Mtime),
            "updated" => Ok(Column::Updated),
            other => Err(ScoutError::UnsupportedFilter(format!("unknown column '{}'", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::DirId => "dir_id",
            Column::Name => "name",
            Column::ContentHash => "content_hash",
            Column::Size => "size",
            Column::Mtime => "mtime",
            Column::Updated => "updated",
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Column::Id => "f.id",
            Column::DirId => "f.dir_id",
            Column::Name => "f.name",
            Column::ContentHash => "f.content_hash",
            Column::Size => "f.size",
            Column::Mtime => "f.mtime",
            Column::Updated => "f.updated",
        }
    }

    /// Parses a raw value into the type this column stores.
    pub fn value(&self, raw: &str) -> Result<FilterValue, ScoutError> {
        match self {
            Column::Name => Ok(FilterValue::Text(raw.to_string())),
            Column::ContentHash => Ok(FilterValue::Hash(ContentHash::from_hex(raw)?)),
            _ => raw.trim().parse::<i64>().map(FilterValue::Int).map_err(|_| {
                ScoutError::InvalidArgument(format!(
                    "{} expects an integer, got '{}'",
                    self.name(),
                    raw
                ))
            }),
        }
    }

    fn accepts(&self, value: &FilterValue) -> bool {
        matches!(
            (self, value),
            (Column::Name, FilterValue::Text(_))
                | (Column::ContentHash, FilterValue::Hash(_))
                | (
                    Column::Id | Column::DirId | Column::Size | Column::Mtime | Column::Updated,
                    FilterValue::Int(_)
                )
        )
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Ne,
}

impl Comparison {
    /// Maps a key suffix (`gt`, `le`, ...) to its comparison.
    pub fn parse(suffix: &str) -> Result<Self, ScoutError> {
        match suffix {
            "eq" => Ok(Comparison::Eq),
            "gt" => Ok(Comparison::Gt),
            "ge" => Ok(Comparison::Ge),
            "lt" => Ok(Comparison::Lt),
            "le" => Ok(Comparison::Le),
            "ne" => Ok(Comparison::Ne),
            other => Err(ScoutError::UnsupportedFilter(format!(
                "unsupported comparison suffix '{}'",
                other
            ))),
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Ne => "<>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Hash(ContentHash),
}

impl FilterValue {
    fn to_param(&self) -> Box<dyn ToSql> {
        match self {
            FilterValue::Int(v) => Box::new(*v),
            FilterValue::Text(v) => Box::new(v.clone()),
            FilterValue::Hash(v) => Box::new(*v),
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Int(i64::from(value))
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<ContentHash> for FilterValue {
    fn from(value: ContentHash) -> Self {
        FilterValue::Hash(value)
    }
}

/// One predicate over stored files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Compare {
        column: Column,
        op: Comparison,
        value: FilterValue,
    },
    Null {
        column: Column,
        is_null: bool,
    },
    /// Matches files whose parent directory and name equal those of the path.
    Path(PathBuf),
}

impl Filter {
    pub fn compare(column: Column, op: Comparison, value: impl Into<FilterValue>) -> Self {
        Filter::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: Column, value: impl Into<FilterValue>) -> Self {
        Self::compare(column, Comparison::Eq, value)
    }

    pub fn gt(column: Column, value: impl Into<FilterValue>) -> Self {
        Self::compare(column, Comparison::Gt, value)
    }

    pub fn ge(column: Column, value: impl Into<FilterValue>) -> Self {
        Self::compare(column, Comparison::Ge, value)
    }

    pub fn lt(column: Column, value: impl Into<FilterValue>) -> Self {
        Self::compare(column, Comparison::Lt, value)
    }

    pub fn le(column: Column, value: impl Into<FilterValue>) -> Self {
        Self::compare(column, Comparison::Le, value)
    }

    pub fn ne(column: Column, value: impl Into<FilterValue>) -> Self {
        Self::compare(column, Comparison::Ne, value)
    }

    pub fn is_null(column: Column) -> Self {
        Filter::Null {
            column,
            is_null: true,
        }
    }

    pub fn not_null(column: Column) -> Self {
        Filter::Null {
            column,
            is_null: false,
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Filter::Path(path.into())
    }

    /// Builds a filter from a `column[__suffix]` key and a raw value, e.g.
    /// `size__gt=100`, `content_hash__null=true` or `path=a/b.txt`.
    pub fn parse(key: &str, raw: &str) -> Result<Self, ScoutError> {
        let (name, suffix) = match key.split_once("__") {
            Some((name, suffix)) => (name, Some(suffix)),
            None => (key, None),
        };
        if name == "path" {
            return match suffix {
                None | Some("eq") => Ok(Filter::path(raw)),
                Some(other) => Err(ScoutError::UnsupportedFilter(format!(
                    "path only supports equality, got '{}'",
                    other
                ))),
            };
        }
        let column = Column::parse(name)?;
        match suffix {
            Some("null") => {
                let is_null = match raw.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => true,
                    "false" | "0" | "no" => false,
                    other => {
                        return Err(ScoutError::InvalidArgument(format!(
                            "{}__null expects a boolean, got '{}'",
                            name, other
                        )));
                    }
                };
                Ok(Filter::Null { column, is_null })
            }
            Some(suffix) => Ok(Filter::Compare {
                column,
                op: Comparison::parse(suffix)?,
                value: column.value(raw)?,
            }),
            None => Ok(Filter::eq(column, column.value(raw)?)),
        }
    }

    fn validate(&self) -> Result<(), ScoutError> {
        match self {
            Filter::Compare { column, value, .. } if !column.accepts(value) => {
                Err(ScoutError::InvalidArgument(format!(
                    "value {:?} does not fit column {}",
                    value, column
                )))
            }
            _ => Ok(()),
        }
    }
}

pub(crate) fn ensure_schema(conn: &Connection) -> Result<(), ScoutError> {
    conn.execute(schemas::FILE_DB_SCHEMA, [])?;
    conn.execute(schemas::FILE_DB_SCHEMA_INDEX, [])?;
    Ok(())
}

/// A record ready to insert: its normalized parent and file name.
struct Prepared<'r> {
    record: &'r FileRecord,
    parent: NormalizedPath,
    name: String,
    size: Option<i64>,
}

pub struct FileRepo<'c> {
    db: &'c Connector,
}

impl<'c> FileRepo<'c> {
    /// Binds to `db`, creating the directory and file tables if they are missing.
    pub fn new(db: &'c Connector) -> Result<Self, ScoutError> {
        if !db.table_exists(schemas::DIR_TABLE)? || !db.table_exists(schemas::FILE_TABLE)? {
            db.with_conn("file.init", |conn| {
                dirs::ensure_schema(conn)?;
                ensure_schema(conn)
            })?;
        }
        Ok(Self { db })
    }

    pub(crate) fn attach(db: &'c Connector) -> Self {
        Self { db }
    }

    pub fn connector(&self) -> &'c Connector {
        self.db
    }

    fn prepare<'r>(&self, record: &'r FileRecord) -> Result<Prepared<'r>, ScoutError> {
        let path = self.db.normalize_path(&record.path)?;
        let name = path
            .file_name()
            .ok_or_else(|| {
                ScoutError::InvalidArgument(format!(
                    "file record path {} does not name a file",
                    record.path.display()
                ))
            })?
            .to_string();
        let parent = path.parent().unwrap_or_default();
        let size = record
            .size
            .map(i64::try_from)
            .transpose()
            .map_err(|_| ScoutError::InvalidArgument(format!("size of {} overflows", name)))?;
        Ok(Prepared {
            record,
            parent,
            name,
            size,
        })
    }

    /// Looks up a registered directory by id or path. The root resolves to
    /// `(0, "")`; unknown directories give `None`.
    pub fn select_dir_where(
        &self,
        key: impl Into<DirKey>,
    ) -> Result<Option<(i64, NormalizedPath)>, ScoutError> {
        match key.into() {
            DirKey::Id(id) => self.db.with_conn("file.select_dir", |conn| {
                Ok(dirs::select_dir_path(conn, id)?.map(|path| (id, path)))
            }),
            DirKey::Path(path) => {
                let path = self.db.normalize_path(&path)?;
                self.db.with_conn("file.select_dir", |conn| {
                    Ok(dirs::select_dir_id(conn, &path)?.map(|id| (id, path.clone())))
                })
            }
        }
    }

    /// Resolves the parent directory. An explicit `dir_id` wins over the path.
    fn resolve_parent(
        conn: &Connection,
        dir_id: Option<i64>,
        parent: &NormalizedPath,
    ) -> Result<(i64, NormalizedPath), ScoutError> {
        match dir_id {
            Some(id) => dirs::select_dir_path(conn, id)?
                .map(|path| (id, path))
                .ok_or_else(|| ScoutError::MissingParentDirectory(format!("dir_id {}", id))),
            None => dirs::select_dir_id(conn, parent)?
                .map(|id| (id, parent.clone()))
                .ok_or_else(|| ScoutError::MissingParentDirectory(parent.to_string())),
        }
    }

    /// Appends `files`, all or none. Parents must already be registered.
    ///
    /// Returns the stored records with `id`, `dir_id` and `updated` filled in
    /// and `path` made absolute.
    pub fn add(&self, files: &[FileRecord]) -> Result<Vec<FileRecord>, ScoutError> {
        let prepared = files
            .iter()
            .map(|record| self.prepare(record))
            .collect::<Result<Vec<_>, _>>()?;
        if prepared.is_empty() {
            return Ok(Vec::new());
        }
        let updated: Timestamp = now_epoch_secs();
        let stored = self.db.with_tx("file.add", |conn| {
            let mut stmt = conn.prepare_cached(
                "INSERT INTO file (dir_id, name, content_hash, size, mtime, updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            let mut out = Vec::with_capacity(prepared.len());
            for item in &prepared {
                let (dir_id, dir_path) =
                    Self::resolve_parent(conn, item.record.dir_id, &item.parent)?;
                stmt.execute(params![
                    dir_id,
                    item.name,
                    item.record.content_hash,
                    item.size,
                    item.record.mtime,
                    updated
                ])?;
                out.push((conn.last_insert_rowid(), dir_id, dir_path.join(&item.name)));
            }
            Ok(out)
        })?;
        debug!(files = stored.len(), "file rows appended");
        stored
            .into_iter()
            .zip(&prepared)
            .map(|((id, dir_id, path), item)| {
                Ok(FileRecord {
                    id: Some(id),
                    dir_id: Some(dir_id),
                    path: self.db.denormalize_path(&path)?,
                    content_hash: item.record.content_hash,
                    size: item.record.size,
                    mtime: item.record.mtime,
                    updated: Some(updated),
                })
            })
            .collect()
    }

    pub fn add_one(&self, file: &FileRecord) -> Result<FileRecord, ScoutError> {
        self.add(std::slice::from_ref(file))?
            .pop()
            .ok_or_else(|| ScoutError::InvalidArgument("no file row was stored".to_string()))
    }

    /// Every stored row matching all `filters`, in insertion order.
    /// An empty filter list returns every row.
    pub fn get(&self, filters: &[Filter]) -> Result<Vec<FileRecord>, ScoutError> {
        for filter in filters {
            filter.validate()?;
        }
        let mut path_filters = Vec::new();
        for filter in filters {
            if let Filter::Path(path) = filter {
                let path = self.db.normalize_path(path)?;
                let name = path
                    .file_name()
                    .ok_or_else(|| {
                        ScoutError::InvalidArgument("path filter must name a file".to_string())
                    })?
                    .to_string();
                path_filters.push((path.parent().unwrap_or_default(), name));
            }
        }

        let rows = self.db.with_conn("file.get", |conn| {
            let mut query = "SELECT f.id, f.dir_id, f.name, f.content_hash, f.size, f.mtime, f.updated, d.path
                 FROM file f LEFT JOIN dir d ON d.id = f.dir_id WHERE 1=1"
                .to_string();
            let mut params: Vec<Box<dyn ToSql>> = Vec::new();

            for (parent, name) in &path_filters {
                let Some(dir_id) = dirs::select_dir_id(conn, parent)? else {
                    return Ok(Vec::new());
                };
                query.push_str(" AND f.dir_id = ? AND f.name = ?");
                params.push(Box::new(dir_id));
                params.push(Box::new(name.clone()));
            }
            for filter in filters {
                match filter {
                    Filter::Compare { column, op, value } => {
                        query.push_str(&format!(" AND {} {} ?", column.sql(), op.sql()));
                        params.push(value.to_param());
                    }
                    Filter::Null { column, is_null } => {
                        let test = if *is_null { "IS NULL" } else { "IS NOT NULL" };
                        query.push_str(&format!(" AND {} {}", column.sql(), test));
                    }
                    Filter::Path(_) => {}
                }
            }
            query.push_str(" ORDER BY f.id");

            let mut stmt = conn.prepare(&query)?;
            let params_as_dyn: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let mut rows = stmt.query(rusqlite::params_from_iter(params_as_dyn.iter().copied()))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let dir_path: Option<String> = row.get(7)?;
                let size: Option<i64> = row.get(4)?;
                out.push(StoredRow {
                    id: row.get(0)?,
                    dir_id: row.get(1)?,
                    name: row.get(2)?,
                    content_hash: row.get(3)?,
                    size: size.map(|s| s.max(0) as u64),
                    mtime: row.get(5)?,
                    updated: row.get(6)?,
                    dir_path: dir_path.map(NormalizedPath::from_stored),
                });
            }
            Ok(out)
        })?;

        rows.into_iter().map(|row| row.into_record(self.db)).collect()
    }
}

struct StoredRow {
    id: i64,
    dir_id: i64,
    name: String,
    content_hash: Option<ContentHash>,
    size: Option<u64>,
    mtime: Option<Timestamp>,
    updated: Timestamp,
    dir_path: Option<NormalizedPath>,
}

impl StoredRow {
    fn into_record(self, db: &Connector) -> Result<FileRecord, ScoutError> {
        // Files in the root, or under a dir row that no longer exists, join to no path.
        let parent = match self.dir_path {
            Some(path) if self.dir_id != ROOT_DIR_ID => path,
            _ => NormalizedPath::root(),
        };
        Ok(FileRecord {
            id: Some(self.id),
            dir_id: Some(self.dir_id),
            path: db.denormalize_path(&parent.join(&self.name))?,
            content_hash: self.content_hash,
            size: self.size,
            mtime: self.mtime,
            updated: Some(self.updated),
        })
    }
}
