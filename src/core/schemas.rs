//! Centralized schema definitions for the scout store.
//!
//! One SQLite file holds a whole repository:
//! 1. `fs_meta`: bookkeeping properties, most importantly the tracked `root`.
//! 2. `dir` + `dir_ancestor`: the directory arena and its closure table.
//! 3. `file`: append-only file metadata rows keyed by parent directory and name.

pub const DEFAULT_DB_NAME: &str = ".scout.db";
pub const CONFIG_FILE_NAME: &str = "scout.toml";
pub const SCHEMA_VERSION: &str = "1";

/// First 16 bytes of every SQLite 3 database file.
pub const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

// --- Metadata ---
pub const META_TABLE: &str = "fs_meta";
pub const META_ROOT_PROPERTY: &str = "root";
pub const META_VERSION_PROPERTY: &str = "schema_version";

pub const META_DB_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS fs_meta (
        property TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

// --- Directory hierarchy ---
pub const DIR_TABLE: &str = "dir";
pub const DIR_ANCESTOR_TABLE: &str = "dir_ancestor";

pub const DIR_DB_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS dir (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        path TEXT NOT NULL,
        CONSTRAINT path_unique UNIQUE (path)
    )
";

pub const DIR_ANCESTOR_DB_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS dir_ancestor (
        dir_id INTEGER NOT NULL,
        ancestor_id INTEGER NOT NULL,
        depth INTEGER NOT NULL,
        PRIMARY KEY (dir_id, ancestor_id),
        FOREIGN KEY (dir_id) REFERENCES dir(id),
        FOREIGN KEY (ancestor_id) REFERENCES dir(id)
    )
";
pub const DIR_ANCESTOR_DB_SCHEMA_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_dir_ancestor_ancestor ON dir_ancestor(ancestor_id, depth)";

// --- Files ---
pub const FILE_TABLE: &str = "file";

// dir_id carries no FOREIGN KEY: 0 is the root sentinel and has no dir row.
pub const FILE_DB_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS file (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        dir_id INTEGER NOT NULL DEFAULT 0,
        name TEXT NOT NULL,
        content_hash BLOB,
        size INTEGER,
        mtime INTEGER,
        updated INTEGER NOT NULL
    )
";
pub const FILE_DB_SCHEMA_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_file_dir_name ON file(dir_id, name)";
