//! Records exchanged with the store.

use crate::core::error::ScoutError;
use crate::core::time::Timestamp;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const HASH_LEN: usize = 32;
const READ_CHUNK: usize = 4096;

/// A SHA-256 digest of a file's content, stored as a 32-byte BLOB.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ScoutError> {
        <[u8; HASH_LEN]>::try_from(bytes).map(Self).map_err(|_| {
            ScoutError::InvalidArgument(format!(
                "content hash must be {} bytes, got {}",
                HASH_LEN,
                bytes.len()
            ))
        })
    }

    pub fn from_hex(text: &str) -> Result<Self, ScoutError> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| ScoutError::InvalidArgument(format!("content hash '{}': {}", text, e)))?;
        Self::from_slice(&bytes)
    }

    pub fn digest(data: &[u8]) -> Self {
        Self::from_digest(&Sha256::digest(data))
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(digest);
        Self(bytes)
    }

    /// Hashes everything `reader` yields, in fixed-size chunks.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ScoutError> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self::from_digest(&hasher.finalize()))
    }

    pub fn from_path(path: &Path) -> Result<Self, ScoutError> {
        Self::from_reader(File::open(path)?)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        ContentHash::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

impl ToSql for ContentHash {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Blob(&self.0)))
    }
}

impl FromSql for ContentHash {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let blob = value.as_blob()?;
        <[u8; HASH_LEN]>::try_from(blob)
            .map(ContentHash)
            .map_err(|_| FromSqlError::InvalidBlobSize {
                expected_size: HASH_LEN,
                blob_size: blob.len(),
            })
    }
}

/// A directory under the root. `id` is unset until the directory is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub id: Option<i64>,
    pub path: PathBuf,
}

impl Directory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: None,
            path: path.into(),
        }
    }

    pub fn with_id(id: i64, path: impl Into<PathBuf>) -> Self {
        Self {
            id: Some(id),
            path: path.into(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

impl AsRef<Path> for Directory {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// One file metadata observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Option<i64>,
    /// Parent directory; when set it wins over the parent derived from `path`.
    pub dir_id: Option<i64>,
    pub path: PathBuf,
    pub content_hash: Option<ContentHash>,
    pub size: Option<u64>,
    pub mtime: Option<Timestamp>,
    /// Set by the store on insert.
    pub updated: Option<Timestamp>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: None,
            dir_id: None,
            path: path.into(),
            content_hash: None,
            size: None,
            mtime: None,
            updated: None,
        }
    }

    pub fn with_dir_id(mut self, dir_id: i64) -> Self {
        self.dir_id = Some(dir_id);
        self
    }

    pub fn with_hash(mut self, hash: ContentHash) -> Self {
        self.content_hash = Some(hash);
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_mtime(mut self, mtime: Timestamp) -> Self {
        self.mtime = Some(mtime);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

/// A row of the closure table: `ancestor_id` is `depth` levels above `dir_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AncestorEdge {
    pub dir_id: i64,
    pub ancestor_id: i64,
    pub depth: i64,
}
