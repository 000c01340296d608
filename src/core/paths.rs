//! Root-relative path normalization.
//!
//! Every path the store persists is relative to the tracked root, uses `/` as
//! its separator, and never contains `.` or `..` components. The root itself
//! normalizes to the empty path.

use crate::core::error::ScoutError;
use crate::core::model::Directory;
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A root-relative, `/`-separated path. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Wraps a value read back from the store. Stored paths are already normalized.
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }

    fn from_components(parts: &[&str]) -> Self {
        Self(parts.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|part| !part.is_empty())
    }

    /// Number of components; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.components().count()
    }

    /// The containing path, or `None` for the root.
    pub fn parent(&self) -> Option<NormalizedPath> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rfind('/') {
            Some(idx) => Self(self.0[..idx].to_string()),
            None => Self::root(),
        })
    }

    /// Last component, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Appends a single component.
    pub fn join(&self, name: &str) -> NormalizedPath {
        if self.is_root() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.components().collect()
    }

    /// Inclusive chain of prefixes, root-first and leaf-last. Empty for the root.
    pub fn prefixes(&self) -> Vec<NormalizedPath> {
        let parts: Vec<&str> = self.components().collect();
        (1..=parts.len())
            .map(|end| Self::from_components(&parts[..end]))
            .collect()
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Anything the store accepts where a path is expected.
#[derive(Debug, Clone, Copy)]
pub enum PathLike<'a> {
    Text(&'a str),
    Path(&'a Path),
    Dir(&'a Directory),
}

impl<'a> PathLike<'a> {
    pub fn as_path(&self) -> &'a Path {
        match *self {
            PathLike::Text(text) => Path::new(text),
            PathLike::Path(path) => path,
            PathLike::Dir(dir) => dir.path.as_path(),
        }
    }
}

impl<'a> From<&'a str> for PathLike<'a> {
    fn from(value: &'a str) -> Self {
        PathLike::Text(value)
    }
}

impl<'a> From<&'a String> for PathLike<'a> {
    fn from(value: &'a String) -> Self {
        PathLike::Text(value.as_str())
    }
}

impl<'a> From<&'a Path> for PathLike<'a> {
    fn from(value: &'a Path) -> Self {
        PathLike::Path(value)
    }
}

impl<'a> From<&'a PathBuf> for PathLike<'a> {
    fn from(value: &'a PathBuf) -> Self {
        PathLike::Path(value.as_path())
    }
}

impl<'a> From<&'a Directory> for PathLike<'a> {
    fn from(value: &'a Directory) -> Self {
        PathLike::Dir(value)
    }
}

impl<'a> From<&'a NormalizedPath> for PathLike<'a> {
    fn from(value: &'a NormalizedPath) -> Self {
        PathLike::Text(value.as_str())
    }
}

struct Split<'p> {
    absolute: bool,
    parts: Vec<&'p str>,
}

fn split(path: &Path) -> Result<Split<'_>, ScoutError> {
    let mut absolute = false;
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => return Err(ScoutError::PathNotSupported(path.to_path_buf())),
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| ScoutError::PathNotSupported(path.to_path_buf()))?,
            ),
        }
    }
    Ok(Split { absolute, parts })
}

/// Strips `root` from an absolute `path`, comparing whole components.
fn relative_parts<'p>(root: &Path, path: &'p Path) -> Result<Vec<&'p str>, ScoutError> {
    let input = split(path)?;
    if !input.absolute {
        return Ok(input.parts);
    }
    let base = split(root)?;
    if input.parts.len() < base.parts.len() || input.parts[..base.parts.len()] != base.parts[..] {
        return Err(ScoutError::PathOutsideTarget {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        });
    }
    Ok(input.parts[base.parts.len()..].to_vec())
}

/// Converts `path` into its root-relative form.
///
/// Relative input is taken to be root-relative already. Absolute input must
/// lie under `root`. Any `..` component is rejected outright.
pub fn normalize(root: &Path, path: &Path) -> Result<NormalizedPath, ScoutError> {
    let parts = relative_parts(root, path)?;
    Ok(NormalizedPath::from_components(&parts))
}

/// Converts `path` into an absolute path under `root`.
///
/// Absolute input is checked against `root` and returned unchanged.
pub fn denormalize(root: &Path, path: &Path) -> Result<PathBuf, ScoutError> {
    let parts = relative_parts(root, path)?;
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let mut out = root.to_path_buf();
    out.extend(parts);
    Ok(out)
}

/// Resolves symlinks in the longest existing prefix of an absolute `path`;
/// the part that does not exist yet is appended as given.
pub fn resolve_existing(path: &Path) -> Option<PathBuf> {
    if !path.is_absolute() {
        return None;
    }
    let mut tail = Vec::new();
    let mut current = path;
    loop {
        if let Ok(mut resolved) = current.canonicalize() {
            resolved.extend(tail.iter().rev().copied());
            return Some(resolved);
        }
        tail.push(current.file_name()?);
        current = current.parent()?;
    }
}

/// The inclusive, root-first chain of normalized ancestors of `path`.
pub fn ancestor_paths(root: &Path, path: &Path) -> Result<Vec<NormalizedPath>, ScoutError> {
    Ok(normalize(root, path)?.prefixes())
}
