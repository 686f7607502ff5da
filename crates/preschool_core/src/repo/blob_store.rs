//! Object storage for uploaded files.
//!
//! # Invariants
//! - Keys are `/`-separated segments of `[A-Za-z0-9._-]`, never `.` or `..`,
//!   so a key cannot escape the store root.
//! - `get` on a missing key is `Ok(None)`, not an error.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::PathBuf;

static KEY_SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid key segment regex"));

pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Debug)]
pub enum BlobError {
    InvalidKey(String),
    Io { key: String, source: std::io::Error },
}

impl Display for BlobError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid blob key: `{key}`"),
            Self::Io { key, source } => write!(f, "blob io failed for `{key}`: {source}"),
        }
    }
}

impl Error for BlobError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidKey(_) => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Object storage interface for file upload/download.
pub trait BlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> BlobResult<()>;
    fn get(&self, key: &str) -> BlobResult<Option<Vec<u8>>>;
    /// Returns whether a blob was removed.
    fn delete(&self, key: &str) -> BlobResult<bool>;
}

/// Filesystem-backed blob store rooted at one directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> BlobResult<PathBuf> {
        let mut path = self.root.clone();
        let mut segments = 0;
        for segment in key.split('/') {
            if segment == "." || segment == ".." || !KEY_SEGMENT_RE.is_match(segment) {
                return Err(BlobError::InvalidKey(key.to_string()));
            }
            path.push(segment);
            segments += 1;
        }
        if segments == 0 {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(path)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> BlobResult<()> {
        let path = self.path_for(key)?;
        let io_error = |source| BlobError::Io {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(&path, bytes).map_err(io_error)
    }

    fn get(&self, key: &str) -> BlobResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BlobError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn delete(&self, key: &str) -> BlobResult<bool> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(BlobError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BlobError, BlobStore, FsBlobStore};

    #[test]
    fn put_get_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.put("org/student/doc.pdf", b"%PDF-1.7").unwrap();
        assert_eq!(
            store.get("org/student/doc.pdf").unwrap().as_deref(),
            Some(&b"%PDF-1.7"[..])
        );
        assert!(store.delete("org/student/doc.pdf").unwrap());
        assert!(!store.delete("org/student/doc.pdf").unwrap());
        assert_eq!(store.get("org/student/doc.pdf").unwrap(), None);
    }

    #[test]
    fn rejects_keys_that_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        for key in ["../etc/passwd", "a//b", "", "a/./b", "/abs", "a b"] {
            assert!(
                matches!(store.put(key, b"x"), Err(BlobError::InvalidKey(_))),
                "key `{key}` should be rejected"
            );
        }
    }
}
