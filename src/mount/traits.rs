//! mount::traits
//!
//! Filesystem view traits.
//!
//! # Design
//!
//! A mount point exposes a read view and, optionally, a write view. The two
//! are separate traits so that holding a [`WriteFs`] is the proof that a
//! mutation is allowed: code that only has a [`ReadFs`] cannot write.
//!
//! Paths are mount-relative `/`-separated strings as produced by
//! [`crate::core::paths`].
//!
//! Implementations must be thread-safe (`Send + Sync`); one view is shared by
//! every concurrent request.

use std::fmt::Debug;

use serde::Serialize;
use thiserror::Error;

use crate::core::types::{Shasum, UtcTimestamp};

/// Errors from filesystem views.
#[derive(Debug, Error)]
pub enum FsError {
    /// No file or directory at the path.
    #[error("not found: {0}")]
    NotFound(String),

    /// A file already exists where an exclusive create was requested.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The path is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Refusing to remove a directory that still has entries.
    #[error("directory is not empty: {0}")]
    DirectoryNotEmpty(String),

    /// The backend does not implement the operation.
    #[error("{op} is not supported by this filesystem")]
    Unsupported {
        /// The unsupported operation.
        op: &'static str,
    },

    /// Underlying I/O failure.
    #[error("i/o error on '{path}': {source}")]
    Io {
        /// Path being accessed.
        path: String,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Map an `io::Error` for `path`, folding the common kinds into variants.
    pub fn from_io(path: &str, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists(path.to_string()),
            _ => FsError::Io {
                path: path.to_string(),
                source,
            },
        }
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

/// File attributes used by the copy/move integrity protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStat {
    /// Mount-relative path.
    pub path: String,
    /// Mime type guessed from the extension.
    pub mime: String,
    /// Size in bytes.
    pub size: u64,
    /// SHA-256 of the content.
    pub shasum: Shasum,
    /// Creation time.
    pub created: UtcTimestamp,
    /// Last modification time.
    pub updated: UtcTimestamp,
}

impl FileStat {
    /// Build a stat from content and times.
    pub fn from_bytes(
        path: &str,
        bytes: &[u8],
        created: UtcTimestamp,
        updated: UtcTimestamp,
    ) -> Self {
        Self {
            path: path.to_string(),
            mime: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            size: bytes.len() as u64,
            shasum: Shasum::of(bytes),
            created,
            updated,
        }
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DirEntry {
    /// Entry name (single segment).
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Read-only filesystem view.
pub trait ReadFs: Send + Sync + Debug {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Whether `path` is a directory. The empty path is the root.
    fn is_dir(&self, path: &str) -> bool;

    /// Read a file's full content.
    fn read(&self, path: &str) -> Result<Vec<u8>, FsError>;

    /// Stat a file, including its content hash.
    fn stat(&self, path: &str) -> Result<FileStat, FsError>;

    /// List the immediate entries of a directory, sorted by name.
    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError>;
}

/// Read-write filesystem view.
///
/// A write view can always read back what it wrote.
pub trait WriteFs: ReadFs {
    /// This view as a read view.
    fn as_read(&self) -> &dyn ReadFs;

    /// Write a file, creating parent directories. Overwrites unconditionally.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), FsError>;

    /// Create a file only if nothing exists at `path` (O_EXCL semantics).
    ///
    /// Returns `FsError::AlreadyExists` if the file exists and
    /// `FsError::Unsupported` if the backend cannot do this atomically.
    fn create_new(&self, path: &str, bytes: &[u8]) -> Result<(), FsError>;

    /// Remove a file. Returns `FsError::NotFound` if absent.
    fn remove_file(&self, path: &str) -> Result<(), FsError>;

    /// Remove an empty directory.
    fn remove_dir(&self, path: &str) -> Result<(), FsError>;

    /// Re-apply created/updated times to a file.
    fn set_times(
        &self,
        path: &str,
        created: UtcTimestamp,
        updated: UtcTimestamp,
    ) -> Result<(), FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_guesses_mime_from_extension() {
        let now = UtcTimestamp::now();
        assert_eq!(FileStat::from_bytes("a/b.html", b"x", now, now).mime, "text/html");
        assert_eq!(FileStat::from_bytes("a/b.json", b"{}", now, now).mime, "application/json");
        assert_eq!(
            FileStat::from_bytes("a/b.unknownext", b"", now, now).mime,
            "application/octet-stream"
        );
    }

    #[test]
    fn stat_hashes_content() {
        let now = UtcTimestamp::now();
        let stat = FileStat::from_bytes("x.txt", b"abc", now, now);
        assert_eq!(stat.size, 3);
        assert_eq!(stat.shasum, Shasum::of(b"abc"));
    }

    #[test]
    fn io_errors_fold_into_variants() {
        let e = FsError::from_io("p", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(e.is_not_found());
        let e = FsError::from_io("p", std::io::Error::from(std::io::ErrorKind::AlreadyExists));
        assert!(matches!(e, FsError::AlreadyExists(_)));
        let e = FsError::from_io("p", std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(matches!(e, FsError::Io { .. }));
    }
}
