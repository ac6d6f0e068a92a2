//! mount::local
//!
//! Directory-backed filesystem view.
//!
//! # Behavior
//!
//! - Paths are joined onto a root directory after normalization
//! - `write` is atomic (write to a temp file, then rename)
//! - `create_new` uses `O_EXCL` semantics via `OpenOptions::create_new`
//! - `set_times` always applies the modification time; the creation time is
//!   applied only on platforms whose filesystems allow setting it (Windows,
//!   macOS). Elsewhere the reported creation time is the birth time if the
//!   platform exposes one, otherwise the modification time.

use std::fs::{self, File, FileTimes, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::traits::{DirEntry, FileStat, FsError, ReadFs, WriteFs};
use crate::core::paths;
use crate::core::types::UtcTimestamp;

/// A filesystem view rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Create a view rooted at `root`. The directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full(&self, path: &str) -> PathBuf {
        let normalized = paths::normalize(path);
        if normalized.is_empty() {
            self.root.clone()
        } else {
            self.root.join(normalized)
        }
    }

    fn ensure_parent(&self, path: &str, full: &Path) -> Result<(), FsError> {
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::from_io(path, e))?;
        }
        Ok(())
    }
}

impl ReadFs for LocalFs {
    fn exists(&self, path: &str) -> bool {
        self.full(path).exists()
    }

    fn is_dir(&self, path: &str) -> bool {
        self.full(path).is_dir()
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let full = self.full(path);
        if full.is_dir() {
            return Err(FsError::NotFound(path.to_string()));
        }
        fs::read(&full).map_err(|e| FsError::from_io(path, e))
    }

    fn stat(&self, path: &str) -> Result<FileStat, FsError> {
        let full = self.full(path);
        let meta = fs::metadata(&full).map_err(|e| FsError::from_io(path, e))?;
        if meta.is_dir() {
            return Err(FsError::NotFound(path.to_string()));
        }
        let bytes = fs::read(&full).map_err(|e| FsError::from_io(path, e))?;
        let updated = meta.modified().map_err(|e| FsError::from_io(path, e))?;
        let created = meta.created().unwrap_or(updated);
        Ok(FileStat::from_bytes(
            path,
            &bytes,
            UtcTimestamp::from(created),
            UtcTimestamp::from(updated),
        ))
    }

    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let full = self.full(path);
        if !full.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&full).map_err(|e| FsError::from_io(path, e))? {
            let entry = entry.map_err(|e| FsError::from_io(path, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| FsError::from_io(path, e))?
                .is_dir();
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        entries.sort();
        Ok(entries)
    }
}

impl WriteFs for LocalFs {
    fn as_read(&self) -> &dyn ReadFs {
        self
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), FsError> {
        let full = self.full(path);
        self.ensure_parent(path, &full)?;

        // Write to a temp file in the same directory so the rename is atomic
        let temp = full.with_file_name(format!(
            ".{}.~tmp-{}",
            paths::file_name(path),
            uuid::Uuid::new_v4().simple()
        ));
        let result = (|| {
            let mut file = File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&temp, &full)
        })();
        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(FsError::from_io(path, e));
        }
        Ok(())
    }

    fn create_new(&self, path: &str, bytes: &[u8]) -> Result<(), FsError> {
        let full = self.full(path);
        self.ensure_parent(path, &full)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .map_err(|e| FsError::from_io(path, e))?;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| FsError::from_io(path, e))
    }

    fn remove_file(&self, path: &str) -> Result<(), FsError> {
        fs::remove_file(self.full(path)).map_err(|e| FsError::from_io(path, e))
    }

    fn remove_dir(&self, path: &str) -> Result<(), FsError> {
        let full = self.full(path);
        if !full.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }
        let mut entries = fs::read_dir(&full).map_err(|e| FsError::from_io(path, e))?;
        if entries.next().is_some() {
            return Err(FsError::DirectoryNotEmpty(path.to_string()));
        }
        fs::remove_dir(&full).map_err(|e| FsError::from_io(path, e))
    }

    fn set_times(
        &self,
        path: &str,
        created: UtcTimestamp,
        updated: UtcTimestamp,
    ) -> Result<(), FsError> {
        let file = OpenOptions::new()
            .write(true)
            .open(self.full(path))
            .map_err(|e| FsError::from_io(path, e))?;

        let times = FileTimes::new()
            .set_accessed(updated.to_system_time())
            .set_modified(updated.to_system_time());
        let times = with_created(path, times, created);

        file.set_times(times).map_err(|e| FsError::from_io(path, e))
    }
}

#[cfg(windows)]
fn with_created(_path: &str, times: FileTimes, created: UtcTimestamp) -> FileTimes {
    use std::os::windows::fs::FileTimesExt;
    times.set_created(created.to_system_time())
}

#[cfg(target_os = "macos")]
fn with_created(_path: &str, times: FileTimes, created: UtcTimestamp) -> FileTimes {
    use std::os::macos::fs::FileTimesExt;
    times.set_created(created.to_system_time())
}

#[cfg(not(any(windows, target_os = "macos")))]
fn with_created(path: &str, times: FileTimes, created: UtcTimestamp) -> FileTimes {
    tracing::debug!(path, created = %created, "creation time dropped, not settable on this platform");
    times
}
