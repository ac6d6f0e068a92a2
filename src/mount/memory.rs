//! mount::memory
//!
//! In-memory filesystem view for deterministic testing.
//!
//! # Design
//!
//! `MemFs` implements both [`ReadFs`] and [`WriteFs`] over a shared map of
//! files. Clones share state, so the same instance can be mounted read-only
//! in one place and read-write in another. Fault injection covers the
//! failure paths the workflow engine must survive:
//!
//! - corrupted writes (bytes stored differ from bytes written)
//! - failing removes for selected paths
//! - failing reads for selected paths
//! - backends without atomic exclusive create
//!
//! # Example
//!
//! ```
//! use editflow::mount::memory::MemFs;
//! use editflow::mount::{ReadFs, WriteFs};
//!
//! let fs = MemFs::new().with_file("en/about.md", b"hello");
//! fs.write("en/about.md.~draft", b"hello world").unwrap();
//! assert_eq!(fs.read("en/about.md.~draft").unwrap(), b"hello world");
//!
//! fs.fail_remove("en/about.md.~draft");
//! assert!(fs.remove_file("en/about.md.~draft").is_err());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::traits::{DirEntry, FileStat, FsError, ReadFs, WriteFs};
use crate::core::paths;
use crate::core::types::UtcTimestamp;

/// A stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemFile {
    /// Content.
    pub bytes: Vec<u8>,
    /// Creation time.
    pub created: UtcTimestamp,
    /// Last modification time.
    pub updated: UtcTimestamp,
}

/// In-memory filesystem, thread-safe via internal `Arc<Mutex<...>>`.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    inner: Arc<Mutex<MemFsInner>>,
}

#[derive(Debug, Default)]
struct MemFsInner {
    files: BTreeMap<String, MemFile>,
    dirs: BTreeSet<String>,
    corrupt_writes: bool,
    no_exclusive_create: bool,
    fail_remove: BTreeSet<String>,
    fail_read: BTreeSet<String>,
    mutations: usize,
}

impl MemFs {
    /// Create an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a file without counting it as a mutation.
    pub fn with_file(self, path: &str, bytes: &[u8]) -> Self {
        {
            let mut inner = self.state();
            let now = UtcTimestamp::now();
            inner.files.insert(
                paths::normalize(path),
                MemFile {
                    bytes: bytes.to_vec(),
                    created: now,
                    updated: now,
                },
            );
        }
        self
    }

    /// Builder: add a file with explicit timestamps.
    pub fn with_file_times(
        self,
        path: &str,
        bytes: &[u8],
        created: UtcTimestamp,
        updated: UtcTimestamp,
    ) -> Self {
        self.state().files.insert(
            paths::normalize(path),
            MemFile {
                bytes: bytes.to_vec(),
                created,
                updated,
            },
        );
        self
    }

    /// Builder: add an (empty) directory.
    pub fn with_dir(self, path: &str) -> Self {
        self.state().dirs.insert(paths::normalize(path));
        self
    }

    /// Store a flipped copy of every subsequent write.
    pub fn corrupt_writes(&self, enabled: bool) {
        self.state().corrupt_writes = enabled;
    }

    /// Make `create_new` report `Unsupported`.
    pub fn disable_exclusive_create(&self) {
        self.state().no_exclusive_create = true;
    }

    /// Make removal of `path` fail with an I/O error.
    pub fn fail_remove(&self, path: &str) {
        self.state().fail_remove.insert(paths::normalize(path));
    }

    /// Make reads of `path` fail with an I/O error. `stat` still succeeds.
    pub fn fail_read(&self, path: &str) {
        self.state().fail_read.insert(paths::normalize(path));
    }

    /// Clear all injected faults.
    pub fn clear_faults(&self) {
        let mut inner = self.state();
        inner.corrupt_writes = false;
        inner.no_exclusive_create = false;
        inner.fail_remove.clear();
        inner.fail_read.clear();
    }

    /// A copy of every stored file, for bit-for-bit comparisons.
    pub fn snapshot(&self) -> BTreeMap<String, MemFile> {
        self.state().files.clone()
    }

    /// Number of mutating calls that reached the store.
    pub fn mutations(&self) -> usize {
        self.state().mutations
    }

    fn state(&self) -> MutexGuard<'_, MemFsInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemFsInner {
    fn is_dir(&self, path: &str) -> bool {
        if path.is_empty() || self.dirs.contains(path) {
            return true;
        }
        let prefix = format!("{path}/");
        self.files.keys().any(|k| k.starts_with(&prefix))
            || self.dirs.iter().any(|d| d.starts_with(&prefix))
    }

    fn store(&mut self, path: String, bytes: &[u8]) {
        let mut bytes = bytes.to_vec();
        if self.corrupt_writes {
            match bytes.first_mut() {
                Some(b) => *b ^= 0xff,
                None => bytes.push(0),
            }
        }
        let now = UtcTimestamp::now();
        let created = self.files.get(&path).map_or(now, |f| f.created);
        self.files.insert(
            path,
            MemFile {
                bytes,
                created,
                updated: now,
            },
        );
        self.mutations += 1;
    }
}

impl ReadFs for MemFs {
    fn exists(&self, path: &str) -> bool {
        let path = paths::normalize(path);
        let inner = self.state();
        inner.files.contains_key(&path) || inner.is_dir(&path)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.state().is_dir(&paths::normalize(path))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let key = paths::normalize(path);
        let inner = self.state();
        if inner.fail_read.contains(&key) {
            return Err(FsError::Io {
                path: key,
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected read failure"),
            });
        }
        inner
            .files
            .get(&key)
            .map(|f| f.bytes.clone())
            .ok_or(FsError::NotFound(key))
    }

    fn stat(&self, path: &str) -> Result<FileStat, FsError> {
        let key = paths::normalize(path);
        let inner = self.state();
        let file = inner.files.get(&key).ok_or(FsError::NotFound(key.clone()))?;
        Ok(FileStat::from_bytes(&key, &file.bytes, file.created, file.updated))
    }

    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let key = paths::normalize(path);
        let inner = self.state();
        if !inner.is_dir(&key) {
            return Err(FsError::NotADirectory(key));
        }
        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };

        let mut entries = BTreeSet::new();
        let candidates = inner
            .files
            .keys()
            .map(|k| (k, false))
            .chain(inner.dirs.iter().map(|d| (d, true)));
        for (candidate, explicit_dir) in candidates {
            let Some(rest) = candidate.strip_prefix(&prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            match rest.split_once('/') {
                Some((head, _)) => {
                    entries.insert(DirEntry {
                        name: head.to_string(),
                        is_dir: true,
                    });
                }
                None => {
                    entries.insert(DirEntry {
                        name: rest.to_string(),
                        is_dir: explicit_dir,
                    });
                }
            }
        }
        Ok(entries.into_iter().collect())
    }
}

impl WriteFs for MemFs {
    fn as_read(&self) -> &dyn ReadFs {
        self
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), FsError> {
        self.state().store(paths::normalize(path), bytes);
        Ok(())
    }

    fn create_new(&self, path: &str, bytes: &[u8]) -> Result<(), FsError> {
        let key = paths::normalize(path);
        let mut inner = self.state();
        if inner.no_exclusive_create {
            return Err(FsError::Unsupported { op: "create_new" });
        }
        if inner.files.contains_key(&key) {
            return Err(FsError::AlreadyExists(key));
        }
        inner.store(key, bytes);
        Ok(())
    }

    fn remove_file(&self, path: &str) -> Result<(), FsError> {
        let key = paths::normalize(path);
        let mut inner = self.state();
        if inner.fail_remove.contains(&key) {
            return Err(FsError::Io {
                path: key,
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected remove failure"),
            });
        }
        match inner.files.remove(&key) {
            Some(_) => {
                inner.mutations += 1;
                Ok(())
            }
            None => Err(FsError::NotFound(key)),
        }
    }

    fn remove_dir(&self, path: &str) -> Result<(), FsError> {
        let key = paths::normalize(path);
        let mut inner = self.state();
        if !inner.is_dir(&key) {
            return Err(FsError::NotADirectory(key));
        }
        let prefix = format!("{key}/");
        if inner.files.keys().any(|k| k.starts_with(&prefix))
            || inner.dirs.iter().any(|d| d.starts_with(&prefix))
        {
            return Err(FsError::DirectoryNotEmpty(key));
        }
        inner.dirs.remove(&key);
        inner.mutations += 1;
        Ok(())
    }

    fn set_times(
        &self,
        path: &str,
        created: UtcTimestamp,
        updated: UtcTimestamp,
    ) -> Result<(), FsError> {
        let key = paths::normalize(path);
        let mut inner = self.state();
        let file = inner
            .files
            .get_mut(&key)
            .ok_or(FsError::NotFound(key.clone()))?;
        file.created = created;
        file.updated = updated;
        inner.mutations += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_implicit() {
        let fs = MemFs::new().with_file("en/blog/a.md", b"a");
        assert!(fs.is_dir("en"));
        assert!(fs.is_dir("en/blog"));
        assert!(!fs.is_dir("en/blog/a.md"));
        assert!(fs.is_dir(""));
    }

    #[test]
    fn list_dir_returns_immediate_children() {
        let fs = MemFs::new()
            .with_file("en/a.md", b"a")
            .with_file("en/blog/b.md", b"b")
            .with_dir("en/empty");
        let entries = fs.list_dir("en").unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry { name: "a.md".into(), is_dir: false },
                DirEntry { name: "blog".into(), is_dir: true },
                DirEntry { name: "empty".into(), is_dir: true },
            ]
        );
    }

    #[test]
    fn overwrite_keeps_created_time() {
        let fs = MemFs::new();
        fs.write("a.md", b"1").unwrap();
        let first = fs.stat("a.md").unwrap();
        fs.write("a.md", b"2").unwrap();
        let second = fs.stat("a.md").unwrap();
        assert_eq!(first.created, second.created);
        assert_ne!(first.shasum, second.shasum);
    }

    #[test]
    fn corrupt_writes_change_bytes() {
        let fs = MemFs::new();
        fs.corrupt_writes(true);
        fs.write("a.md", b"abc").unwrap();
        assert_ne!(fs.read("a.md").unwrap(), b"abc");
    }

    #[test]
    fn exclusive_create_can_be_disabled() {
        let fs = MemFs::new();
        fs.disable_exclusive_create();
        assert!(matches!(
            fs.create_new("a", b"x").unwrap_err(),
            FsError::Unsupported { .. }
        ));
    }

    #[test]
    fn remove_dir_requires_empty() {
        let fs = MemFs::new().with_file("d/a.md", b"a").with_dir("e");
        assert!(matches!(
            fs.remove_dir("d").unwrap_err(),
            FsError::DirectoryNotEmpty(_)
        ));
        fs.remove_dir("e").unwrap();
        assert!(!fs.exists("e"));
    }

    #[test]
    fn builders_do_not_count_as_mutations() {
        let fs = MemFs::new().with_file("a.md", b"a");
        assert_eq!(fs.mutations(), 0);
        fs.write("b.md", b"b").unwrap();
        assert_eq!(fs.mutations(), 1);
    }
}
