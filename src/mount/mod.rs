//! mount
//!
//! Mount point abstraction: named path prefixes exposing a read view and an
//! optional read-write view.
//!
//! # Architecture
//!
//! The workflow engine never touches a filesystem directly. It resolves a
//! [`ResourceIdentity`] against the [`MountTable`] and receives either a
//! [`MountPoint`] (read) or a [`WritableMount`] (write). A `WritableMount`
//! can only be obtained from a mount whose [`Access`] is `ReadWrite`, so the
//! absence of write capability is a state the type system tracks rather
//! than a nil check at each call site.
//!
//! # Invariants
//!
//! - A resource is mutable only if some mount covering its path is
//!   read-write; otherwise resolution fails with [`MountError::ReadOnly`]
//! - An unknown filesystem id is [`MountError::FsNotFound`], a distinct
//!   condition from read-only
//! - Mount points are consulted in registration order
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use editflow::core::identity::ResourceIdentity;
//! use editflow::core::types::FsId;
//! use editflow::mount::{MountError, MountPoint, MountTable};
//! use editflow::mount::memory::MemFs;
//!
//! let fs = Arc::new(MemFs::new().with_file("en/about.md", b"hi"));
//! let mut table = MountTable::new();
//! table.add(MountPoint::read_only(FsId::new("archive").unwrap(), "", fs.clone()));
//! table.add(MountPoint::read_write(FsId::new("content").unwrap(), "", fs.clone(), fs));
//!
//! let live = ResourceIdentity::parse("content", "en", "about.md").unwrap();
//! assert!(table.writable_for(&live).is_ok());
//!
//! let archived = ResourceIdentity::parse("archive", "en", "about.md").unwrap();
//! assert!(matches!(table.writable_for(&archived), Err(MountError::ReadOnly { .. })));
//! ```

pub mod local;
pub mod memory;
pub mod traits;

pub use local::LocalFs;
pub use memory::MemFs;
pub use traits::{DirEntry, FileStat, FsError, ReadFs, WriteFs};

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::identity::ResourceIdentity;
use crate::core::paths;
use crate::core::types::{FsId, UtcTimestamp};

/// Errors from mount resolution.
#[derive(Debug, Error)]
pub enum MountError {
    /// No mount group is registered under the filesystem id.
    #[error("filesystem not found: {0}")]
    FsNotFound(String),

    /// No mount point's prefix covers the path.
    #[error("no mount point of {fsid} covers {path}")]
    Uncovered {
        /// Filesystem id.
        fsid: String,
        /// Path that was requested.
        path: String,
    },

    /// The covering mount points are all read-only.
    #[error("filesystem {fsid} is read-only at {path}")]
    ReadOnly {
        /// Filesystem id.
        fsid: String,
        /// Path that was requested.
        path: String,
    },

    /// A filesystem view failed.
    #[error(transparent)]
    Fs(#[from] FsError),
}

/// Access capability of a mount point.
#[derive(Debug, Clone)]
pub enum Access {
    /// Only a read view is available.
    ReadOnly {
        /// Read view.
        ro: Arc<dyn ReadFs>,
    },
    /// A read view layered under a read-write view.
    ReadWrite {
        /// Read view.
        ro: Arc<dyn ReadFs>,
        /// Read-write view; consulted first for reads.
        rw: Arc<dyn WriteFs>,
    },
}

/// Whether both views are the same store.
fn shares_backend(ro: &Arc<dyn ReadFs>, rw: &Arc<dyn WriteFs>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(ro), Arc::as_ptr(rw))
}

/// A named prefix within a filesystem id.
#[derive(Debug, Clone)]
pub struct MountPoint {
    /// Filesystem id this mount belongs to.
    pub fsid: FsId,
    /// Path prefix the mount covers; empty covers everything.
    pub prefix: String,
    access: Access,
}

impl MountPoint {
    /// A mount with only a read view.
    pub fn read_only(fsid: FsId, prefix: &str, ro: Arc<dyn ReadFs>) -> Self {
        Self {
            fsid,
            prefix: paths::normalize(prefix),
            access: Access::ReadOnly { ro },
        }
    }

    /// A mount with a read view and a read-write view.
    pub fn read_write(
        fsid: FsId,
        prefix: &str,
        ro: Arc<dyn ReadFs>,
        rw: Arc<dyn WriteFs>,
    ) -> Self {
        Self {
            fsid,
            prefix: paths::normalize(prefix),
            access: Access::ReadWrite { ro, rw },
        }
    }

    /// The access capability.
    pub fn access(&self) -> &Access {
        &self.access
    }

    /// Whether this mount's prefix covers `path`.
    pub fn covers(&self, path: &str) -> bool {
        paths::covers(&self.prefix, path)
    }

    /// Whether this mount exposes a read-write view.
    pub fn is_writable(&self) -> bool {
        matches!(self.access, Access::ReadWrite { .. })
    }

    /// The write capability, if this mount has one.
    pub fn writable(&self) -> Option<WritableMount<'_>> {
        match &self.access {
            Access::ReadWrite { rw, .. } => Some(WritableMount {
                mount: self,
                rw: rw.as_ref(),
            }),
            Access::ReadOnly { .. } => None,
        }
    }

    /// Map a filesystem-relative path to a view-relative path.
    fn inner(&self, path: &str) -> String {
        let path = paths::normalize(path);
        if self.prefix.is_empty() {
            return path;
        }
        match path.strip_prefix(&self.prefix) {
            Some(rest) => paths::normalize(rest),
            None => path,
        }
    }

    /// The view that holds `path`: the read-write layer if it has the path,
    /// otherwise the read layer.
    fn view_for(&self, inner: &str) -> &dyn ReadFs {
        match &self.access {
            Access::ReadOnly { ro } => ro.as_ref(),
            Access::ReadWrite { ro, rw } => {
                if rw.exists(inner) || !ro.exists(inner) {
                    rw.as_read()
                } else {
                    ro.as_ref()
                }
            }
        }
    }

    /// Whether a file or directory exists at `path`.
    pub fn exists(&self, path: &str) -> bool {
        let inner = self.inner(path);
        self.view_for(&inner).exists(&inner)
    }

    /// Whether `path` is a directory in either layer.
    pub fn is_dir(&self, path: &str) -> bool {
        let inner = self.inner(path);
        match &self.access {
            Access::ReadOnly { ro } => ro.is_dir(&inner),
            Access::ReadWrite { ro, rw } => rw.is_dir(&inner) || ro.is_dir(&inner),
        }
    }

    /// Read a file.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let inner = self.inner(path);
        self.view_for(&inner).read(&inner)
    }

    /// Stat a file. The returned stat carries the filesystem-relative path.
    pub fn stat(&self, path: &str) -> Result<FileStat, FsError> {
        let inner = self.inner(path);
        let mut stat = self.view_for(&inner).stat(&inner)?;
        stat.path = paths::normalize(path);
        Ok(stat)
    }

    /// List a directory, merging both layers.
    pub fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let inner = self.inner(path);
        match &self.access {
            Access::ReadOnly { ro } => ro.list_dir(&inner),
            Access::ReadWrite { ro, rw } => {
                let mut merged = std::collections::BTreeSet::new();
                let mut found = false;
                for view in [ro.as_ref(), rw.as_read()] {
                    match view.list_dir(&inner) {
                        Ok(entries) => {
                            found = true;
                            merged.extend(entries);
                        }
                        Err(FsError::NotADirectory(_)) | Err(FsError::NotFound(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
                if !found {
                    return Err(FsError::NotADirectory(paths::normalize(path)));
                }
                Ok(merged.into_iter().collect())
            }
        }
    }
}

/// Proof of write access to a mount point.
///
/// All mutating calls in the engine go through this handle.
#[derive(Debug, Clone, Copy)]
pub struct WritableMount<'a> {
    mount: &'a MountPoint,
    rw: &'a dyn WriteFs,
}

impl<'a> WritableMount<'a> {
    /// The underlying mount point (for reads).
    pub fn mount(&self) -> &'a MountPoint {
        self.mount
    }

    /// Read a file through the mount's layered view.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        self.mount.read(path)
    }

    /// Whether a file exists through the mount's layered view.
    pub fn exists(&self, path: &str) -> bool {
        self.mount.exists(path)
    }

    /// Whether removing `path` from the write layer would make it disappear.
    ///
    /// False when the file lives only in a separate read layer, or when a
    /// separate read layer holds a copy that would show through.
    pub fn holds(&self, path: &str) -> bool {
        let inner = self.mount.inner(path);
        if !self.rw.exists(&inner) {
            return false;
        }
        match &self.mount.access {
            Access::ReadWrite { ro, rw } => shares_backend(ro, rw) || !ro.exists(&inner),
            Access::ReadOnly { .. } => false,
        }
    }

    /// Stat a file as the write layer sees it.
    ///
    /// Used after a write to verify what actually landed.
    pub fn stat_written(&self, path: &str) -> Result<FileStat, FsError> {
        let mut stat = self.rw.stat(&self.mount.inner(path))?;
        stat.path = paths::normalize(path);
        Ok(stat)
    }

    /// Write a file (last writer wins).
    pub fn write(&self, path: &str, bytes: &[u8]) -> Result<(), FsError> {
        self.rw.write(&self.mount.inner(path), bytes)
    }

    /// Create a file only if absent.
    pub fn create_new(&self, path: &str, bytes: &[u8]) -> Result<(), FsError> {
        self.rw.create_new(&self.mount.inner(path), bytes)
    }

    /// Remove a file from the write layer.
    pub fn remove_file(&self, path: &str) -> Result<(), FsError> {
        self.rw.remove_file(&self.mount.inner(path))
    }

    /// Remove an empty directory from the write layer.
    pub fn remove_dir(&self, path: &str) -> Result<(), FsError> {
        self.rw.remove_dir(&self.mount.inner(path))
    }

    /// Re-apply timestamps.
    pub fn set_times(
        &self,
        path: &str,
        created: UtcTimestamp,
        updated: UtcTimestamp,
    ) -> Result<(), FsError> {
        self.rw.set_times(&self.mount.inner(path), created, updated)
    }
}

/// All mount points, grouped by filesystem id.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    mounts: BTreeMap<FsId, Vec<MountPoint>>,
}

impl MountTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mount point. Earlier registrations take precedence.
    pub fn add(&mut self, mount: MountPoint) {
        self.mounts.entry(mount.fsid.clone()).or_default().push(mount);
    }

    /// Builder form of [`MountTable::add`].
    pub fn with(mut self, mount: MountPoint) -> Self {
        self.add(mount);
        self
    }

    /// Registered filesystem ids.
    pub fn fsids(&self) -> impl Iterator<Item = &FsId> {
        self.mounts.keys()
    }

    /// Whether a filesystem id is registered.
    pub fn contains(&self, fsid: &FsId) -> bool {
        self.mounts.contains_key(fsid)
    }

    fn group(&self, fsid: &FsId) -> Result<&[MountPoint], MountError> {
        self.mounts
            .get(fsid)
            .map(Vec::as_slice)
            .ok_or_else(|| MountError::FsNotFound(fsid.to_string()))
    }

    /// The mount to read `path` from: the first covering mount that has the
    /// path, else the first covering mount.
    pub fn resolve(&self, fsid: &FsId, path: &str) -> Result<&MountPoint, MountError> {
        let covering: Vec<&MountPoint> = self
            .group(fsid)?
            .iter()
            .filter(|m| m.covers(path))
            .collect();
        covering
            .iter()
            .find(|m| m.exists(path))
            .or_else(|| covering.first())
            .copied()
            .ok_or_else(|| MountError::Uncovered {
                fsid: fsid.to_string(),
                path: path.to_string(),
            })
    }

    /// The first read-write mount covering `path`.
    pub fn writable(&self, fsid: &FsId, path: &str) -> Result<WritableMount<'_>, MountError> {
        let group = self.group(fsid)?;
        let mut covered = false;
        for mount in group.iter().filter(|m| m.covers(path)) {
            covered = true;
            if let Some(w) = mount.writable() {
                return Ok(w);
            }
        }
        if covered {
            Err(MountError::ReadOnly {
                fsid: fsid.to_string(),
                path: path.to_string(),
            })
        } else {
            Err(MountError::Uncovered {
                fsid: fsid.to_string(),
                path: path.to_string(),
            })
        }
    }

    /// Whether any covering mount has `path`.
    pub fn exists(&self, fsid: &FsId, path: &str) -> bool {
        self.group(fsid)
            .map(|g| g.iter().any(|m| m.covers(path) && m.exists(path)))
            .unwrap_or(false)
    }

    /// Resolve the read mount for a resource's canonical file.
    pub fn resolve_for(&self, id: &ResourceIdentity) -> Result<&MountPoint, MountError> {
        self.resolve(&id.fsid, &id.file_path())
    }

    /// Resolve the write mount for a resource's canonical file.
    pub fn writable_for(&self, id: &ResourceIdentity) -> Result<WritableMount<'_>, MountError> {
        self.writable(&id.fsid, &id.file_path())
    }

    /// Whether a resource's canonical file exists (and is not a directory).
    pub fn resource_exists(&self, id: &ResourceIdentity) -> bool {
        let path = id.file_path();
        !path.is_empty()
            && self.exists(&id.fsid, &path)
            && self
                .resolve(&id.fsid, &path)
                .map(|m| !m.is_dir(&path))
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fsid(s: &str) -> FsId {
        FsId::new(s).unwrap()
    }

    #[test]
    fn unknown_fsid_is_distinct_from_read_only() {
        let table = MountTable::new().with(MountPoint::read_only(
            fsid("content"),
            "",
            Arc::new(MemFs::new()),
        ));
        assert!(matches!(
            table.writable(&fsid("other"), "a.md"),
            Err(MountError::FsNotFound(_))
        ));
        assert!(matches!(
            table.writable(&fsid("content"), "a.md"),
            Err(MountError::ReadOnly { .. })
        ));
    }

    #[test]
    fn holds_needs_the_write_layer_alone() {
        let shared = Arc::new(MemFs::new().with_file("en/a.md", b"a"));
        let mount = MountPoint::read_write(fsid("content"), "", shared.clone(), shared);
        assert!(mount.writable().unwrap().holds("en/a.md"));
        assert!(!mount.writable().unwrap().holds("en/b.md"));

        let base = Arc::new(
            MemFs::new()
                .with_file("en/base.md", b"b")
                .with_file("en/both.md", b"b"),
        );
        let overlay = Arc::new(
            MemFs::new()
                .with_file("en/both.md", b"o")
                .with_file("en/mine.md", b"o"),
        );
        let mount = MountPoint::read_write(fsid("content"), "", base, overlay);
        let w = mount.writable().unwrap();
        assert!(mount.exists("en/base.md"));
        assert!(!w.holds("en/base.md"));
        assert!(!w.holds("en/both.md"));
        assert!(w.holds("en/mine.md"));
    }

    #[test]
    fn later_read_write_mount_makes_path_writable() {
        let fs = Arc::new(MemFs::new());
        let table = MountTable::new()
            .with(MountPoint::read_only(fsid("content"), "", fs.clone()))
            .with(MountPoint::read_write(fsid("content"), "en", fs.clone(), fs));
        assert!(table.writable(&fsid("content"), "en/a.md").is_ok());
        assert!(matches!(
            table.writable(&fsid("content"), "fr/a.md"),
            Err(MountError::ReadOnly { .. })
        ));
    }

    #[test]
    fn prefix_is_stripped_for_the_view() {
        let fs = Arc::new(MemFs::new());
        let table = MountTable::new().with(MountPoint::read_write(
            fsid("themes"),
            "dark",
            fs.clone(),
            fs.clone(),
        ));
        let w = table.writable(&fsid("themes"), "dark/style.css").unwrap();
        w.write("dark/style.css", b"body{}").unwrap();
        assert!(fs.exists("style.css"));
        assert_eq!(w.read("dark/style.css").unwrap(), b"body{}");
    }

    #[test]
    fn read_write_layer_shadows_read_layer() {
        let base = Arc::new(MemFs::new().with_file("a.md", b"base"));
        let overlay = Arc::new(MemFs::new());
        let mount = MountPoint::read_write(fsid("content"), "", base, overlay.clone());
        assert_eq!(mount.read("a.md").unwrap(), b"base");
        mount.writable().unwrap().write("a.md", b"edited").unwrap();
        assert_eq!(mount.read("a.md").unwrap(), b"edited");
    }

    #[test]
    fn list_dir_merges_layers() {
        let base = Arc::new(MemFs::new().with_file("en/a.md", b"a"));
        let overlay = Arc::new(MemFs::new().with_file("en/b.md", b"b"));
        let mount = MountPoint::read_write(fsid("content"), "", base, overlay);
        let names: Vec<_> = mount
            .list_dir("en")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }

    #[test]
    fn resource_exists_ignores_directories() {
        let fs = Arc::new(MemFs::new().with_file("en/blog/a.md", b"a"));
        let table = MountTable::new().with(MountPoint::read_write(
            fsid("content"),
            "",
            fs.clone(),
            fs,
        ));
        let file = ResourceIdentity::parse("content", "en", "blog/a.md").unwrap();
        let dir = ResourceIdentity::parse("content", "en", "blog").unwrap();
        assert!(table.resource_exists(&file));
        assert!(!table.resource_exists(&dir));
    }
}
