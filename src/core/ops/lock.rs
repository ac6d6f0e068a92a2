//! core::ops::lock
//!
//! Sidecar lock giving one editor exclusive write intent over a resource.
//!
//! # Architecture
//!
//! A lock is a file named `<path>.~lock` next to the resource, holding the
//! raw editor id of the holder with no envelope. Presence means locked;
//! absence means unlocked. Ownership is an exact match of the file content
//! against the caller's editor id.
//!
//! Locks are not tied to a process or a request. They persist until
//! released, retaken, or removed with the resource, because they model a
//! human editing session that spans many requests.
//!
//! # Acquisition
//!
//! Under [`LockPolicy::Exclusive`] the lock file is created with
//! [`WriteFs::create_new`](crate::mount::WriteFs::create_new), so two
//! editors racing for a free resource cannot both win. Backends that report
//! `Unsupported` fall back to the advisory sequence.
//!
//! Under [`LockPolicy::Advisory`] acquisition is "read holder, then write
//! holder". Two concurrent acquires can both pass the check and the later
//! write wins. This window is accepted for a low-concurrency workload.
//!
//! # Invariants
//!
//! - Acquire requires a read-write mount and an existing canonical resource
//! - Acquire is idempotent for the current holder
//! - A lock file whose content is not a well-formed editor id reads as
//!   unlocked, and the next acquire overwrites it
//! - Release never checks ownership; callers do
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use editflow::core::identity::ResourceIdentity;
//! use editflow::core::ops::lock::{LockManager, LockPolicy};
//! use editflow::core::types::{EditorId, FsId};
//! use editflow::mount::{MemFs, MountPoint, MountTable};
//!
//! let fs = Arc::new(MemFs::new().with_file("en/about.md", b"hi"));
//! let table = MountTable::new().with(MountPoint::read_write(
//!     FsId::new("content").unwrap(), "", fs.clone(), fs,
//! ));
//! let locks = LockManager::new(&table, LockPolicy::Exclusive);
//! let id = ResourceIdentity::parse("content", "en", "about.md").unwrap();
//! let alice = EditorId::new("alice").unwrap();
//! let bob = EditorId::new("bob").unwrap();
//!
//! locks.acquire(&alice, &id).unwrap();
//! assert!(locks.acquire(&bob, &id).is_err());
//! assert!(locks.is_locked_by_other(&id, &bob).unwrap());
//! ```

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::identity::ResourceIdentity;
use crate::core::paths::Sidecar;
use crate::core::types::EditorId;
use crate::mount::{FsError, MountError, MountTable, WritableMount};

/// Errors from lock operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// The resource has no read-write mount, or its filesystem is unknown.
    #[error(transparent)]
    Mount(#[from] MountError),

    /// The canonical resource does not exist.
    #[error("resource not found: {0}")]
    ResourceMissing(String),

    /// Another editor holds the lock.
    #[error("{resource} is locked by another user ({holder})")]
    LockedByOther {
        /// Resource address.
        resource: String,
        /// Current holder.
        holder: EditorId,
    },

    /// The lock file could not be read, written or removed.
    #[error("lock file error: {0}")]
    Fs(#[from] FsError),
}

/// How the lock file is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPolicy {
    /// Atomic create-if-absent where the backend supports it.
    #[default]
    Exclusive,
    /// Check the holder, then write.
    Advisory,
}

/// Result of reading a lock sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockStatus {
    /// The current holder, if the resource is locked.
    pub holder: Option<EditorId>,
}

impl LockStatus {
    /// Whether any editor holds the lock.
    pub fn locked(&self) -> bool {
        self.holder.is_some()
    }

    /// Whether `editor` holds the lock.
    pub fn is_held_by(&self, editor: &EditorId) -> bool {
        self.holder.as_ref() == Some(editor)
    }

    /// Whether the lock is held by someone other than `editor`.
    pub fn is_locked_by_other(&self, editor: &EditorId) -> bool {
        self.locked() && !self.is_held_by(editor)
    }
}

/// Lock operations over a mount table.
#[derive(Debug, Clone, Copy)]
pub struct LockManager<'a> {
    mounts: &'a MountTable,
    policy: LockPolicy,
}

impl<'a> LockManager<'a> {
    /// Create a manager.
    pub fn new(mounts: &'a MountTable, policy: LockPolicy) -> Self {
        Self { mounts, policy }
    }

    /// The acquisition policy.
    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Read the lock sidecar.
    ///
    /// A missing sidecar, an unknown filesystem, or malformed content all
    /// read as unlocked.
    pub fn status(&self, id: &ResourceIdentity) -> Result<LockStatus, LockError> {
        let path = id.sidecar_path(Sidecar::Lock);
        if !self.mounts.exists(&id.fsid, &path) {
            return Ok(LockStatus::default());
        }
        let mount = self.mounts.resolve(&id.fsid, &path)?;
        let content = match mount.read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(LockStatus::default()),
            Err(e) => return Err(e.into()),
        };
        let holder = EditorId::from_lock_content(&content);
        if holder.is_none() {
            debug!(resource = %id, "ignoring malformed lock file");
        }
        Ok(LockStatus { holder })
    }

    /// Whether the resource is locked by someone other than `caller`.
    pub fn is_locked_by_other(
        &self,
        id: &ResourceIdentity,
        caller: &EditorId,
    ) -> Result<bool, LockError> {
        Ok(self.status(id)?.is_locked_by_other(caller))
    }

    /// Take the lock for `editor`.
    ///
    /// # Errors
    ///
    /// - [`LockError::Mount`] if no read-write mount covers the resource
    /// - [`LockError::ResourceMissing`] if the canonical file does not exist
    /// - [`LockError::LockedByOther`] if a different editor holds the lock
    pub fn acquire(&self, editor: &EditorId, id: &ResourceIdentity) -> Result<(), LockError> {
        let w = self.prepare(id)?;
        let lock_path = id.sidecar_path(Sidecar::Lock);

        if self.policy == LockPolicy::Exclusive {
            match w.create_new(&lock_path, editor.as_str().as_bytes()) {
                Ok(()) => {
                    info!(resource = %id, editor = %editor, "lock acquired");
                    return Ok(());
                }
                Err(FsError::AlreadyExists(_)) => {
                    // Someone has a lock file; fall through to inspect it.
                }
                Err(FsError::Unsupported { .. }) => {
                    debug!(resource = %id, "exclusive create unsupported, using advisory lock");
                }
                Err(e) => return Err(e.into()),
            }
        }

        if self.check_free(editor, id)? {
            debug!(resource = %id, editor = %editor, "lock already held by caller");
            return Ok(());
        }
        self.write_holder(w, &lock_path, editor)?;
        info!(resource = %id, editor = %editor, "lock acquired");
        Ok(())
    }

    /// Overwrite the lock with `editor` regardless of the current holder.
    pub fn retake(&self, editor: &EditorId, id: &ResourceIdentity) -> Result<(), LockError> {
        let w = self.prepare(id)?;
        let previous = self.status(id)?.holder;
        self.write_holder(w, &id.sidecar_path(Sidecar::Lock), editor)?;
        match previous {
            Some(prev) if &prev != editor => {
                warn!(resource = %id, editor = %editor, previous = %prev, "lock retaken")
            }
            _ => info!(resource = %id, editor = %editor, "lock acquired"),
        }
        Ok(())
    }

    /// Remove the lock sidecar. A no-op if the resource is not locked.
    ///
    /// Does not check ownership.
    pub fn release(&self, id: &ResourceIdentity) -> Result<(), LockError> {
        let lock_path = id.sidecar_path(Sidecar::Lock);
        if !self.mounts.exists(&id.fsid, &lock_path) {
            return Ok(());
        }
        let w = self.mounts.writable(&id.fsid, &lock_path)?;
        match w.remove_file(&lock_path) {
            Ok(()) => {
                info!(resource = %id, "lock released");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn prepare(&self, id: &ResourceIdentity) -> Result<WritableMount<'a>, LockError> {
        let w = self.mounts.writable_for(id)?;
        if !self.mounts.resource_exists(id) {
            return Err(LockError::ResourceMissing(id.canonical()));
        }
        Ok(w)
    }

    /// The check half of the advisory sequence.
    ///
    /// Returns `Ok(true)` if `editor` already holds the lock and `Ok(false)`
    /// if the lock is free (or malformed).
    fn check_free(&self, editor: &EditorId, id: &ResourceIdentity) -> Result<bool, LockError> {
        let status = self.status(id)?;
        match status.holder {
            Some(holder) if &holder == editor => Ok(true),
            Some(holder) => Err(LockError::LockedByOther {
                resource: id.canonical(),
                holder,
            }),
            None => Ok(false),
        }
    }

    /// The write half of the advisory sequence.
    fn write_holder(
        &self,
        w: WritableMount<'_>,
        lock_path: &str,
        editor: &EditorId,
    ) -> Result<(), LockError> {
        w.write(lock_path, editor.as_str().as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FsId;
    use crate::mount::{MemFs, MountPoint, ReadFs};
    use std::sync::Arc;

    fn editor(s: &str) -> EditorId {
        EditorId::new(s).expect("valid editor id")
    }

    fn setup(fs: MemFs) -> (Arc<MemFs>, MountTable) {
        let fs = Arc::new(fs);
        let table = MountTable::new().with(MountPoint::read_write(
            FsId::new("content").expect("fsid"),
            "",
            fs.clone(),
            fs.clone(),
        ));
        (fs, table)
    }

    fn about() -> ResourceIdentity {
        ResourceIdentity::parse("content", "en", "about.md").expect("identity")
    }

    #[test]
    fn acquire_writes_raw_editor_id() {
        let (fs, table) = setup(MemFs::new().with_file("en/about.md", b"x"));
        let locks = LockManager::new(&table, LockPolicy::Exclusive);
        locks.acquire(&editor("alice"), &about()).expect("acquire");
        assert_eq!(fs.read("en/about.md.~lock").expect("read lock"), b"alice");
    }

    #[test]
    fn acquire_is_idempotent_for_holder() {
        let (_fs, table) = setup(MemFs::new().with_file("en/about.md", b"x"));
        for policy in [LockPolicy::Exclusive, LockPolicy::Advisory] {
            let locks = LockManager::new(&table, policy);
            locks.acquire(&editor("alice"), &about()).expect("first");
            locks.acquire(&editor("alice"), &about()).expect("second");
            locks.release(&about()).expect("release");
        }
    }

    #[test]
    fn other_editor_sees_lock_after_failed_acquire() {
        let (_fs, table) = setup(MemFs::new().with_file("en/about.md", b"x"));
        for policy in [LockPolicy::Exclusive, LockPolicy::Advisory] {
            let locks = LockManager::new(&table, policy);
            let (a, b) = (editor("alice"), editor("bob"));
            locks.acquire(&a, &about()).expect("alice acquires");

            let err = locks.acquire(&b, &about()).unwrap_err();
            match err {
                LockError::LockedByOther { holder, .. } => assert_eq!(holder, a),
                other => panic!("expected LockedByOther, got {other:?}"),
            }
            assert!(locks.is_locked_by_other(&about(), &b).expect("status"));
            assert!(!locks.is_locked_by_other(&about(), &a).expect("status"));
            locks.release(&about()).expect("release");
        }
    }

    #[test]
    fn acquire_requires_existing_resource() {
        let (_fs, table) = setup(MemFs::new());
        let locks = LockManager::new(&table, LockPolicy::Exclusive);
        assert!(matches!(
            locks.acquire(&editor("alice"), &about()),
            Err(LockError::ResourceMissing(_))
        ));
    }

    #[test]
    fn acquire_on_read_only_mount_fails_without_writing() {
        let fs = Arc::new(MemFs::new().with_file("en/about.md", b"x"));
        let table = MountTable::new().with(MountPoint::read_only(
            FsId::new("content").expect("fsid"),
            "",
            fs.clone(),
        ));
        let locks = LockManager::new(&table, LockPolicy::Exclusive);
        assert!(matches!(
            locks.acquire(&editor("alice"), &about()),
            Err(LockError::Mount(MountError::ReadOnly { .. }))
        ));
        assert_eq!(fs.mutations(), 0);
    }

    #[test]
    fn malformed_lock_reads_as_unlocked_and_is_overwritten() {
        let (fs, table) = setup(
            MemFs::new()
                .with_file("en/about.md", b"x")
                .with_file("en/about.md.~lock", b"not an id\n\n"),
        );
        let locks = LockManager::new(&table, LockPolicy::Exclusive);
        assert!(!locks.status(&about()).expect("status").locked());

        locks.acquire(&editor("bob"), &about()).expect("acquire");
        assert_eq!(fs.read("en/about.md.~lock").expect("read"), b"bob");
    }

    #[test]
    fn release_is_noop_when_unlocked() {
        let (fs, table) = setup(MemFs::new().with_file("en/about.md", b"x"));
        let locks = LockManager::new(&table, LockPolicy::Exclusive);
        locks.release(&about()).expect("release");
        assert_eq!(fs.mutations(), 0);
    }

    #[test]
    fn release_does_not_check_ownership() {
        let (fs, table) = setup(MemFs::new().with_file("en/about.md", b"x"));
        let locks = LockManager::new(&table, LockPolicy::Exclusive);
        locks.acquire(&editor("alice"), &about()).expect("acquire");
        locks.release(&about()).expect("release");
        assert!(!fs.exists("en/about.md.~lock"));
    }

    #[test]
    fn release_failure_is_reported() {
        let (fs, table) = setup(MemFs::new().with_file("en/about.md", b"x"));
        let locks = LockManager::new(&table, LockPolicy::Exclusive);
        locks.acquire(&editor("alice"), &about()).expect("acquire");
        fs.fail_remove("en/about.md.~lock");
        assert!(matches!(locks.release(&about()), Err(LockError::Fs(_))));
        assert!(fs.exists("en/about.md.~lock"));
    }

    #[test]
    fn retake_overwrites_foreign_lock() {
        let (fs, table) = setup(MemFs::new().with_file("en/about.md", b"x"));
        let locks = LockManager::new(&table, LockPolicy::Exclusive);
        locks.acquire(&editor("alice"), &about()).expect("acquire");
        locks.retake(&editor("bob"), &about()).expect("retake");
        assert_eq!(fs.read("en/about.md.~lock").expect("read"), b"bob");
    }

    #[test]
    fn unsupported_exclusive_create_falls_back_to_advisory() {
        let (fs, table) = setup(MemFs::new().with_file("en/about.md", b"x"));
        fs.disable_exclusive_create();
        let locks = LockManager::new(&table, LockPolicy::Exclusive);
        locks.acquire(&editor("alice"), &about()).expect("acquire");
        assert!(locks.acquire(&editor("bob"), &about()).is_err());
    }

    /// Two editors interleave the advisory check and write. Both checks
    /// pass, both writes land, and the later writer ends up holding a lock
    /// the earlier one also believes it holds.
    #[test]
    fn advisory_acquire_has_a_race_window() {
        let (fs, table) = setup(MemFs::new().with_file("en/about.md", b"x"));
        let locks = LockManager::new(&table, LockPolicy::Advisory);
        let (a, b) = (editor("alice"), editor("bob"));
        let id = about();
        let lock_path = id.sidecar_path(Sidecar::Lock);
        let w = table.writable_for(&id).expect("writable");

        assert!(!locks.check_free(&a, &id).expect("alice check"));
        assert!(!locks.check_free(&b, &id).expect("bob check"));
        locks.write_holder(w, &lock_path, &a).expect("alice write");
        locks.write_holder(w, &lock_path, &b).expect("bob write");

        assert_eq!(fs.read(&lock_path).expect("read"), b"bob");
        assert!(locks.is_locked_by_other(&id, &a).expect("status"));
    }

    /// The same interleaving under the exclusive policy: the second create
    /// fails and the first holder keeps the lock.
    #[test]
    fn exclusive_acquire_closes_the_race_window() {
        let (fs, table) = setup(MemFs::new().with_file("en/about.md", b"x"));
        let locks = LockManager::new(&table, LockPolicy::Exclusive);
        let (a, b) = (editor("alice"), editor("bob"));
        let id = about();
        let lock_path = id.sidecar_path(Sidecar::Lock);
        let w = table.writable_for(&id).expect("writable");

        assert!(!locks.check_free(&a, &id).expect("alice check"));
        assert!(!locks.check_free(&b, &id).expect("bob check"));
        w.create_new(&lock_path, a.as_str().as_bytes())
            .expect("alice create");
        assert!(matches!(
            w.create_new(&lock_path, b.as_str().as_bytes()),
            Err(FsError::AlreadyExists(_))
        ));
        assert_eq!(fs.read(&lock_path).expect("read"), b"alice");
        assert!(matches!(
            locks.acquire(&b, &id),
            Err(LockError::LockedByOther { .. })
        ));
    }
}
