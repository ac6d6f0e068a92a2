//! core::ops::draft
//!
//! Sidecar draft holding a resource's unpublished content.
//!
//! # Architecture
//!
//! A draft is a file named `<path>.~draft` next to the resource. Its content
//! is the full candidate replacement (front matter and body). While a draft
//! exists it, not the canonical file, is authoritative for rendering and
//! further edits.
//!
//! # Invariants
//!
//! - Writes require a read-write mount and overwrite unconditionally
//! - `remove` succeeds when the draft is already absent
//! - `publish_into` runs read, canonical write and draft removal in order
//!   with no rollback between them; a failure after the canonical write
//!   leaves both files in place and is reported as [`DraftError::Remove`]

use thiserror::Error;
use tracing::{debug, info};

use crate::core::identity::ResourceIdentity;
use crate::core::paths::Sidecar;
use crate::mount::{FsError, MountError, MountTable};

/// Errors from draft operations.
#[derive(Debug, Error)]
pub enum DraftError {
    /// No draft exists for the resource.
    #[error("draft not found: {0}")]
    NotFound(String),

    /// The resource has no read-write mount, or its filesystem is unknown.
    #[error(transparent)]
    Mount(#[from] MountError),

    /// Reading or writing the draft failed.
    #[error("draft file error: {0}")]
    Fs(#[from] FsError),

    /// The canonical write during promotion failed; nothing changed.
    #[error("writing {resource} failed: {source}")]
    Promote {
        /// Resource address.
        resource: String,
        /// Underlying failure.
        #[source]
        source: FsError,
    },

    /// The canonical file was written but the draft could not be removed.
    #[error("published {resource} but could not remove its draft: {source}")]
    Remove {
        /// Resource address.
        resource: String,
        /// Underlying failure.
        #[source]
        source: FsError,
    },
}

/// Draft operations over a mount table.
#[derive(Debug, Clone, Copy)]
pub struct DraftManager<'a> {
    mounts: &'a MountTable,
}

impl<'a> DraftManager<'a> {
    /// Create a manager.
    pub fn new(mounts: &'a MountTable) -> Self {
        Self { mounts }
    }

    /// Whether a draft exists.
    pub fn exists(&self, id: &ResourceIdentity) -> bool {
        self.mounts.exists(&id.fsid, &id.sidecar_path(Sidecar::Draft))
    }

    /// Read the draft.
    pub fn read(&self, id: &ResourceIdentity) -> Result<Vec<u8>, DraftError> {
        let path = id.sidecar_path(Sidecar::Draft);
        if !self.mounts.exists(&id.fsid, &path) {
            return Err(DraftError::NotFound(id.canonical()));
        }
        match self.mounts.resolve(&id.fsid, &path)?.read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.is_not_found() => Err(DraftError::NotFound(id.canonical())),
            Err(e) => Err(e.into()),
        }
    }

    /// The draft if present, otherwise the canonical content.
    pub fn read_current(&self, id: &ResourceIdentity) -> Result<Vec<u8>, DraftError> {
        match self.read(id) {
            Err(DraftError::NotFound(_)) => {
                let path = id.file_path();
                Ok(self.mounts.resolve(&id.fsid, &path)?.read(&path)?)
            }
            other => other,
        }
    }

    /// Write the draft (last writer wins).
    pub fn write(&self, id: &ResourceIdentity, bytes: &[u8]) -> Result<(), DraftError> {
        let w = self.mounts.writable_for(id)?;
        w.write(&id.sidecar_path(Sidecar::Draft), bytes)?;
        info!(resource = %id, size = bytes.len(), "draft written");
        Ok(())
    }

    /// Remove the draft. Succeeds if there is none.
    pub fn remove(&self, id: &ResourceIdentity) -> Result<(), DraftError> {
        let path = id.sidecar_path(Sidecar::Draft);
        if !self.mounts.exists(&id.fsid, &path) {
            debug!(resource = %id, "no draft to remove");
            return Ok(());
        }
        let w = self.mounts.writable(&id.fsid, &path)?;
        match w.remove_file(&path) {
            Ok(()) => {
                info!(resource = %id, "draft removed");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Hand the draft to `write_canonical`, then remove the draft.
    ///
    /// Returns the promoted bytes.
    pub fn publish_into<F>(
        &self,
        id: &ResourceIdentity,
        write_canonical: F,
    ) -> Result<Vec<u8>, DraftError>
    where
        F: FnOnce(&[u8]) -> Result<(), FsError>,
    {
        let bytes = self.read(id)?;
        write_canonical(&bytes).map_err(|source| DraftError::Promote {
            resource: id.canonical(),
            source,
        })?;
        self.remove(id).map_err(|e| match e {
            DraftError::Fs(source) => DraftError::Remove {
                resource: id.canonical(),
                source,
            },
            other => other,
        })?;
        Ok(bytes)
    }
}
