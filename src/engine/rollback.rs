//! Rollback of files created by a transfer.
//!
//! This module provides the undo step used by:
//! - the integrity check (destination read back with a different shasum)
//! - move, when the source lock cannot be released
//!
//! # Rollback Order
//!
//! Files are removed in reverse creation order. A file already gone counts
//! as rolled back. A failed removal does not stop the rest.
//!
//! # Known Limitations
//!
//! Only created files are tracked. Overwritten content is not restored; the
//! transfer protocol never overwrites, so this is only a concern for callers
//! outside it.

use thiserror::Error;
use tracing::{info, warn};

use crate::mount::{FsError, WritableMount};

/// Errors from rollback operations.
#[derive(Debug, Error)]
pub enum RollbackError {
    /// A created file could not be removed.
    #[error("could not remove {path}: {source}")]
    Remove {
        /// Path that is left behind.
        path: String,
        /// Underlying failure.
        #[source]
        source: FsError,
    },
}

/// Result of a rollback attempt.
#[derive(Debug)]
pub struct RollbackResult {
    /// Paths that were removed.
    pub rolled_back: Vec<String>,
    /// Paths that could not be removed, with their errors.
    pub failed: Vec<(String, RollbackError)>,
    /// Whether every path was removed.
    pub complete: bool,
}

impl Default for RollbackResult {
    fn default() -> Self {
        Self::new()
    }
}

impl RollbackResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self {
            rolled_back: vec![],
            failed: vec![],
            complete: true,
        }
    }

    /// Record a removed path.
    pub fn record_success(&mut self, path: String) {
        self.rolled_back.push(path);
    }

    /// Record a path left behind.
    pub fn record_failure(&mut self, path: String, error: RollbackError) {
        self.failed.push((path, error));
        self.complete = false;
    }

    /// Whether anything was left behind.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Paths left behind.
    pub fn left_behind(&self) -> Vec<String> {
        self.failed.iter().map(|(p, _)| p.clone()).collect()
    }

    /// Summary for display.
    pub fn summary(&self) -> String {
        if self.complete {
            format!("Rolled back {} file(s)", self.rolled_back.len())
        } else {
            format!(
                "Partial rollback: {} removed, {} left behind",
                self.rolled_back.len(),
                self.failed.len()
            )
        }
    }
}

/// Files created so far by one operation.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use editflow::core::types::FsId;
/// use editflow::engine::rollback::Rollback;
/// use editflow::mount::{MemFs, MountPoint, ReadFs};
///
/// let fs = Arc::new(MemFs::new());
/// let mount = MountPoint::read_write(FsId::new("content").unwrap(), "", fs.clone(), fs.clone());
/// let w = mount.writable().unwrap();
///
/// let mut rollback = Rollback::new();
/// w.write("en/copy.md", b"x").unwrap();
/// rollback.record(w, "en/copy.md");
///
/// let result = rollback.run();
/// assert!(result.complete);
/// assert!(!fs.exists("en/copy.md"));
/// ```
#[derive(Debug, Default)]
pub struct Rollback<'a> {
    created: Vec<(WritableMount<'a>, String)>,
}

impl<'a> Rollback<'a> {
    /// Nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file created through `w`.
    pub fn record(&mut self, w: WritableMount<'a>, path: impl Into<String>) {
        self.created.push((w, path.into()));
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// Remove every recorded file, newest first.
    pub fn run(self) -> RollbackResult {
        let mut result = RollbackResult::new();
        for (w, path) in self.created.into_iter().rev() {
            match w.remove_file(&path) {
                Ok(()) => {
                    info!(path = %path, "rolled back");
                    result.record_success(path);
                }
                Err(e) if e.is_not_found() => result.record_success(path),
                Err(source) => {
                    warn!(path = %path, error = %source, "rollback left file behind");
                    result.record_failure(
                        path.clone(),
                        RollbackError::Remove { path, source },
                    );
                }
            }
        }
        result
    }
}
