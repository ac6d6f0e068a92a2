//! engine::health
//!
//! Status report for one resource, including leftovers from operations
//! that stopped part way.
//!
//! # Architecture
//!
//! Publish, move and delete stop at the first failure without undoing the
//! steps already taken. What they leave behind is always a sidecar: a lock
//! nobody will release, or a draft whose content is already live. The
//! report reads the canonical file and both sidecars and flags those
//! shapes as [`Issue`]s so an operator can clean up by hand.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use editflow::core::identity::ResourceIdentity;
//! use editflow::core::types::FsId;
//! use editflow::engine::health::IssueKind;
//! use editflow::engine::Engine;
//! use editflow::mount::{MemFs, MountPoint, MountTable};
//!
//! // A publish that failed to remove the draft.
//! let fs = Arc::new(
//!     MemFs::new()
//!         .with_file("en/about.md", b"new")
//!         .with_file("en/about.md.~draft", b"new"),
//! );
//! let table = MountTable::new().with(MountPoint::read_write(
//!     FsId::new("content").unwrap(), "", fs.clone(), fs,
//! ));
//! let engine = Engine::builder(table).build();
//! let id = ResourceIdentity::parse("content", "en", "about.md").unwrap();
//!
//! let report = engine.status(&id).unwrap();
//! assert!(report.has_issue(IssueKind::PublishedDraft));
//! ```

use serde::Serialize;

use super::context::OpError;
use super::Engine;
use crate::core::identity::ResourceIdentity;
use crate::core::paths::Sidecar;
use crate::core::types::{EditorId, Shasum, UtcTimestamp};

/// Severity of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks editing until cleared.
    Warning,
    /// Worth knowing, harmless.
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// The shapes a resource's sidecars can be left in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    /// A lock on a path with neither canonical file nor draft.
    OrphanLock,
    /// A draft for a path with no canonical file.
    OrphanDraft,
    /// A draft identical to the canonical file.
    PublishedDraft,
    /// A lock with no draft behind it.
    IdleLock,
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// What was found.
    pub kind: IssueKind,
    /// How much it matters.
    pub severity: Severity,
    /// The sidecar path concerned.
    pub path: String,
    /// Suggested fix.
    pub message: String,
}

impl Issue {
    fn new(kind: IssueKind, path: String) -> Self {
        let (severity, message) = match kind {
            IssueKind::OrphanLock => (
                Severity::Warning,
                "lock left behind with no resource; remove it by hand",
            ),
            IssueKind::OrphanDraft => (
                Severity::Warning,
                "draft left behind with no resource; remove or restore it by hand",
            ),
            IssueKind::PublishedDraft => (
                Severity::Warning,
                "draft is already published; delete the draft",
            ),
            IssueKind::IdleLock => (Severity::Info, "locked with no draft"),
        };
        Self {
            kind,
            severity,
            path,
            message: message.to_string(),
        }
    }
}

/// A file's identity on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    /// Mount-relative path.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Content hash.
    pub shasum: Shasum,
    /// Last modification time.
    pub updated: UtcTimestamp,
}

/// State of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// The resource.
    pub resource: ResourceIdentity,
    /// Whether a read-write mount covers it.
    pub writable: bool,
    /// The published file.
    pub canonical: Option<FileSummary>,
    /// The draft sidecar.
    pub draft: Option<FileSummary>,
    /// The lock holder.
    pub lock_holder: Option<EditorId>,
    /// Leftovers worth attention.
    pub issues: Vec<Issue>,
}

impl StatusReport {
    /// Whether an issue of `kind` was found.
    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    /// Whether anything needs manual cleanup.
    pub fn needs_attention(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }
}

fn summarize(engine: &Engine, id: &ResourceIdentity, path: &str) -> Option<FileSummary> {
    let mount = engine.mounts().resolve(&id.fsid, path).ok()?;
    if !mount.exists(path) || mount.is_dir(path) {
        return None;
    }
    let stat = mount.stat(path).ok()?;
    Some(FileSummary {
        path: path.to_string(),
        size: stat.size,
        shasum: stat.shasum,
        updated: stat.updated,
    })
}

/// Build the report for `id`.
pub fn status(engine: &Engine, id: &ResourceIdentity) -> Result<StatusReport, OpError> {
    let canonical = summarize(engine, id, &id.file_path());
    let draft = summarize(engine, id, &id.sidecar_path(Sidecar::Draft));
    let lock_holder = engine.locks().status(id)?.holder;

    let mut issues = Vec::new();
    let lock_path = id.sidecar_path(Sidecar::Lock);
    match (&canonical, &draft) {
        (None, None) if lock_holder.is_some() => {
            issues.push(Issue::new(IssueKind::OrphanLock, lock_path.clone()))
        }
        (None, Some(d)) => issues.push(Issue::new(IssueKind::OrphanDraft, d.path.clone())),
        (Some(c), Some(d)) if c.shasum == d.shasum => {
            issues.push(Issue::new(IssueKind::PublishedDraft, d.path.clone()))
        }
        _ => {}
    }
    if canonical.is_some() && draft.is_none() && lock_holder.is_some() {
        issues.push(Issue::new(IssueKind::IdleLock, lock_path));
    }

    Ok(StatusReport {
        resource: id.clone(),
        writable: engine.mounts().writable_for(id).is_ok(),
        canonical,
        draft,
        lock_holder,
        issues,
    })
}
