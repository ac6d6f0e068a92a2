//! engine::context
//!
//! Per-request state handed to validation and execution steps, and the
//! error taxonomy they report in.
//!
//! # Error taxonomy
//!
//! Every failure an operation can report is either *expected* or not.
//! Expected failures carry an [`ErrorKind`] and become a notice plus a
//! redirect back to the resource. Anything without a kind (I/O errors
//! outside the taxonomy, renderer crashes, index outages where they are not
//! tolerated) propagates out of the dispatcher as an opaque failure.
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | `Permission` | the caller lacks the descriptor's permission |
//! | `Confirmation` | the confirmation key is missing |
//! | `LockConflict` | another editor holds the lock |
//! | `ReadOnly` | no read-write view covers the path |
//! | `FsNotFound` | the filesystem id is unknown |
//! | `NotFound` | the resource, draft or directory is missing |
//! | `AlreadyExists` | a destination is taken |
//! | `Integrity` | a verified write read back different bytes |
//! | `Validation` | an operation-specific precondition failed |
//! | `Partial` | a multi-step mutation stopped half way |

use serde::Serialize;
use thiserror::Error;

use super::form::Form;
use super::operation::OperationKind;
use super::publish::PublishError;
use super::transfer::TransferError;
use super::{Engine, Request};
use crate::collab::{ContentKind, FrontMatterError, IndexError, Notice, RenderError};
use crate::core::identity::ResourceIdentity;
use crate::core::ops::{DraftError, DraftManager, LockError, LockManager};
use crate::core::types::EditorId;
use crate::mount::{FsError, MountError, MountTable};

/// Classification of an expected failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Permission,
    Confirmation,
    UnknownOperation,
    LockConflict,
    ReadOnly,
    FsNotFound,
    NotFound,
    AlreadyExists,
    Integrity,
    Validation,
    Partial,
}

impl ErrorKind {
    pub(crate) fn of_mount(err: &MountError) -> Option<ErrorKind> {
        match err {
            MountError::ReadOnly { .. } => Some(ErrorKind::ReadOnly),
            MountError::FsNotFound(_) | MountError::Uncovered { .. } => {
                Some(ErrorKind::FsNotFound)
            }
            MountError::Fs(e) => ErrorKind::of_fs(e),
        }
    }

    pub(crate) fn of_fs(err: &FsError) -> Option<ErrorKind> {
        match err {
            FsError::NotFound(_) => Some(ErrorKind::NotFound),
            FsError::AlreadyExists(_) => Some(ErrorKind::AlreadyExists),
            FsError::NotADirectory(_) | FsError::DirectoryNotEmpty(_) => {
                Some(ErrorKind::Validation)
            }
            FsError::Unsupported { .. } | FsError::Io { .. } => None,
        }
    }

    pub(crate) fn of_lock(err: &LockError) -> Option<ErrorKind> {
        match err {
            LockError::Mount(e) => ErrorKind::of_mount(e),
            LockError::ResourceMissing(_) => Some(ErrorKind::NotFound),
            LockError::LockedByOther { .. } => Some(ErrorKind::LockConflict),
            LockError::Fs(e) => ErrorKind::of_fs(e),
        }
    }

    pub(crate) fn of_draft(err: &DraftError) -> Option<ErrorKind> {
        match err {
            DraftError::NotFound(_) => Some(ErrorKind::NotFound),
            DraftError::Mount(e) => ErrorKind::of_mount(e),
            DraftError::Fs(e) | DraftError::Promote { source: e, .. } => ErrorKind::of_fs(e),
            DraftError::Remove { .. } => Some(ErrorKind::Partial),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ErrorKind::Permission => "permission",
            ErrorKind::Confirmation => "confirmation",
            ErrorKind::UnknownOperation => "unknown-operation",
            ErrorKind::LockConflict => "lock-conflict",
            ErrorKind::ReadOnly => "read-only",
            ErrorKind::FsNotFound => "fs-not-found",
            ErrorKind::NotFound => "not-found",
            ErrorKind::AlreadyExists => "already-exists",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Validation => "validation",
            ErrorKind::Partial => "partial",
        })
    }
}

/// One validation problem, optionally tied to a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// Classification.
    pub kind: ErrorKind,
    /// Form field the problem is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// User-facing message.
    pub message: String,
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Every problem a validation step found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    problems: Vec<Problem>,
}

impl ValidationErrors {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem not tied to a field.
    pub fn push(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.problems.push(Problem {
            kind,
            field: None,
            message: message.into(),
        });
    }

    /// Record a problem with a form field.
    pub fn field(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.problems.push(Problem {
            kind: ErrorKind::Validation,
            field: Some(field.into()),
            message: message.into(),
        });
    }

    /// Record the classification of an error, or propagate it if it has
    /// none.
    pub fn absorb(&mut self, err: OpError) -> Result<(), OpError> {
        match err {
            OpError::Invalid(other) => {
                self.problems.extend(other.problems);
                Ok(())
            }
            err => match err.kind() {
                Some(kind) => {
                    self.push(kind, err.to_string());
                    Ok(())
                }
                None => Err(err),
            },
        }
    }

    /// Whether no problems were found.
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Number of problems.
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    /// Whether any problem has `kind`.
    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.problems.iter().any(|p| p.kind == kind)
    }

    /// The problems, in the order found.
    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter()
    }

    /// `Ok(())` if empty, else the set as an [`OpError::Invalid`].
    pub fn into_result(self) -> Result<(), OpError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(OpError::Invalid(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, p) in self.problems.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

/// Errors from validation and execution steps.
#[derive(Debug, Error)]
pub enum OpError {
    #[error("{0}")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Mount(#[from] MountError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// A multi-step mutation stopped after changing something.
    #[error("{resource}: {step} failed after earlier steps completed, left behind: {}", left_behind.join(", "))]
    Partial {
        /// Resource address.
        resource: String,
        /// The step that failed.
        step: &'static str,
        /// Artifacts still present.
        left_behind: Vec<String>,
        /// Underlying failure.
        #[source]
        source: Box<OpError>,
    },
}

impl OpError {
    /// A single validation problem.
    pub fn invalid(kind: ErrorKind, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(kind, message);
        OpError::Invalid(errors)
    }

    /// The expected-failure classification, or `None` for failures outside
    /// the taxonomy.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            OpError::Invalid(errors) => errors
                .iter()
                .next()
                .map(|p| p.kind)
                .or(Some(ErrorKind::Validation)),
            OpError::Lock(e) => ErrorKind::of_lock(e),
            OpError::Draft(e) => ErrorKind::of_draft(e),
            OpError::Mount(e) => ErrorKind::of_mount(e),
            OpError::Fs(e) => ErrorKind::of_fs(e),
            OpError::Transfer(e) => e.kind(),
            OpError::Publish(e) => e.kind(),
            OpError::Render(RenderError::Invalid(_)) | OpError::FrontMatter(_) => {
                Some(ErrorKind::Validation)
            }
            OpError::Render(RenderError::Engine(_)) | OpError::Index(_) => None,
            OpError::Partial { .. } => Some(ErrorKind::Partial),
        }
    }
}

/// Where the caller goes after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "to", content = "resource", rename_all = "lowercase")]
pub enum Redirect {
    /// No navigation.
    Stay,
    /// The resource's view page.
    View(ResourceIdentity),
    /// The resource's edit page.
    Edit(ResourceIdentity),
    /// A directory listing.
    Browse(ResourceIdentity),
}

impl std::fmt::Display for Redirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Redirect::Stay => f.write_str("stay"),
            Redirect::View(id) => write!(f, "view {id}"),
            Redirect::Edit(id) => write!(f, "edit {id}"),
            Redirect::Browse(id) => write!(f, "browse {id}/"),
        }
    }
}

/// State shared by one operation's validation and execution steps.
#[derive(Debug)]
pub struct OpContext<'a> {
    engine: &'a Engine,
    request: &'a Request,
    op: OperationKind,
    notices: Vec<Notice>,
}

impl<'a> OpContext<'a> {
    /// Create a context for `op`.
    pub fn new(engine: &'a Engine, request: &'a Request, op: OperationKind) -> Self {
        Self {
            engine,
            request,
            op,
            notices: Vec::new(),
        }
    }

    /// The engine.
    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    /// The operation being run.
    pub fn op(&self) -> OperationKind {
        self.op
    }

    /// The resource the request addresses.
    pub fn id(&self) -> &'a ResourceIdentity {
        &self.request.resource
    }

    /// The calling editor.
    pub fn editor(&self) -> &'a EditorId {
        &self.request.editor
    }

    /// The submitted form.
    pub fn form(&self) -> &'a Form {
        &self.request.form
    }

    /// An operation-scoped form field (`<op>~<name>`).
    pub fn scoped(&self, name: &str) -> Option<&'a str> {
        self.request.form.scoped(self.op.key(), name)
    }

    /// The mount table.
    pub fn mounts(&self) -> &'a MountTable {
        self.engine.mounts()
    }

    /// Lock manager over the engine's mounts.
    pub fn locks(&self) -> LockManager<'a> {
        self.engine.locks()
    }

    /// Draft manager over the engine's mounts.
    pub fn drafts(&self) -> DraftManager<'a> {
        self.engine.drafts()
    }

    /// Content kind of the resource's filesystem.
    pub fn kind(&self) -> ContentKind {
        self.engine.kind_of(&self.id().fsid)
    }

    /// Whether the addressed path is a directory.
    pub fn is_dir(&self) -> bool {
        self.engine.is_dir(self.id())
    }

    /// Queue a notice for the caller.
    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Notices queued so far.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Take the queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// `default`, unless the form asked to return to the directory listing.
    pub fn success(&self, default: Redirect) -> Redirect {
        if self.form().returns_to_directory() {
            Redirect::Browse(parent_of(self.id()))
        } else {
            default
        }
    }
}

/// The directory containing `id`, as an identity.
pub fn parent_of(id: &ResourceIdentity) -> ResourceIdentity {
    id.with_path(id.parent_dir().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_collect_every_problem() {
        let mut errors = ValidationErrors::new();
        errors.field("copy~dst-name", "file name required");
        errors.push(ErrorKind::ReadOnly, "filesystem archive is read-only");
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(ErrorKind::ReadOnly));
        assert_eq!(
            errors.to_string(),
            "copy~dst-name: file name required; filesystem archive is read-only"
        );
        assert!(matches!(errors.into_result(), Err(OpError::Invalid(_))));
    }

    #[test]
    fn absorb_keeps_classified_errors_and_propagates_the_rest() {
        let mut errors = ValidationErrors::new();
        errors
            .absorb(OpError::Lock(LockError::ResourceMissing("content/en/a.md".into())))
            .expect("classified");
        assert!(errors.contains(ErrorKind::NotFound));

        let io = FsError::Io {
            path: "a".into(),
            source: std::io::Error::other("disk on fire"),
        };
        assert!(errors.absorb(OpError::Fs(io)).is_err());
    }

    #[test]
    fn mount_errors_are_classified_distinctly() {
        let ro = OpError::Mount(MountError::ReadOnly {
            fsid: "archive".into(),
            path: "a.md".into(),
        });
        let missing = OpError::Mount(MountError::FsNotFound("nope".into()));
        assert_eq!(ro.kind(), Some(ErrorKind::ReadOnly));
        assert_eq!(missing.kind(), Some(ErrorKind::FsNotFound));
    }

    #[test]
    fn renderer_crash_is_unexpected() {
        assert_eq!(OpError::Render(RenderError::Engine("boom".into())).kind(), None);
        assert_eq!(
            OpError::Render(RenderError::Invalid("bad".into())).kind(),
            Some(ErrorKind::Validation)
        );
    }

    #[test]
    fn redirect_display() {
        let id = ResourceIdentity::parse("content", "en", "blog/a.md").expect("identity");
        assert_eq!(Redirect::Edit(id.clone()).to_string(), "edit content/en/blog/a.md");
        assert_eq!(
            Redirect::Browse(parent_of(&id)).to_string(),
            "browse content/en/blog/"
        );
        assert_eq!(Redirect::Stay.to_string(), "stay");
    }
}
