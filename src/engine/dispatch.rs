//! engine::dispatch
//!
//! The single entry point for running an operation.
//!
//! # Lifecycle
//!
//! ```text
//! Lookup -> Gate -> Validate -> Execute -> Deliver notices
//! ```
//!
//! 1. **Lookup**: `submit` names the operation (a `-confirmed` suffix is
//!    stripped). An unknown key stops here with a notice.
//! 2. **Gate**: permission, then confirmation. See [`gate`](super::gate).
//! 3. **Validate**: every problem is collected and reported as one notice
//!    each. Nothing has been written yet.
//! 4. **Execute**: the operation's mutation. Its redirect honors
//!    `return=directory`.
//! 5. **Deliver**: queued notices go to the editor's [`NoticeSink`].
//!
//! # Invariants
//!
//! - A request that stops before step 4 performs no writes
//! - Every expected failure ends as a notice and a redirect, never as an
//!   error return
//! - Notices gathered before an unexpected failure are still delivered
//!
//! [`NoticeSink`]: crate::collab::NoticeSink

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use super::capabilities::Permission;
use super::context::{parent_of, ErrorKind, OpContext, OpError, Redirect, ValidationErrors};
use super::gate::{gate, GateResult};
use super::operation::OperationKind;
use super::{Engine, Request};
use crate::collab::{Notice, NoticeError};

/// How a dispatched request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Status {
    /// The operation ran.
    Done,
    /// No operation matches the submitted key.
    UnknownOperation,
    /// The caller lacks a permission.
    Denied {
        /// The missing permission.
        missing: Permission,
    },
    /// The operation needs confirmation.
    NeedsConfirmation,
    /// Validation found problems.
    Invalid {
        /// Every problem found.
        errors: ValidationErrors,
    },
    /// Execution stopped with an expected failure.
    Failed {
        /// Classification.
        kind: ErrorKind,
        /// User-facing message.
        message: String,
    },
}

/// Result of one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// The operation, if the key was recognized.
    pub op: Option<OperationKind>,
    /// How it ended.
    #[serde(flatten)]
    pub status: Status,
    /// Where the caller goes next.
    pub redirect: Redirect,
    /// Notices raised by this request.
    pub notices: Vec<Notice>,
}

impl Outcome {
    /// Whether the operation ran to completion.
    pub fn is_done(&self) -> bool {
        matches!(self.status, Status::Done)
    }

    /// The failure classification, if the request did not complete.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.status {
            Status::Done => None,
            Status::UnknownOperation => Some(ErrorKind::UnknownOperation),
            Status::Denied { .. } => Some(ErrorKind::Permission),
            Status::NeedsConfirmation => Some(ErrorKind::Confirmation),
            Status::Invalid { errors } => errors
                .iter()
                .next()
                .map(|p| p.kind)
                .or(Some(ErrorKind::Validation)),
            Status::Failed { kind, .. } => Some(*kind),
        }
    }

    /// Whether the request failed with `kind`, at any stage.
    pub fn fails_with(&self, kind: ErrorKind) -> bool {
        match &self.status {
            Status::Invalid { errors } => errors.contains(kind),
            _ => self.error_kind() == Some(kind),
        }
    }
}

/// Failures outside the expected taxonomy.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// An operation failed in a way no notice can describe.
    #[error("{op} {resource} failed: {source}")]
    Unexpected {
        /// The operation.
        op: OperationKind,
        /// Resource address.
        resource: String,
        /// Underlying failure.
        #[source]
        source: OpError,
    },

    /// Notices could not be delivered.
    #[error(transparent)]
    Notices(#[from] NoticeError),
}

/// Where to send the caller after a failure: the directory listing for a
/// directory, else the resource's edit page.
fn back(engine: &Engine, request: &Request) -> Redirect {
    if engine.is_dir(&request.resource) {
        Redirect::Browse(request.resource.clone())
    } else {
        Redirect::Edit(request.resource.clone())
    }
}

fn deliver(engine: &Engine, request: &Request, notices: &[Notice]) -> Result<(), NoticeError> {
    for notice in notices {
        engine.notices().push(&request.editor, notice.clone())?;
    }
    Ok(())
}

/// Run one request through the lifecycle.
pub fn dispatch(engine: &Engine, request: &Request) -> Result<Outcome, DispatchError> {
    let span = info_span!(
        "dispatch",
        editor = %request.editor,
        resource = %request.resource,
    );
    let _guard = span.enter();

    let outcome = run(engine, request)?;
    deliver(engine, request, &outcome.notices)?;
    Ok(outcome)
}

fn run(engine: &Engine, request: &Request) -> Result<Outcome, DispatchError> {
    let here = request.resource.clone();
    let about = |n: Notice| n.about(&request.resource);

    // 1. Lookup
    let submit = request.form.submit();
    let Some(descriptor) = submit
        .as_ref()
        .and_then(|s| engine.registry().get(&s.key))
    else {
        let key = submit.map(|s| s.key).unwrap_or_default();
        debug!(key = %key, "unknown operation");
        return Ok(Outcome {
            op: None,
            status: Status::UnknownOperation,
            redirect: Redirect::Stay,
            notices: vec![about(Notice::error(format!("unknown operation '{key}'")))],
        });
    };
    let op = descriptor.kind;

    // 2. Gate
    let permissions = engine.authorizer().permissions(&request.editor);
    let gated = gate(descriptor, &request.form, &permissions);
    let message = gated.message().unwrap_or_default();
    match gated {
        GateResult::Ready => {}
        GateResult::Denied { missing, .. } => {
            warn!(op = %op, missing = %missing, "permission denied");
            return Ok(Outcome {
                op: Some(op),
                status: Status::Denied { missing },
                redirect: back(engine, request),
                notices: vec![about(Notice::error(message))],
            });
        }
        GateResult::NeedsConfirmation { .. } => {
            debug!(op = %op, "confirmation required");
            return Ok(Outcome {
                op: Some(op),
                status: Status::NeedsConfirmation,
                redirect: Redirect::Edit(here),
                notices: vec![about(Notice::warn(message))],
            });
        }
    }

    let mut ctx = OpContext::new(engine, request, op);

    // 3. Validate
    if let Err(err) = (descriptor.validate)(&ctx) {
        let mut errors = ValidationErrors::new();
        if let Err(unexpected) = errors.absorb(err) {
            return Err(DispatchError::Unexpected {
                op,
                resource: here.canonical(),
                source: unexpected,
            });
        }
        debug!(op = %op, problems = errors.len(), "validation failed");
        let notices = errors
            .iter()
            .map(|p| about(Notice::error(p.to_string())))
            .collect();
        return Ok(Outcome {
            op: Some(op),
            status: Status::Invalid { errors },
            redirect: back(engine, request),
            notices,
        });
    }

    // 4. Execute
    let result = (descriptor.execute)(&mut ctx);
    let mut notices = ctx.take_notices();
    match result {
        Ok(redirect) => {
            info!(op = %op, redirect = %redirect, "operation complete");
            Ok(Outcome {
                op: Some(op),
                status: Status::Done,
                redirect,
                notices,
            })
        }
        Err(err) => match err.kind() {
            Some(kind) => {
                let message = err.to_string();
                warn!(op = %op, kind = ?kind, error = %message, "operation failed");
                notices.push(about(Notice::error(message.clone())));
                let redirect = if kind == ErrorKind::Partial && op == OperationKind::Delete {
                    Redirect::Browse(parent_of(&here))
                } else {
                    back(engine, request)
                };
                Ok(Outcome {
                    op: Some(op),
                    status: Status::Failed { kind, message },
                    redirect,
                    notices,
                })
            }
            None => {
                deliver(engine, request, &notices)?;
                Err(DispatchError::Unexpected {
                    op,
                    resource: here.canonical(),
                    source: err,
                })
            }
        },
    }
}
