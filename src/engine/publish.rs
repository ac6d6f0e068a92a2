//! engine::publish
//!
//! Promotes a draft to the canonical resource.
//!
//! # Pipeline
//!
//! 1. Render gate (when enabled): ask the renderer whether the draft would
//!    render. Broken content does not stop publish. It raises a warning and
//!    demotes the resource's available actions (`translate`,
//!    `de-index-page`) until the content renders again. A renderer crash is
//!    not a content problem and propagates.
//! 2. Read the draft, write it to the canonical path, remove the draft.
//! 3. Release the lock.
//! 4. Register the resource with the search index. An index failure is a
//!    warning; the content is already live.
//!
//! Steps 2 and 3 stop at the first failure with no compensation. A failure
//! after the canonical write is a [`PublishError::Partial`] naming the
//! sidecars left behind. Re-running publish after the draft is gone fails
//! with "draft not found"; the operator clears the remaining lock by hand.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span, warn};

use super::context::{ErrorKind, OpContext, OpError, Redirect, ValidationErrors};
use super::Engine;
use crate::collab::{Notice, RenderError};
use crate::core::identity::ResourceIdentity;
use crate::core::ops::DraftError;
use crate::core::paths::Sidecar;
use crate::core::types::Shasum;

/// A pipeline step that can fail after content went live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublishStep {
    /// Removing the draft sidecar.
    RemoveDraft,
    /// Removing the lock sidecar.
    ReleaseLock,
}

impl std::fmt::Display for PublishStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PublishStep::RemoveDraft => "removing the draft",
            PublishStep::ReleaseLock => "releasing the lock",
        })
    }
}

/// Errors from the publish pipeline.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The canonical resource was written but a later step failed.
    #[error("published {resource} but {step} failed ({source}); left behind: {}", left_behind.join(", "))]
    Partial {
        /// Resource address.
        resource: String,
        /// The step that failed.
        step: PublishStep,
        /// Sidecar paths still present.
        left_behind: Vec<String>,
        /// Underlying failure.
        #[source]
        source: Box<OpError>,
    },
}

impl PublishError {
    /// Expected-failure classification.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            PublishError::Partial { .. } => Some(ErrorKind::Partial),
        }
    }
}

/// What a completed publish did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// The published resource.
    pub resource: ResourceIdentity,
    /// Shasum of the promoted content.
    pub shasum: Shasum,
    /// Size of the promoted content.
    pub size: usize,
    /// Whether the render gate reported the content as broken.
    pub demoted: bool,
    /// Whether the index accepted the resource.
    pub indexed: bool,
}

/// Run the pipeline for `id`. Non-fatal warnings are appended to `notices`
/// even when the pipeline later fails.
pub fn publish(
    engine: &Engine,
    id: &ResourceIdentity,
    notices: &mut Vec<Notice>,
) -> Result<PublishReport, OpError> {
    let span = info_span!("publish", resource = %id);
    let _guard = span.enter();

    let w = engine.mounts().writable_for(id)?;
    let drafts = engine.drafts();

    let mut demoted = false;
    if engine.settings().render_gate {
        let draft = drafts.read(id)?;
        match engine.renderer().render(engine.kind_of(&id.fsid), id, &draft) {
            Ok(()) => {}
            Err(RenderError::Invalid(message)) => {
                warn!(error = %message, "publishing content that does not render");
                notices.push(
                    Notice::warn(format!("published with render errors: {message}")).about(id),
                );
                demoted = true;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let canonical = id.file_path();
    let bytes = match drafts.publish_into(id, |b| w.write(&canonical, b)) {
        Ok(bytes) => bytes,
        Err(DraftError::Remove { source, .. }) => {
            let mut left_behind = vec![id.sidecar_path(Sidecar::Draft)];
            if engine.locks().status(id).map(|s| s.locked()).unwrap_or(true) {
                left_behind.push(id.sidecar_path(Sidecar::Lock));
            }
            warn!(left_behind = ?left_behind, "publish stopped after canonical write");
            return Err(PublishError::Partial {
                resource: id.canonical(),
                step: PublishStep::RemoveDraft,
                left_behind,
                source: Box::new(OpError::Fs(source)),
            }
            .into());
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = engine.locks().release(id) {
        let left_behind = vec![id.sidecar_path(Sidecar::Lock)];
        warn!(left_behind = ?left_behind, "publish stopped after removing the draft");
        return Err(PublishError::Partial {
            resource: id.canonical(),
            step: PublishStep::ReleaseLock,
            left_behind,
            source: Box::new(e.into()),
        }
        .into());
    }

    let shasum = Shasum::of(&bytes);
    info!(size = bytes.len(), shasum = %shasum.short(12), "published");

    let indexed = match engine.indexer().index(id, &bytes) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "published resource not indexed");
            notices.push(Notice::warn(format!("published but not indexed: {e}")).about(id));
            false
        }
    };

    Ok(PublishReport {
        resource: id.clone(),
        shasum,
        size: bytes.len(),
        demoted,
        indexed,
    })
}

/// Validation for `publish`.
pub fn validate(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    let id = ctx.id();
    if !ctx.drafts().exists(id) {
        errors.push(ErrorKind::NotFound, format!("no draft to publish for {id}"));
    }
    if let Err(e) = ctx.mounts().writable_for(id) {
        errors.absorb(e.into())?;
    }
    if let Some(holder) = ctx.locks().status(id)?.holder.filter(|h| h != ctx.editor()) {
        errors.push(
            ErrorKind::LockConflict,
            format!("{id} is locked by another user ({holder})"),
        );
    }
    errors.into_result()
}

/// Execution for `publish`.
pub fn execute(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    let mut notices = Vec::new();
    let result = publish(ctx.engine(), id, &mut notices);
    for notice in notices {
        ctx.notify(notice);
    }
    result?;
    ctx.notify(Notice::info("published").about(id));
    Ok(ctx.success(Redirect::View(id.clone())))
}
