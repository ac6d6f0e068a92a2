//! engine::transfer
//!
//! The verified copy shared by move, copy and translate.
//!
//! # Algorithm
//!
//! 1. Build the destination identity from `<op>~dst-fsid`, `~dst-lang`,
//!    `~dst-path` and `~dst-name`, each sanitized. A missing name is offered
//!    to the [`FileNameHook`](crate::collab::FileNameHook)s before it becomes
//!    a "file name required" error.
//! 2. Reject a destination equal to the source.
//! 3. Resolve the destination's read-write mount; "filesystem not found",
//!    "read-only" and "already exists" are distinct errors.
//! 4. Stat and read the source.
//! 5. Create the destination, then re-apply the source's timestamps.
//! 6. Stat what landed and compare shasums. A mismatch removes the
//!    destination and reports [`TransferError::Integrity`].
//! 7. Translate only: tag the destination's front matter with
//!    `translates: <source address>` and verify again.
//! 8. Move only: release the source lock, then remove the source. A failed
//!    release removes the destination and keeps the source.
//!
//! The three operations differ only in where the destination code comes
//! from (copy forces the source's, translate requires `~dst-lang`, move
//! takes `~dst-lang` or keeps the source's) and in step 7 and 8.

use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use super::context::{ErrorKind, OpContext, OpError, Redirect, ValidationErrors};
use super::operation::OperationKind;
use super::ops::require_removable;
use super::rollback::Rollback;
use super::Engine;
use crate::collab::{FrontMatterError, Notice};
use crate::core::identity::ResourceIdentity;
use crate::core::naming::{sanitize_path, sanitize_segment};
use crate::core::ops::LockError;
use crate::core::paths;
use crate::core::types::{FsId, LocaleTag, Shasum};
use crate::mount::{FsError, WritableMount};

/// Front-matter key holding a translation's back-reference.
pub const TRANSLATES_KEY: &str = "translates";

/// Errors specific to the transfer protocol.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Source and destination are the same resource.
    #[error("nothing to do: {0} is both source and destination")]
    NothingToDo(String),

    /// Something already exists at the destination.
    #[error("destination already exists: {0}")]
    AlreadyExists(String),

    /// The destination read back different bytes than were written. The
    /// destination has been removed.
    #[error("integrity check failed for {resource}: wrote {expected}, read back {actual}")]
    Integrity {
        /// Destination address.
        resource: String,
        /// Shasum of the bytes written.
        expected: Shasum,
        /// Shasum of the bytes read back.
        actual: Shasum,
    },

    /// The source lock could not be released; the move was abandoned and
    /// the source kept.
    #[error("could not release the lock on {resource}, move abandoned: {source}")]
    LockRelease {
        /// Source address.
        resource: String,
        /// Underlying failure.
        #[source]
        source: LockError,
    },

    /// The translation back-reference could not be written.
    #[error("could not tag {resource} as a translation: {source}")]
    Tag {
        /// Destination address.
        resource: String,
        /// Underlying failure.
        #[source]
        source: FrontMatterError,
    },

    /// The destination was written and the source lock released, but the
    /// source could not be removed.
    #[error("moved to {destination} but could not remove {resource}: {source}")]
    RemoveSource {
        /// Source address.
        resource: String,
        /// Destination address.
        destination: String,
        /// Underlying failure.
        #[source]
        source: FsError,
    },
}

impl TransferError {
    /// Expected-failure classification.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            TransferError::NothingToDo(_) | TransferError::Tag { .. } => {
                Some(ErrorKind::Validation)
            }
            TransferError::AlreadyExists(_) => Some(ErrorKind::AlreadyExists),
            TransferError::Integrity { .. } => Some(ErrorKind::Integrity),
            TransferError::LockRelease { .. } => Some(ErrorKind::LockConflict),
            TransferError::RemoveSource { .. } => Some(ErrorKind::Partial),
        }
    }
}

/// What a completed transfer did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// The operation.
    pub op: OperationKind,
    /// Source resource.
    pub source: ResourceIdentity,
    /// Destination resource.
    pub destination: ResourceIdentity,
    /// Shasum of the destination as verified.
    pub shasum: Shasum,
    /// Size of the destination in bytes.
    pub size: u64,
}

/// A sanitized destination name from `<op>~<field>`, or `None` if the field
/// is absent.
pub(crate) fn form_name(ctx: &OpContext<'_>, field: &str, errors: &mut ValidationErrors) -> Option<String> {
    let raw = ctx.scoped(field)?;
    let name = sanitize_segment(raw);
    if name.is_empty() {
        errors.field(
            format!("{}~{field}", ctx.op()),
            format!("'{raw}' is not a usable file name"),
        );
        return None;
    }
    Some(name)
}

/// The directory a destination goes into: `<op>~dst-path` if given,
/// otherwise `default`.
pub(crate) fn destination_dir(ctx: &OpContext<'_>, default: &str) -> String {
    match ctx.scoped("dst-path") {
        Some(raw) => sanitize_path(raw),
        None => default.to_string(),
    }
}

/// The destination filesystem: `<op>~dst-fsid` if given, else the source's.
pub(crate) fn destination_fsid(ctx: &OpContext<'_>, errors: &mut ValidationErrors) -> FsId {
    let source = &ctx.id().fsid;
    match ctx.scoped("dst-fsid") {
        Some(raw) => FsId::new(raw).unwrap_or_else(|e| {
            errors.field(format!("{}~dst-fsid", ctx.op()), e.to_string());
            source.clone()
        }),
        None => source.clone(),
    }
}

/// The destination code for `ctx.op()`.
pub(crate) fn destination_code(ctx: &OpContext<'_>, errors: &mut ValidationErrors) -> String {
    let source = ctx.id();
    let field = format!("{}~dst-lang", ctx.op());
    match ctx.op() {
        OperationKind::Copy => source.code.clone(),
        OperationKind::Translate => match ctx.scoped("dst-lang").map(LocaleTag::parse) {
            Some(Ok(tag)) => tag.as_str().to_string(),
            Some(Err(e)) => {
                errors.field(field, e.to_string());
                source.code.clone()
            }
            None => {
                errors.field(field, "target language required");
                source.code.clone()
            }
        },
        _ => match ctx.scoped("dst-lang") {
            Some(raw) => match LocaleTag::parse(raw) {
                Ok(tag) => tag.as_str().to_string(),
                Err(_) => {
                    let code = sanitize_segment(raw);
                    if code.is_empty() {
                        errors.field(field, format!("'{raw}' is not a usable code"));
                        source.code.clone()
                    } else {
                        code
                    }
                }
            },
            None => source.code.clone(),
        },
    }
}

/// Build the destination identity from the form.
///
/// Every malformed field is reported, not just the first.
pub fn destination(ctx: &OpContext<'_>) -> Result<ResourceIdentity, OpError> {
    let mut errors = ValidationErrors::new();
    let source = ctx.id();

    let fsid = destination_fsid(ctx, &mut errors);
    let code = destination_code(ctx, &mut errors);
    let dir = destination_dir(ctx, source.parent_dir());

    let name = match form_name(ctx, "dst-name", &mut errors) {
        Some(name) => Some(name),
        None if ctx.scoped("dst-name").is_some() => None,
        None => {
            let supplied = ctx
                .engine()
                .hooks()
                .iter()
                .find_map(|h| h.file_name_required(ctx.op(), source, ctx.form()))
                .map(|n| sanitize_segment(&n))
                .filter(|n| !n.is_empty());
            if supplied.is_none() {
                errors.field(format!("{}~dst-name", ctx.op()), "file name required");
            }
            supplied
        }
    };

    errors.into_result()?;
    let name = name.unwrap_or_default();
    Ok(ResourceIdentity::new(fsid, code, paths::join(&[&dir, &name])))
}

/// Check that `destination` can receive a transfer from `source`.
pub fn check_destination<'e>(
    engine: &'e Engine,
    source: &ResourceIdentity,
    destination: &ResourceIdentity,
) -> Result<WritableMount<'e>, OpError> {
    if source == destination {
        return Err(TransferError::NothingToDo(source.canonical()).into());
    }
    let w = engine.mounts().writable_for(destination)?;
    if engine
        .mounts()
        .exists(&destination.fsid, &destination.file_path())
    {
        return Err(TransferError::AlreadyExists(destination.canonical()).into());
    }
    Ok(w)
}

/// Validation for move, copy and translate.
pub fn validate(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    let source = ctx.id();

    if !ctx.mounts().resource_exists(source) {
        errors.push(
            ErrorKind::NotFound,
            format!("resource not found: {source}"),
        );
    }

    if ctx.op() == OperationKind::Move {
        require_removable(ctx, &mut errors)?;
        if ctx.drafts().exists(source) {
            errors.push(
                ErrorKind::Validation,
                "publish or delete the draft before moving",
            );
        }
        if let Some(holder) = ctx
            .locks()
            .status(source)?
            .holder
            .filter(|h| h != ctx.editor())
        {
            errors.push(
                ErrorKind::LockConflict,
                format!("{source} is locked by another user ({holder})"),
            );
        }
    }

    match destination(ctx) {
        Ok(dst) => {
            if let Err(e) = check_destination(ctx.engine(), source, &dst) {
                errors.absorb(e)?;
            }
        }
        Err(e) => errors.absorb(e)?,
    }

    errors.into_result()
}

/// Execution for move, copy and translate.
pub fn execute(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let source = ctx.id().clone();
    let destination = destination(ctx)?;
    let report = transfer(ctx.engine(), ctx.op(), &source, &destination)?;

    let verb = match report.op {
        OperationKind::Move => "moved",
        OperationKind::Translate => "translated",
        _ => "copied",
    };
    ctx.notify(
        Notice::info(format!("{verb} {source} to {destination}")).about(&destination),
    );

    if report.op == OperationKind::Move {
        move_index_entry(ctx, &source, &destination);
    }

    Ok(ctx.success(Redirect::Edit(destination)))
}

/// Carry an index entry from the old address to the new one. Failures are
/// reported as warnings.
fn move_index_entry(ctx: &mut OpContext<'_>, source: &ResourceIdentity, destination: &ResourceIdentity) {
    let indexer = ctx.engine().indexer();
    if !indexer.is_indexed(source) {
        return;
    }
    let result = indexer
        .deindex(source)
        .map_err(|e| e.to_string())
        .and_then(|()| {
            ctx.mounts()
                .resolve_for(destination)
                .and_then(|m| Ok(m.read(&destination.file_path())?))
                .map_err(|e| format!("could not read {destination}: {e}"))
        })
        .and_then(|bytes| indexer.index(destination, &bytes).map_err(|e| e.to_string()));
    if let Err(e) = result {
        warn!(source = %source, destination = %destination, error = %e, "index not updated after move");
        ctx.notify(Notice::warn(format!("search index not updated: {e}")).about(destination));
    }
}

/// Stat what landed at `path` and compare it with `expected`.
fn verify(
    w: WritableMount<'_>,
    destination: &ResourceIdentity,
    path: &str,
    expected: &Shasum,
) -> Result<u64, OpError> {
    let written = w.stat_written(path)?;
    if &written.shasum != expected {
        return Err(TransferError::Integrity {
            resource: destination.canonical(),
            expected: expected.clone(),
            actual: written.shasum,
        }
        .into());
    }
    debug!(resource = %destination, shasum = %expected.short(12), "integrity verified");
    Ok(written.size)
}

/// Run the verified copy, plus the move and translate steps.
pub fn transfer(
    engine: &Engine,
    op: OperationKind,
    source: &ResourceIdentity,
    destination: &ResourceIdentity,
) -> Result<TransferReport, OpError> {
    let span = info_span!("transfer", op = %op, source = %source, destination = %destination);
    let _guard = span.enter();

    let mounts = engine.mounts();
    let source_w = match op {
        OperationKind::Move => Some(mounts.writable_for(source)?),
        _ => None,
    };
    let w = check_destination(engine, source, destination)?;

    let src_path = source.file_path();
    let dst_path = destination.file_path();
    let src_mount = mounts.resolve_for(source)?;
    let stat = src_mount.stat(&src_path)?;
    let bytes = src_mount.read(&src_path)?;
    debug!(size = stat.size, mime = %stat.mime, "source read");

    match w.create_new(&dst_path, &bytes) {
        Ok(()) => {}
        Err(FsError::Unsupported { .. }) => w.write(&dst_path, &bytes)?,
        Err(FsError::AlreadyExists(_)) => {
            return Err(TransferError::AlreadyExists(destination.canonical()).into())
        }
        Err(e) => return Err(e.into()),
    }
    let mut rollback = Rollback::new();
    rollback.record(w, dst_path.clone());

    let finish = || -> Result<(Shasum, u64), OpError> {
        w.set_times(&dst_path, stat.created, stat.updated)?;
        let mut size = verify(w, destination, &dst_path, &stat.shasum)?;
        let mut shasum = stat.shasum.clone();

        if op == OperationKind::Translate {
            let tagged = engine
                .front_matter()
                .set(&bytes, TRANSLATES_KEY, &source.canonical())
                .map_err(|e| TransferError::Tag {
                    resource: destination.canonical(),
                    source: e,
                })?;
            w.write(&dst_path, &tagged)?;
            w.set_times(&dst_path, stat.created, stat.updated)?;
            shasum = Shasum::of(&tagged);
            size = verify(w, destination, &dst_path, &shasum)?;
        }

        if op == OperationKind::Move {
            engine
                .locks()
                .release(source)
                .map_err(|e| TransferError::LockRelease {
                    resource: source.canonical(),
                    source: e,
                })?;
        }
        Ok((shasum, size))
    };

    let (shasum, size) = match finish() {
        Ok(done) => done,
        Err(e) => {
            let result = rollback.run();
            warn!(error = %e, rollback = %result.summary(), "transfer abandoned");
            if result.has_failures() {
                return Err(OpError::Partial {
                    resource: destination.canonical(),
                    step: "rollback",
                    left_behind: result.left_behind(),
                    source: Box::new(e),
                });
            }
            return Err(e);
        }
    };

    if let Some(sw) = source_w {
        sw.remove_file(&src_path)
            .map_err(|e| TransferError::RemoveSource {
                resource: source.canonical(),
                destination: destination.canonical(),
                source: e,
            })?;
        engine.drafts().remove(source)?;
    }

    info!(size, shasum = %shasum.short(12), "transfer complete");
    Ok(TransferReport {
        op,
        source: source.clone(),
        destination: destination.clone(),
        shasum,
        size,
    })
}
