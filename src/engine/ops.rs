//! engine::ops
//!
//! Validation and execution steps for the single-resource operations.
//! Move, copy and translate live in [`transfer`](super::transfer); publish
//! lives in [`publish`](super::publish).
//!
//! Validation steps collect every problem they find and never write.
//! Execution steps assume validation passed but still propagate whatever
//! the filesystem reports, since another request may have run in between.

use tracing::{info, warn};

use super::context::{parent_of, ErrorKind, OpContext, OpError, Redirect, ValidationErrors};
use super::operation::OperationKind;
use super::transfer::{destination_code, destination_dir, destination_fsid, form_name};
use crate::collab::{ContentKind, Notice};
use crate::core::identity::ResourceIdentity;
use crate::core::paths::{self, Sidecar};
use crate::mount::FsError;

fn require_resource(ctx: &OpContext<'_>, errors: &mut ValidationErrors) {
    if !ctx.mounts().resource_exists(ctx.id()) {
        errors.push(
            ErrorKind::NotFound,
            format!("resource not found: {}", ctx.id()),
        );
    }
}

fn require_writable(ctx: &OpContext<'_>, errors: &mut ValidationErrors) -> Result<(), OpError> {
    match ctx.mounts().writable_for(ctx.id()) {
        Ok(_) => Ok(()),
        Err(e) => errors.absorb(e.into()),
    }
}

/// The canonical file can be removed: writable, and held by the write
/// layer alone.
pub(crate) fn require_removable(
    ctx: &OpContext<'_>,
    errors: &mut ValidationErrors,
) -> Result<(), OpError> {
    let id = ctx.id();
    match ctx.mounts().writable_for(id) {
        Ok(w) => {
            if ctx.mounts().resource_exists(id) && !w.holds(&id.file_path()) {
                errors.push(
                    ErrorKind::ReadOnly,
                    format!("{id} is served from the read-only layer of {}", id.fsid),
                );
            }
            Ok(())
        }
        Err(e) => errors.absorb(e.into()),
    }
}

fn require_lock_free(ctx: &OpContext<'_>, errors: &mut ValidationErrors) -> Result<(), OpError> {
    let id = ctx.id();
    if let Some(holder) = ctx.locks().status(id)?.holder.filter(|h| h != ctx.editor()) {
        errors.push(
            ErrorKind::LockConflict,
            format!("{id} is locked by another user ({holder})"),
        );
    }
    Ok(())
}

/// Sidecars of `id` that still exist.
fn sidecars_present(ctx: &OpContext<'_>, id: &ResourceIdentity) -> Vec<String> {
    [Sidecar::Draft, Sidecar::Lock]
        .into_iter()
        .map(|kind| id.sidecar_path(kind))
        .filter(|path| ctx.mounts().exists(&id.fsid, path))
        .collect()
}

fn partial(ctx: &OpContext<'_>, step: &'static str, source: OpError) -> OpError {
    let id = ctx.id();
    let left_behind = sidecars_present(ctx, id);
    warn!(resource = %id, step, left_behind = ?left_behind, "operation stopped part way");
    OpError::Partial {
        resource: id.canonical(),
        step,
        left_behind,
        source: Box::new(source),
    }
}

// view

pub fn validate_view(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let id = ctx.id();
    if ctx.is_dir() || ctx.mounts().resource_exists(id) || ctx.drafts().exists(id) {
        Ok(())
    } else {
        Err(OpError::invalid(
            ErrorKind::NotFound,
            format!("resource not found: {id}"),
        ))
    }
}

pub fn execute_view(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    if ctx.is_dir() {
        Ok(Redirect::Browse(ctx.id().clone()))
    } else {
        Ok(Redirect::View(ctx.id().clone()))
    }
}

// edit

pub fn validate_edit(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    require_resource(ctx, &mut errors);
    require_writable(ctx, &mut errors)?;
    require_lock_free(ctx, &mut errors)?;
    errors.into_result()
}

pub fn execute_edit(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    ctx.locks().acquire(ctx.editor(), id)?;
    Ok(Redirect::Edit(id.clone()))
}

// unlock

pub fn validate_unlock(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    let id = ctx.id();
    require_writable(ctx, &mut errors)?;
    match ctx.locks().status(id)?.holder {
        None => errors.push(ErrorKind::Validation, format!("{id} is not locked")),
        Some(holder) if &holder != ctx.editor() => errors.push(
            ErrorKind::LockConflict,
            format!("{id} is locked by another user ({holder})"),
        ),
        Some(_) => {}
    }
    errors.into_result()
}

pub fn execute_unlock(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    ctx.locks().release(id)?;
    ctx.notify(Notice::info("unlocked").about(id));
    Ok(ctx.success(Redirect::View(id.clone())))
}

// retake

pub fn validate_retake(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    require_resource(ctx, &mut errors);
    require_writable(ctx, &mut errors)?;
    errors.into_result()
}

pub fn execute_retake(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    let previous = ctx.locks().status(id)?.holder;
    ctx.locks().retake(ctx.editor(), id)?;
    if let Some(prev) = previous.filter(|p| p != ctx.editor()) {
        ctx.notify(Notice::warn(format!("took over the lock from {prev}")).about(id));
    }
    Ok(Redirect::Edit(id.clone()))
}

// delete

pub fn validate_delete(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    require_resource(ctx, &mut errors);
    require_removable(ctx, &mut errors)?;
    require_lock_free(ctx, &mut errors)?;
    errors.into_result()
}

pub fn execute_delete(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    let w = ctx.mounts().writable_for(id)?;
    w.remove_file(&id.file_path())?;
    info!(resource = %id, "resource deleted");

    ctx.drafts()
        .remove(id)
        .map_err(|e| partial(ctx, "removing the draft", e.into()))?;
    ctx.locks()
        .release(id)
        .map_err(|e| partial(ctx, "releasing the lock", e.into()))?;

    if let Err(e) = ctx.engine().indexer().deindex(id) {
        warn!(resource = %id, error = %e, "deleted resource still indexed");
        ctx.notify(Notice::warn(format!("search index not updated: {e}")).about(id));
    }
    ctx.notify(Notice::info("deleted").about(id));
    Ok(Redirect::Browse(parent_of(id)))
}

// delete-draft

pub fn validate_delete_draft(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    let id = ctx.id();
    if !ctx.drafts().exists(id) {
        errors.push(ErrorKind::NotFound, format!("no draft for {id}"));
    }
    require_writable(ctx, &mut errors)?;
    require_lock_free(ctx, &mut errors)?;
    errors.into_result()
}

pub fn execute_delete_draft(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    ctx.drafts().remove(id)?;
    ctx.notify(Notice::info("draft deleted").about(id));
    Ok(ctx.success(Redirect::Edit(id.clone())))
}

// delete-path

pub fn validate_delete_path(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    let id = ctx.id();
    let path = id.file_path();

    if id.path.is_empty() {
        errors.push(
            ErrorKind::Validation,
            "refusing to delete the top-level directory",
        );
    } else if !ctx.is_dir() {
        errors.push(ErrorKind::NotFound, format!("not a directory: {id}"));
    } else {
        let entries = ctx.mounts().resolve(&id.fsid, &path)?.list_dir(&path)?;
        if !entries.is_empty() {
            errors.push(
                ErrorKind::Validation,
                format!("directory is not empty: {id} has {} entries", entries.len()),
            );
        }
    }
    if let Err(e) = ctx.mounts().writable(&id.fsid, &path) {
        errors.absorb(e.into())?;
    }
    errors.into_result()
}

pub fn execute_delete_path(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    let path = id.file_path();
    ctx.mounts().writable(&id.fsid, &path)?.remove_dir(&path)?;
    info!(resource = %id, "directory deleted");
    ctx.notify(Notice::info("directory deleted").about(id));
    Ok(Redirect::Browse(parent_of(id)))
}

// commit

pub fn validate_commit(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    if ctx.form().get("content").is_none() {
        errors.field("content", "content is required");
    }
    require_resource(ctx, &mut errors);
    require_writable(ctx, &mut errors)?;
    require_lock_free(ctx, &mut errors)?;
    errors.into_result()
}

pub fn execute_commit(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    let content = ctx.form().get("content").unwrap_or_default();
    ctx.locks().acquire(ctx.editor(), id)?;
    ctx.drafts().write(id, content.as_bytes())?;
    ctx.notify(Notice::info("draft saved").about(id));
    Ok(ctx.success(Redirect::Edit(id.clone())))
}

// cancel

pub fn validate_cancel(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    require_writable(ctx, &mut errors)?;
    require_lock_free(ctx, &mut errors)?;
    errors.into_result()
}

pub fn execute_cancel(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    if ctx.form().is_truthy("cancel~discard") {
        ctx.drafts().remove(id)?;
        ctx.notify(Notice::info("draft discarded").about(id));
    }
    if ctx.locks().status(id)?.is_held_by(ctx.editor()) {
        ctx.locks().release(id)?;
    }
    Ok(ctx.success(Redirect::View(id.clone())))
}

// index-page, de-index-page

pub fn validate_index(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    require_resource(ctx, &mut errors);
    errors.into_result()
}

pub fn execute_index(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    let bytes = ctx.mounts().resolve_for(id)?.read(&id.file_path())?;
    ctx.engine().indexer().index(id, &bytes)?;
    ctx.notify(Notice::info("added to the search index").about(id));
    Ok(Redirect::Stay)
}

pub fn execute_deindex(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    ctx.engine().indexer().deindex(id)?;
    ctx.notify(Notice::info("removed from the search index").about(id));
    Ok(Redirect::Stay)
}

// create-page, create-menu

/// A resource `create-page` or `create-menu` would write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    /// Where it goes.
    pub id: ResourceIdentity,
    /// Its content kind.
    pub kind: ContentKind,
    /// Initial content from the archetype.
    pub body: Vec<u8>,
}

/// Build the new resource from `<op>~dst-*` fields.
///
/// The directory defaults to the addressed directory, or the addressed
/// file's parent. A name without an extension gets `~dst-format`, or the
/// kind's default.
pub fn new_resource(ctx: &OpContext<'_>) -> Result<NewResource, OpError> {
    let mut errors = ValidationErrors::new();
    let id = ctx.id();
    let op = ctx.op();

    let kind = match op {
        OperationKind::CreateMenu => ContentKind::Menu,
        _ => ctx.kind(),
    };
    let fsid = destination_fsid(ctx, &mut errors);
    let code = destination_code(ctx, &mut errors);
    let base = if ctx.is_dir() {
        id.path.as_str()
    } else {
        id.parent_dir()
    };
    let dir = destination_dir(ctx, base);

    let name = match form_name(ctx, "dst-name", &mut errors) {
        Some(name) => Some(name),
        None if ctx.scoped("dst-name").is_some() => None,
        None => {
            errors.field(format!("{op}~dst-name"), "file name required");
            None
        }
    };
    let extension = match ctx.scoped("dst-format") {
        Some(raw) => raw.trim_start_matches('.').to_ascii_lowercase(),
        None => kind.default_extension().to_string(),
    };

    let archetype = ctx.scoped("dst-archetype");
    let body = ctx.engine().renderer().archetype(kind, archetype);
    if body.is_none() {
        errors.field(
            format!("{op}~dst-archetype"),
            format!("unknown archetype '{}'", archetype.unwrap_or("default")),
        );
    }

    errors.into_result()?;
    let mut name = name.unwrap_or_default();
    if !name.contains('.') && !extension.is_empty() {
        name = format!("{name}.{extension}");
    }
    Ok(NewResource {
        id: ResourceIdentity::new(fsid, code, paths::join(&[&dir, &name])),
        kind,
        body: body.unwrap_or_default(),
    })
}

pub fn validate_create(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    match new_resource(ctx) {
        Ok(new) => {
            if let Err(e) = ctx.mounts().writable_for(&new.id) {
                errors.absorb(e.into())?;
            } else if ctx.mounts().exists(&new.id.fsid, &new.id.file_path()) {
                errors.push(
                    ErrorKind::AlreadyExists,
                    format!("destination already exists: {}", new.id),
                );
            }
        }
        Err(e) => errors.absorb(e)?,
    }
    errors.into_result()
}

pub fn execute_create(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let new = new_resource(ctx)?;
    let path = new.id.file_path();
    let w = ctx.mounts().writable_for(&new.id)?;
    match w.create_new(&path, &new.body) {
        Ok(()) => {}
        Err(FsError::Unsupported { .. }) if !w.exists(&path) => w.write(&path, &new.body)?,
        Err(FsError::Unsupported { .. }) => {
            return Err(FsError::AlreadyExists(new.id.canonical()).into())
        }
        Err(e) => return Err(e.into()),
    }
    info!(resource = %new.id, kind = %new.kind, "resource created");
    ctx.locks().acquire(ctx.editor(), &new.id)?;
    ctx.notify(Notice::info(format!("created {}", new.kind)).about(&new.id));
    Ok(Redirect::Edit(new.id))
}

// change

pub fn validate_change(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    if ctx.form().scoped_fields("change").next().is_none() {
        errors.field("change", "no fields to change");
    }
    if !ctx.kind().has_front_matter() {
        errors.push(
            ErrorKind::Validation,
            format!("{} resources have no front matter", ctx.kind()),
        );
    }
    require_resource(ctx, &mut errors);
    require_writable(ctx, &mut errors)?;
    require_lock_free(ctx, &mut errors)?;
    errors.into_result()
}

pub fn execute_change(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let id = ctx.id();
    ctx.locks().acquire(ctx.editor(), id)?;
    let front_matter = ctx.engine().front_matter();
    let mut body = ctx.drafts().read_current(id)?;
    let mut changed = 0;
    for (key, value) in ctx.form().scoped_fields("change") {
        body = front_matter.set(&body, key, value.trim())?;
        changed += 1;
    }
    ctx.drafts().write(id, &body)?;
    ctx.notify(Notice::info(format!("updated {changed} field(s)")).about(id));
    Ok(ctx.success(Redirect::Edit(id.clone())))
}

// search

fn query<'a>(ctx: &OpContext<'a>) -> Option<&'a str> {
    ctx.form().value("q").or_else(|| ctx.scoped("q"))
}

pub fn validate_search(ctx: &OpContext<'_>) -> Result<(), OpError> {
    let mut errors = ValidationErrors::new();
    if query(ctx).is_none() {
        errors.field("q", "search query required");
    }
    if !ctx.mounts().contains(&ctx.id().fsid) {
        errors.push(
            ErrorKind::FsNotFound,
            format!("filesystem not found: {}", ctx.id().fsid),
        );
    }
    errors.into_result()
}

pub fn execute_search(ctx: &mut OpContext<'_>) -> Result<Redirect, OpError> {
    let q = query(ctx).unwrap_or_default();
    let hits = ctx.engine().indexer().search(&ctx.id().fsid, q)?;
    ctx.notify(Notice::info(format!("{} result(s) for '{q}'", hits.len())));
    for hit in &hits {
        ctx.notify(Notice::info("match").about(hit));
    }
    Ok(Redirect::Stay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{Indexer, MemoryIndexer, MemoryNotices};
    use crate::core::types::{EditorId, FsId};
    use crate::engine::form::Form;
    use crate::engine::{Engine, Request};
    use crate::mount::{MemFs, MountPoint, MountTable, ReadFs};
    use std::sync::Arc;

    fn engine(fs: Arc<MemFs>) -> Engine {
        let table = MountTable::new().with(MountPoint::read_write(
            FsId::new("content").expect("fsid"),
            "",
            fs.clone(),
            fs,
        ));
        Engine::builder(table)
            .kind(FsId::new("content").expect("fsid"), ContentKind::Page)
            .notices(Arc::new(MemoryNotices::new()))
            .build()
    }

    fn request(editor: &str, path: &str, form: Form) -> Request {
        Request::new(
            EditorId::new(editor).expect("editor"),
            ResourceIdentity::parse("content", "en", path).expect("identity"),
            form,
        )
    }

    fn problems(result: Result<(), OpError>) -> ValidationErrors {
        match result {
            Err(OpError::Invalid(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn commit_collects_every_problem() {
        let fs = Arc::new(
            MemFs::new()
                .with_file("en/a.md", b"x")
                .with_file("en/a.md.~lock", b"bob"),
        );
        let engine = engine(fs);
        let req = request("alice", "a.md", Form::new().with("submit", "commit"));
        let ctx = OpContext::new(&engine, &req, OperationKind::Commit);
        let errors = problems(validate_commit(&ctx));
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(ErrorKind::Validation));
        assert!(errors.contains(ErrorKind::LockConflict));
    }

    #[test]
    fn commit_locks_and_writes_draft() {
        let fs = Arc::new(MemFs::new().with_file("en/a.md", b"x"));
        let engine = engine(fs.clone());
        let req = request(
            "alice",
            "a.md",
            Form::new().with("submit", "commit").with("content", "y"),
        );
        let mut ctx = OpContext::new(&engine, &req, OperationKind::Commit);
        validate_commit(&ctx).expect("valid");
        let redirect = execute_commit(&mut ctx).expect("commit");
        assert_eq!(redirect, Redirect::Edit(req.resource.clone()));
        assert_eq!(fs.read("en/a.md.~draft").expect("draft"), b"y");
        assert_eq!(fs.read("en/a.md.~lock").expect("lock"), b"alice");
        assert_eq!(fs.read("en/a.md").expect("canonical"), b"x");
    }

    #[test]
    fn unlock_requires_holding_the_lock() {
        let fs = Arc::new(MemFs::new().with_file("en/a.md", b"x"));
        let engine = engine(fs);
        let req = request("alice", "a.md", Form::new());
        let ctx = OpContext::new(&engine, &req, OperationKind::Unlock);
        let errors = problems(validate_unlock(&ctx));
        assert_eq!(errors.iter().next().expect("problem").message, "content/en/a.md is not locked");
    }

    #[test]
    fn delete_path_refuses_non_empty_directory() {
        let fs = Arc::new(MemFs::new().with_file("en/blog/a.md", b"x"));
        let engine = engine(fs);
        let req = request("alice", "blog", Form::new());
        let ctx = OpContext::new(&engine, &req, OperationKind::DeletePath);
        let errors = problems(validate_delete_path(&ctx));
        assert!(errors.to_string().contains("directory is not empty"));
    }

    #[test]
    fn delete_path_removes_empty_directory() {
        let fs = Arc::new(MemFs::new().with_dir("en/blog"));
        let engine = engine(fs.clone());
        let req = request("alice", "blog", Form::new());
        let mut ctx = OpContext::new(&engine, &req, OperationKind::DeletePath);
        validate_delete_path(&ctx).expect("valid");
        let redirect = execute_delete_path(&mut ctx).expect("delete");
        assert_eq!(redirect.to_string(), "browse content/en/");
        assert!(!fs.is_dir("en/blog"));
    }

    #[test]
    fn delete_removes_resource_and_sidecars() {
        let fs = Arc::new(
            MemFs::new()
                .with_file("en/blog/a.md", b"x")
                .with_file("en/blog/a.md.~draft", b"y")
                .with_file("en/blog/a.md.~lock", b"alice"),
        );
        let engine = engine(fs.clone());
        let req = request("alice", "blog/a.md", Form::new());
        let mut ctx = OpContext::new(&engine, &req, OperationKind::Delete);
        validate_delete(&ctx).expect("valid");
        let redirect = execute_delete(&mut ctx).expect("delete");
        assert_eq!(redirect.to_string(), "browse content/en/blog/");
        assert!(fs.snapshot().is_empty());
    }

    #[test]
    fn delete_reports_leftover_lock() {
        let fs = Arc::new(
            MemFs::new()
                .with_file("en/a.md", b"x")
                .with_file("en/a.md.~lock", b"alice"),
        );
        fs.fail_remove("en/a.md.~lock");
        let engine = engine(fs.clone());
        let req = request("alice", "a.md", Form::new());
        let mut ctx = OpContext::new(&engine, &req, OperationKind::Delete);
        let err = execute_delete(&mut ctx).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Partial));
        assert!(err.to_string().contains("en/a.md.~lock"));
    }

    #[test]
    fn view_finds_draft_only_resources() {
        let fs = Arc::new(MemFs::new().with_file("en/new.md.~draft", b"y"));
        let engine = engine(fs);
        let req = request("alice", "new.md", Form::new());
        let mut ctx = OpContext::new(&engine, &req, OperationKind::View);
        validate_view(&ctx).expect("valid");
        assert_eq!(
            execute_view(&mut ctx).expect("view"),
            Redirect::View(req.resource.clone())
        );

        let missing = request("alice", "gone.md", Form::new());
        let ctx = OpContext::new(&engine, &missing, OperationKind::View);
        assert!(problems(validate_view(&ctx)).contains(ErrorKind::NotFound));
    }

    #[test]
    fn delete_draft_keeps_published_content() {
        let fs = Arc::new(
            MemFs::new()
                .with_file("en/a.md", b"x")
                .with_file("en/a.md.~draft", b"y"),
        );
        let engine = engine(fs.clone());
        let req = request("alice", "a.md", Form::new());
        let mut ctx = OpContext::new(&engine, &req, OperationKind::DeleteDraft);
        validate_delete_draft(&ctx).expect("valid");
        execute_delete_draft(&mut ctx).expect("delete draft");
        assert!(!fs.exists("en/a.md.~draft"));
        assert_eq!(fs.read("en/a.md").expect("canonical"), b"x");

        let ctx = OpContext::new(&engine, &req, OperationKind::DeleteDraft);
        assert!(problems(validate_delete_draft(&ctx)).contains(ErrorKind::NotFound));
    }

    #[test]
    fn cancel_with_discard_drops_draft_and_lock() {
        let fs = Arc::new(
            MemFs::new()
                .with_file("en/a.md", b"x")
                .with_file("en/a.md.~draft", b"y")
                .with_file("en/a.md.~lock", b"alice"),
        );
        let engine = engine(fs.clone());
        let req = request("alice", "a.md", Form::new().with("cancel~discard", "yes"));
        let mut ctx = OpContext::new(&engine, &req, OperationKind::Cancel);
        validate_cancel(&ctx).expect("valid");
        execute_cancel(&mut ctx).expect("cancel");
        let files: Vec<String> = fs.snapshot().into_keys().collect();
        assert_eq!(files, vec!["en/a.md".to_string()]);
    }

    #[test]
    fn retake_warns_previous_holder() {
        let fs = Arc::new(
            MemFs::new()
                .with_file("en/a.md", b"x")
                .with_file("en/a.md.~lock", b"bob"),
        );
        let engine = engine(fs.clone());
        let req = request("alice", "a.md", Form::new());
        let mut ctx = OpContext::new(&engine, &req, OperationKind::Retake);
        validate_retake(&ctx).expect("valid");
        execute_retake(&mut ctx).expect("retake");
        assert_eq!(fs.read("en/a.md.~lock").expect("lock"), b"alice");
        let notices = ctx.take_notices();
        assert!(notices[0].message.contains("from bob"));
    }

    #[test]
    fn create_page_uses_archetype_and_default_extension() {
        let fs = Arc::new(MemFs::new().with_dir("en/blog"));
        let engine = engine(fs.clone());
        let req = request(
            "alice",
            "blog",
            Form::new()
                .with("submit", "create-page")
                .with("create-page~dst-name", "Hello World"),
        );
        let mut ctx = OpContext::new(&engine, &req, OperationKind::CreatePage);
        validate_create(&ctx).expect("valid");
        let redirect = execute_create(&mut ctx).expect("create");
        assert_eq!(redirect.to_string(), "edit content/en/blog/hello-world.md");
        assert_eq!(
            fs.read("en/blog/hello-world.md").expect("created"),
            b"---\ntitle: \n---\n"
        );
        assert_eq!(fs.read("en/blog/hello-world.md.~lock").expect("lock"), b"alice");
    }

    #[test]
    fn create_refuses_existing_destination_and_unknown_archetype() {
        let fs = Arc::new(MemFs::new().with_file("en/taken.md", b"x"));
        let engine = engine(fs);
        let req = request(
            "alice",
            "taken.md",
            Form::new()
                .with("create-page~dst-name", "taken")
                .with("create-page~dst-archetype", "nope"),
        );
        let ctx = OpContext::new(&engine, &req, OperationKind::CreatePage);
        let errors = problems(validate_create(&ctx));
        assert!(errors.to_string().contains("unknown archetype 'nope'"));

        let req = request("alice", "taken.md", Form::new().with("create-page~dst-name", "taken"));
        let ctx = OpContext::new(&engine, &req, OperationKind::CreatePage);
        assert!(problems(validate_create(&ctx)).contains(ErrorKind::AlreadyExists));
    }

    #[test]
    fn change_sets_front_matter_on_a_draft() {
        let fs = Arc::new(MemFs::new().with_file("en/a.md", b"---\ntitle: Old\n---\nBody"));
        let engine = engine(fs.clone());
        let req = request(
            "alice",
            "a.md",
            Form::new().with("change~title", " New "),
        );
        let mut ctx = OpContext::new(&engine, &req, OperationKind::Change);
        validate_change(&ctx).expect("valid");
        execute_change(&mut ctx).expect("change");
        let draft = fs.read("en/a.md.~draft").expect("draft");
        assert_eq!(
            engine.front_matter().get(&draft, "title").as_deref(),
            Some("New")
        );
        assert_eq!(fs.read("en/a.md").expect("canonical"), b"---\ntitle: Old\n---\nBody");
    }

    #[test]
    fn search_reports_hits_as_notices() {
        let fs = Arc::new(MemFs::new().with_file("en/a.md", b"x"));
        let indexer = Arc::new(MemoryIndexer::new());
        let hit = ResourceIdentity::parse("content", "en", "a.md").expect("identity");
        indexer.index(&hit, b"Rust is fun").expect("index");
        let table = MountTable::new().with(MountPoint::read_write(
            FsId::new("content").expect("fsid"),
            "",
            fs.clone(),
            fs,
        ));
        let engine = Engine::builder(table).indexer(indexer).build();
        let req = request("alice", "a.md", Form::new().with("q", "rust"));
        let mut ctx = OpContext::new(&engine, &req, OperationKind::Search);
        validate_search(&ctx).expect("valid");
        assert_eq!(execute_search(&mut ctx).expect("search"), Redirect::Stay);
        let notices = ctx.take_notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[1].resource.as_deref(), Some("content/en/a.md"));
    }
}
