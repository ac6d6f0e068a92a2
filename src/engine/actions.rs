//! engine::actions
//!
//! The operations offered for a resource, derived from its current state.
//!
//! # Architecture
//!
//! Actions are recomputed on every call from the sidecars, the caller's
//! permissions and (when the render gate is on) a fresh render of the
//! current content. Nothing is cached between requests, so a demotion
//! lifts as soon as the content renders again.
//!
//! # Demotion
//!
//! Content that does not render loses `translate` and `de-index-page`.
//! A renderer crash is logged and demotes nothing.

use serde::Serialize;
use tracing::{debug, warn};

use super::context::OpError;
use super::operation::OperationKind;
use super::Engine;
use crate::collab::RenderError;
use crate::core::identity::ResourceIdentity;
use crate::core::types::EditorId;

/// Operations removed while the content does not render.
pub const DEMOTED: [OperationKind; 2] = [OperationKind::Translate, OperationKind::DeIndexPage];

/// The state actions were derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceState {
    /// The path is a directory.
    pub is_dir: bool,
    /// The canonical file exists.
    pub exists: bool,
    /// A draft exists.
    pub has_draft: bool,
    /// A read-write mount covers the path.
    pub writable: bool,
    /// The caller holds the lock.
    pub locked_by_me: bool,
    /// Another editor holds the lock.
    pub locked_by_other: bool,
    /// The resource is in the search index.
    pub indexed: bool,
    /// The current content failed the render gate.
    pub demoted: bool,
}

/// The operations offered for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actions {
    /// The resource.
    pub resource: ResourceIdentity,
    /// What the offer was based on.
    pub state: ResourceState,
    /// Offered operations, in registry key order.
    pub ops: Vec<OperationKind>,
}

impl Actions {
    /// Whether `op` is offered.
    pub fn offers(&self, op: OperationKind) -> bool {
        self.ops.contains(&op)
    }
}

/// Read the state of `id` as seen by `editor`.
pub fn resource_state(
    engine: &Engine,
    id: &ResourceIdentity,
    editor: &EditorId,
) -> Result<ResourceState, OpError> {
    let is_dir = engine.is_dir(id);
    let exists = engine.mounts().resource_exists(id);
    let has_draft = !is_dir && engine.drafts().exists(id);
    let writable = engine.mounts().writable_for(id).is_ok();
    let lock = if exists || has_draft {
        engine.locks().status(id)?
    } else {
        Default::default()
    };

    let mut state = ResourceState {
        is_dir,
        exists,
        has_draft,
        writable,
        locked_by_me: lock.is_held_by(editor),
        locked_by_other: lock.is_locked_by_other(editor),
        indexed: exists && engine.indexer().is_indexed(id),
        demoted: false,
    };
    if engine.settings().render_gate && (exists || has_draft) {
        state.demoted = fails_render(engine, id)?;
    }
    Ok(state)
}

fn fails_render(engine: &Engine, id: &ResourceIdentity) -> Result<bool, OpError> {
    let content = engine.drafts().read_current(id)?;
    match engine.renderer().render(engine.kind_of(&id.fsid), id, &content) {
        Ok(()) => Ok(false),
        Err(RenderError::Invalid(message)) => {
            debug!(resource = %id, error = %message, "demoting actions");
            Ok(true)
        }
        Err(e) => {
            warn!(resource = %id, error = %e, "render check failed");
            Ok(false)
        }
    }
}

/// Whether `op` applies to a resource in `state`, ignoring permissions.
pub fn applies(op: OperationKind, state: &ResourceState, has_front_matter: bool) -> bool {
    use OperationKind::*;

    let s = state;
    let present = s.exists || s.has_draft;
    let free = s.writable && !s.locked_by_other;
    if s.is_dir {
        return match op {
            View | Search | CreatePage | CreateMenu => true,
            DeletePath => s.writable,
            _ => false,
        };
    }
    match op {
        View => present,
        Search => true,
        CreatePage | CreateMenu => true,
        Edit | Delete => s.exists && free,
        Commit => s.exists && free,
        Change => s.exists && free && has_front_matter,
        Unlock => s.writable && s.locked_by_me,
        Retake => s.exists && s.writable && s.locked_by_other,
        DeleteDraft => s.has_draft && free,
        Publish => s.has_draft && free,
        Cancel => free && (s.locked_by_me || s.has_draft),
        Move => s.exists && free && !s.has_draft,
        Copy => s.exists,
        Translate => s.exists && !s.demoted,
        IndexPage => s.exists && !s.indexed,
        DeIndexPage => s.exists && s.indexed && !s.demoted,
        DeletePath => false,
    }
}

/// The operations `editor` is offered for `id`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use editflow::core::identity::ResourceIdentity;
/// use editflow::core::types::{EditorId, FsId};
/// use editflow::engine::operation::OperationKind;
/// use editflow::engine::Engine;
/// use editflow::mount::{MemFs, MountPoint, MountTable};
///
/// let fs = Arc::new(MemFs::new().with_file("en/about.md", b"hi"));
/// let table = MountTable::new().with(MountPoint::read_write(
///     FsId::new("content").unwrap(), "", fs.clone(), fs,
/// ));
/// let engine = Engine::builder(table).build();
/// let id = ResourceIdentity::parse("content", "en", "about.md").unwrap();
/// let actions = engine.available_actions(&id, &EditorId::new("alice").unwrap()).unwrap();
/// assert!(actions.offers(OperationKind::Edit));
/// assert!(!actions.offers(OperationKind::Publish));
/// ```
pub fn available_actions(
    engine: &Engine,
    id: &ResourceIdentity,
    editor: &EditorId,
) -> Result<Actions, OpError> {
    let state = resource_state(engine, id, editor)?;
    let permissions = engine.authorizer().permissions(editor);
    let has_front_matter = engine.kind_of(&id.fsid).has_front_matter();
    let registry = engine.registry();

    let ops = OperationKind::ALL
        .into_iter()
        .filter(|op| applies(*op, &state, has_front_matter))
        .filter(|op| {
            registry
                .descriptor(*op)
                .is_some_and(|d| permissions.has(d.permission))
        })
        .collect();
    Ok(Actions {
        resource: id.clone(),
        state,
        ops,
    })
}
