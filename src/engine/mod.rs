//! engine
//!
//! The workflow engine: turns a submitted form into exactly one operation
//! on one resource.
//!
//! # Architecture
//!
//! Every request follows the same lifecycle, enforced by [`dispatch`]:
//!
//! ```text
//! Lookup -> Gate -> Validate -> Execute -> Deliver notices
//! ```
//!
//! Operations are data: a [`Descriptor`](operation::Descriptor) in the
//! [`Registry`](operation::Registry) names the permission, the confirmation
//! key and the validation and execution steps. The [`Engine`] owns the
//! mount table, the registry and the collaborators; lock and draft
//! managers are borrowed views built per call.
//!
//! # Modules
//!
//! - [`operation`] - Operation kinds, descriptors and the registry
//! - [`capabilities`] - Permissions
//! - [`form`] - Submitted form fields
//! - [`gate`] - Permission and confirmation gating
//! - [`context`] - Per-request state and the error taxonomy
//! - [`dispatch`] - The request lifecycle
//! - [`ops`] - Single-resource operations
//! - [`transfer`] - Move, copy and translate
//! - [`rollback`] - Undo of files created by a transfer
//! - [`publish`] - The publish pipeline
//! - [`actions`] - Operations offered for a resource
//! - [`health`] - Status report and partial-completion leftovers
//!
//! # Invariants
//!
//! - The registry is immutable after construction
//! - A request that fails gating or validation writes nothing
//! - Concurrent requests coordinate only through lock sidecars
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use editflow::core::identity::ResourceIdentity;
//! use editflow::core::types::{EditorId, FsId};
//! use editflow::engine::form::Form;
//! use editflow::engine::{Engine, Request};
//! use editflow::mount::{MemFs, MountPoint, MountTable};
//!
//! let fs = Arc::new(MemFs::new().with_file("en/about.md", b"old"));
//! let table = MountTable::new().with(MountPoint::read_write(
//!     FsId::new("content").unwrap(), "", fs.clone(), fs,
//! ));
//! let engine = Engine::builder(table).build();
//!
//! let request = Request::new(
//!     EditorId::new("alice").unwrap(),
//!     ResourceIdentity::parse("content", "en", "about.md").unwrap(),
//!     Form::new().with("submit", "commit").with("content", "new"),
//! );
//! let outcome = engine.dispatch(&request).unwrap();
//! assert!(outcome.is_done());
//! ```

pub mod actions;
pub mod capabilities;
pub mod context;
pub mod dispatch;
pub mod form;
pub mod gate;
pub mod health;
pub mod operation;
pub mod ops;
pub mod publish;
pub mod rollback;
pub mod transfer;

pub use actions::Actions;
pub use capabilities::{Permission, PermissionSet};
pub use context::{ErrorKind, OpContext, OpError, Redirect, ValidationErrors};
pub use dispatch::{DispatchError, Outcome, Status};
pub use form::Form;
pub use health::StatusReport;
pub use operation::{OperationKind, Registry};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::collab::{
    AllowAll, Authorizer, ContentKind, FileNameHook, FrontMatter, Indexer, KeepSourceName,
    LineFrontMatter, MemoryIndexer, MemoryNotices, NoopRenderer, NoticeSink, Renderer,
};
use crate::core::identity::ResourceIdentity;
use crate::core::ops::{DraftManager, LockManager, LockPolicy};
use crate::core::types::{EditorId, FsId};
use crate::mount::MountTable;

/// Engine-wide behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// How lock sidecars are created.
    pub lock_policy: LockPolicy,
    /// Whether publish and the action list run the render check.
    pub render_gate: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lock_policy: LockPolicy::Exclusive,
            render_gate: true,
        }
    }
}

/// One submitted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Who is asking.
    pub editor: EditorId,
    /// The resource addressed.
    pub resource: ResourceIdentity,
    /// The submitted fields, including `submit`.
    pub form: Form,
}

impl Request {
    /// Create a request.
    pub fn new(editor: EditorId, resource: ResourceIdentity, form: Form) -> Self {
        Self {
            editor,
            resource,
            form,
        }
    }
}

/// The workflow engine.
#[derive(Debug)]
pub struct Engine {
    mounts: MountTable,
    registry: Registry,
    settings: Settings,
    kinds: BTreeMap<FsId, ContentKind>,
    authorizer: Arc<dyn Authorizer>,
    renderer: Arc<dyn Renderer>,
    indexer: Arc<dyn Indexer>,
    front_matter: Arc<dyn FrontMatter>,
    notices: Arc<dyn NoticeSink>,
    hooks: Vec<Arc<dyn FileNameHook>>,
}

impl Engine {
    /// Start building an engine over `mounts`.
    pub fn builder(mounts: MountTable) -> EngineBuilder {
        EngineBuilder::new(mounts)
    }

    /// Run one request. See [`dispatch`](dispatch::dispatch).
    pub fn dispatch(&self, request: &Request) -> Result<Outcome, DispatchError> {
        dispatch::dispatch(self, request)
    }

    /// The operations `editor` is offered for `id`.
    pub fn available_actions(
        &self,
        id: &ResourceIdentity,
        editor: &EditorId,
    ) -> Result<Actions, OpError> {
        actions::available_actions(self, id, editor)
    }

    /// The state of `id`, with any leftovers from interrupted operations.
    pub fn status(&self, id: &ResourceIdentity) -> Result<StatusReport, OpError> {
        health::status(self, id)
    }

    /// The mount table.
    pub fn mounts(&self) -> &MountTable {
        &self.mounts
    }

    /// Lock manager over the mounts.
    pub fn locks(&self) -> LockManager<'_> {
        LockManager::new(&self.mounts, self.settings.lock_policy)
    }

    /// Draft manager over the mounts.
    pub fn drafts(&self) -> DraftManager<'_> {
        DraftManager::new(&self.mounts)
    }

    /// The operation registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Behavior switches.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Content kind of a filesystem. Unconfigured filesystems hold raw
    /// files.
    pub fn kind_of(&self, fsid: &FsId) -> ContentKind {
        self.kinds.get(fsid).copied().unwrap_or_default()
    }

    /// Whether `id` addresses a directory.
    pub fn is_dir(&self, id: &ResourceIdentity) -> bool {
        let path = id.file_path();
        self.mounts
            .resolve(&id.fsid, &path)
            .map(|m| m.exists(&path) && m.is_dir(&path))
            .unwrap_or(false)
    }

    /// Permission lookup.
    pub fn authorizer(&self) -> &dyn Authorizer {
        self.authorizer.as_ref()
    }

    /// Render validation and archetypes.
    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// The search index.
    pub fn indexer(&self) -> &dyn Indexer {
        self.indexer.as_ref()
    }

    /// Front-matter codec.
    pub fn front_matter(&self) -> &dyn FrontMatter {
        self.front_matter.as_ref()
    }

    /// Notice delivery.
    pub fn notices(&self) -> &dyn NoticeSink {
        self.notices.as_ref()
    }

    /// File name hooks, in the order they are asked.
    pub fn hooks(&self) -> &[Arc<dyn FileNameHook>] {
        &self.hooks
    }
}

/// Builder for [`Engine`]. Every collaborator has an in-process default.
#[derive(Debug)]
pub struct EngineBuilder {
    engine: Engine,
}

impl EngineBuilder {
    fn new(mounts: MountTable) -> Self {
        Self {
            engine: Engine {
                mounts,
                registry: Registry::standard(),
                settings: Settings::default(),
                kinds: BTreeMap::new(),
                authorizer: Arc::new(AllowAll),
                renderer: Arc::new(NoopRenderer),
                indexer: Arc::new(MemoryIndexer::new()),
                front_matter: Arc::new(LineFrontMatter),
                notices: Arc::new(MemoryNotices::new()),
                hooks: vec![Arc::new(KeepSourceName)],
            },
        }
    }

    /// Use `authorizer` for permission lookup.
    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.engine.authorizer = authorizer;
        self
    }

    /// Use `renderer` for render checks and archetypes.
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.engine.renderer = renderer;
        self
    }

    /// Use `indexer` as the search index.
    pub fn indexer(mut self, indexer: Arc<dyn Indexer>) -> Self {
        self.engine.indexer = indexer;
        self
    }

    /// Use `front_matter` as the front-matter codec.
    pub fn front_matter(mut self, front_matter: Arc<dyn FrontMatter>) -> Self {
        self.engine.front_matter = front_matter;
        self
    }

    /// Deliver notices to `notices`.
    pub fn notices(mut self, notices: Arc<dyn NoticeSink>) -> Self {
        self.engine.notices = notices;
        self
    }

    /// Replace the file name hook chain.
    pub fn hooks(mut self, hooks: Vec<Arc<dyn FileNameHook>>) -> Self {
        self.engine.hooks = hooks;
        self
    }

    /// Set behavior switches.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.engine.settings = settings;
        self
    }

    /// Declare the content kind of one filesystem.
    pub fn kind(mut self, fsid: FsId, kind: ContentKind) -> Self {
        self.engine.kinds.insert(fsid, kind);
        self
    }

    /// Declare content kinds for several filesystems.
    pub fn kinds<I: IntoIterator<Item = (FsId, ContentKind)>>(mut self, kinds: I) -> Self {
        self.engine.kinds.extend(kinds);
        self
    }

    /// Finish.
    pub fn build(self) -> Engine {
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::{MemFs, MountPoint};

    fn engine() -> Engine {
        let fs = Arc::new(MemFs::new().with_file("en/blog/a.md", b"x"));
        let table = MountTable::new().with(MountPoint::read_write(
            FsId::new("content").expect("fsid"),
            "",
            fs.clone(),
            fs,
        ));
        Engine::builder(table)
            .kind(FsId::new("content").expect("fsid"), ContentKind::Page)
            .build()
    }

    #[test]
    fn defaults() {
        let engine = engine();
        assert!(engine.settings().render_gate);
        assert_eq!(engine.settings().lock_policy, LockPolicy::Exclusive);
        assert_eq!(engine.hooks().len(), 1);
        assert_eq!(engine.registry().len(), OperationKind::ALL.len());
    }

    #[test]
    fn kinds_default_to_raw_files() {
        let engine = engine();
        assert_eq!(
            engine.kind_of(&FsId::new("content").expect("fsid")),
            ContentKind::Page
        );
        assert_eq!(
            engine.kind_of(&FsId::new("assets").expect("fsid")),
            ContentKind::File
        );
    }

    #[test]
    fn directories() {
        let engine = engine();
        let dir = |p: &str| ResourceIdentity::parse("content", "en", p).expect("identity");
        assert!(engine.is_dir(&dir("blog")));
        assert!(engine.is_dir(&dir("")));
        assert!(!engine.is_dir(&dir("blog/a.md")));
        assert!(!engine.is_dir(&dir("missing")));
    }
}
