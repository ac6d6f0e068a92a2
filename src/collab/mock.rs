//! collab::mock
//!
//! Scriptable collaborators for deterministic testing.
//!
//! # Design
//!
//! [`MockRenderer`] and [`MockIndexer`] record every call and fail on
//! demand, so tests can drive the render-demotion and index-failure paths
//! without a real renderer or search backend. Clones share state.
//!
//! # Example
//!
//! ```
//! use editflow::collab::mock::{MockRenderer, RenderFailure};
//! use editflow::collab::{ContentKind, RenderError, Renderer};
//! use editflow::core::identity::ResourceIdentity;
//!
//! let renderer = MockRenderer::new();
//! renderer.fail_with(RenderFailure::Invalid("unclosed tag".into()));
//!
//! let id = ResourceIdentity::parse("content", "en", "a.md").unwrap();
//! assert_eq!(
//!     renderer.render(ContentKind::Page, &id, b"x"),
//!     Err(RenderError::Invalid("unclosed tag".into()))
//! );
//! assert_eq!(renderer.renders(), 1);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::index::{IndexError, Indexer, MemoryIndexer};
use super::render::{NoopRenderer, RenderError, Renderer};
use super::ContentKind;
use crate::core::identity::ResourceIdentity;
use crate::core::types::FsId;

/// How the mock renderer should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderFailure {
    /// Report the content as broken.
    Invalid(String),
    /// Report a renderer crash.
    Engine(String),
}

#[derive(Debug, Default)]
struct MockRendererInner {
    fail_with: Option<RenderFailure>,
    fail_marker: Option<Vec<u8>>,
    renders: usize,
}

/// Renderer double.
///
/// Succeeds by default. Fails for every call after
/// [`fail_with`](MockRenderer::fail_with), or only for content containing
/// the bytes given to [`fail_on_content`](MockRenderer::fail_on_content).
#[derive(Debug, Clone, Default)]
pub struct MockRenderer {
    inner: Arc<Mutex<MockRendererInner>>,
}

impl MockRenderer {
    /// Create a renderer that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockRendererInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail every subsequent render.
    pub fn fail_with(&self, failure: RenderFailure) {
        self.state().fail_with = Some(failure);
    }

    /// Report content containing `marker` as invalid.
    pub fn fail_on_content(&self, marker: &[u8]) {
        self.state().fail_marker = Some(marker.to_vec());
    }

    /// Stop failing.
    pub fn clear(&self) {
        let mut inner = self.state();
        inner.fail_with = None;
        inner.fail_marker = None;
    }

    /// Number of render calls so far.
    pub fn renders(&self) -> usize {
        self.state().renders
    }
}

impl Renderer for MockRenderer {
    fn render(
        &self,
        _kind: ContentKind,
        _id: &ResourceIdentity,
        content: &[u8],
    ) -> Result<(), RenderError> {
        let mut inner = self.state();
        inner.renders += 1;
        match &inner.fail_with {
            Some(RenderFailure::Invalid(msg)) => return Err(RenderError::Invalid(msg.clone())),
            Some(RenderFailure::Engine(msg)) => return Err(RenderError::Engine(msg.clone())),
            None => {}
        }
        if let Some(marker) = &inner.fail_marker {
            if !marker.is_empty() && content.windows(marker.len()).any(|w| w == marker.as_slice())
            {
                return Err(RenderError::Invalid("content failed to render".into()));
            }
        }
        Ok(())
    }

    fn archetype(&self, kind: ContentKind, name: Option<&str>) -> Option<Vec<u8>> {
        NoopRenderer.archetype(kind, name)
    }
}

/// Recorded index call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCall {
    /// `index` for the canonical address.
    Index(String),
    /// `deindex` for the canonical address.
    Deindex(String),
}

#[derive(Debug, Default)]
struct MockIndexerInner {
    calls: Vec<IndexCall>,
    unavailable: bool,
}

/// Indexer double backed by a [`MemoryIndexer`], recording calls.
#[derive(Debug, Clone, Default)]
pub struct MockIndexer {
    index: Arc<MemoryIndexer>,
    inner: Arc<Mutex<MockIndexerInner>>,
}

impl MockIndexer {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockIndexerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every mutating call fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<IndexCall> {
        self.state().calls.clone()
    }
}

impl Indexer for MockIndexer {
    fn index(&self, id: &ResourceIdentity, content: &[u8]) -> Result<(), IndexError> {
        let mut inner = self.state();
        inner.calls.push(IndexCall::Index(id.canonical()));
        if inner.unavailable {
            return Err(IndexError::Unavailable("mock index is down".into()));
        }
        self.index.index(id, content)
    }

    fn deindex(&self, id: &ResourceIdentity) -> Result<(), IndexError> {
        let mut inner = self.state();
        inner.calls.push(IndexCall::Deindex(id.canonical()));
        if inner.unavailable {
            return Err(IndexError::Unavailable("mock index is down".into()));
        }
        self.index.deindex(id)
    }

    fn is_indexed(&self, id: &ResourceIdentity) -> bool {
        self.index.is_indexed(id)
    }

    fn search(&self, fsid: &FsId, query: &str) -> Result<Vec<ResourceIdentity>, IndexError> {
        self.index.search(fsid, query)
    }
}
