//! collab
//!
//! Narrow interfaces to the collaborators the workflow engine drives but
//! does not implement.
//!
//! # Modules
//!
//! - [`auth`] - Per-editor permission lookup
//! - [`render`] - Render validation and archetypes per content kind
//! - [`index`] - Search index registration and queries
//! - [`frontmatter`] - Reading and writing front-matter keys
//! - [`notices`] - Per-editor notice delivery
//! - [`hooks`] - Extension points (missing destination file name)
//! - [`mock`] - Scriptable doubles for tests
//!
//! # Architecture
//!
//! Each content type (page, menu, locale catalog, theme file, raw file) is
//! handled by the same engine; a [`ContentKind`] selects the renderer
//! behavior and archetypes. The engine holds every collaborator behind an
//! `Arc<dyn Trait>`, so implementations must be `Send + Sync`.

pub mod auth;
pub mod frontmatter;
pub mod hooks;
pub mod index;
pub mod mock;
pub mod notices;
pub mod render;

pub use auth::{AllowAll, Authorizer, RoleAuthorizer};
pub use frontmatter::{FrontMatter, FrontMatterError, LineFrontMatter};
pub use hooks::{FileNameHook, KeepSourceName};
pub use index::{IndexError, Indexer, MemoryIndexer};
pub use notices::{JournalNotices, Level, MemoryNotices, Notice, NoticeError, NoticeSink};
pub use render::{NoopRenderer, RenderError, Renderer, TemplateRenderer};

use serde::{Deserialize, Serialize};

/// The type of content a filesystem holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Rendered pages with front matter.
    Page,
    /// Navigation menus.
    Menu,
    /// Locale message catalogs.
    Locale,
    /// Theme templates and assets.
    Theme,
    /// Raw files served as-is.
    #[default]
    File,
}

impl ContentKind {
    /// The config name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Page => "page",
            ContentKind::Menu => "menu",
            ContentKind::Locale => "locale",
            ContentKind::Theme => "theme",
            ContentKind::File => "file",
        }
    }

    /// Whether resources of this kind carry front matter.
    pub fn has_front_matter(&self) -> bool {
        matches!(self, ContentKind::Page | ContentKind::Menu)
    }

    /// Default file extension for newly created resources.
    pub fn default_extension(&self) -> &'static str {
        match self {
            ContentKind::Page => "md",
            ContentKind::Menu => "json",
            ContentKind::Locale => "toml",
            ContentKind::Theme => "html",
            ContentKind::File => "txt",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
