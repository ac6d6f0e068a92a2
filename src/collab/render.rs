//! collab::render
//!
//! Render validation and archetypes.
//!
//! # Design
//!
//! The engine never renders for output. It asks the renderer whether a
//! candidate body *would* render, to decide whether publish should demote
//! the resource's available actions. Two failure kinds are distinguished:
//!
//! - [`RenderError::Invalid`]: the content is broken. Expected; publish
//!   continues with a warning.
//! - [`RenderError::Engine`]: the renderer itself failed. Unexpected;
//!   propagated to the caller.

use std::fmt::Debug;

use thiserror::Error;

use super::frontmatter::LineFrontMatter;
use super::ContentKind;
use crate::core::identity::ResourceIdentity;

/// Errors from render validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The content does not render.
    #[error("{0}")]
    Invalid(String),

    /// The renderer failed independently of the content.
    #[error("renderer failed: {0}")]
    Engine(String),
}

/// Render validation and new-resource skeletons, per content kind.
pub trait Renderer: Send + Sync + Debug {
    /// Check that `content` renders as a resource of `kind`.
    fn render(
        &self,
        kind: ContentKind,
        id: &ResourceIdentity,
        content: &[u8],
    ) -> Result<(), RenderError>;

    /// Initial content for a new resource. `None` if the archetype is unknown.
    fn archetype(&self, kind: ContentKind, name: Option<&str>) -> Option<Vec<u8>>;
}

fn skeleton(kind: ContentKind) -> Vec<u8> {
    match kind {
        ContentKind::Page => b"---\ntitle: \n---\n".to_vec(),
        ContentKind::Menu => b"[]\n".to_vec(),
        ContentKind::Locale | ContentKind::Theme | ContentKind::File => Vec::new(),
    }
}

/// Accepts everything; archetypes are bare skeletons.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRenderer;

impl Renderer for NoopRenderer {
    fn render(&self, _: ContentKind, _: &ResourceIdentity, _: &[u8]) -> Result<(), RenderError> {
        Ok(())
    }

    fn archetype(&self, kind: ContentKind, name: Option<&str>) -> Option<Vec<u8>> {
        match name {
            None | Some("default") => Some(skeleton(kind)),
            Some(_) => None,
        }
    }
}

/// Structural validation without rendering.
///
/// - pages: UTF-8, and an opened front-matter block must be closed
/// - menus: valid JSON
/// - locale catalogs: valid TOML
/// - theme files: UTF-8
/// - raw files: anything
///
/// # Example
///
/// ```
/// use editflow::collab::{ContentKind, Renderer, TemplateRenderer};
/// use editflow::core::identity::ResourceIdentity;
///
/// let id = ResourceIdentity::parse("menus", "en", "main.json").unwrap();
/// assert!(TemplateRenderer.render(ContentKind::Menu, &id, b"[]").is_ok());
/// assert!(TemplateRenderer.render(ContentKind::Menu, &id, b"[").is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl Renderer for TemplateRenderer {
    fn render(
        &self,
        kind: ContentKind,
        _id: &ResourceIdentity,
        content: &[u8],
    ) -> Result<(), RenderError> {
        if kind == ContentKind::File {
            return Ok(());
        }
        let text = std::str::from_utf8(content)
            .map_err(|e| RenderError::Invalid(format!("content is not UTF-8: {e}")))?;
        match kind {
            ContentKind::Page => {
                if LineFrontMatter::has_unclosed_block(text) {
                    return Err(RenderError::Invalid(
                        "front matter block is not closed".into(),
                    ));
                }
                Ok(())
            }
            ContentKind::Menu => serde_json::from_str::<serde_json::Value>(text)
                .map(|_| ())
                .map_err(|e| RenderError::Invalid(format!("menu is not valid JSON: {e}"))),
            ContentKind::Locale => toml::from_str::<toml::Table>(text)
                .map(|_| ())
                .map_err(|e| RenderError::Invalid(format!("catalog is not valid TOML: {e}"))),
            ContentKind::Theme | ContentKind::File => Ok(()),
        }
    }

    fn archetype(&self, kind: ContentKind, name: Option<&str>) -> Option<Vec<u8>> {
        match (kind, name) {
            (_, None | Some("default")) => Some(skeleton(kind)),
            (ContentKind::Page, Some("post")) => {
                let date = chrono::Utc::now().format("%Y-%m-%d");
                Some(format!("---\ntitle: \ndate: {date}\ndraft: true\n---\n").into_bytes())
            }
            (ContentKind::Page, Some("redirect")) => {
                Some(b"---\ntitle: \nredirect: \n---\n".to_vec())
            }
            (_, Some("empty")) => Some(Vec::new()),
            _ => None,
        }
    }
}
