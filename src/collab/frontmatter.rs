//! collab::frontmatter
//!
//! Reading and writing individual front-matter keys.
//!
//! The engine only needs two things from the front-matter format: tag a
//! translation with a back-reference, and let `change` set a field. The
//! syntax itself belongs to the content type, so it sits behind
//! [`FrontMatter`].

use std::fmt::Debug;

use thiserror::Error;

/// Errors from front-matter editing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrontMatterError {
    /// The body is not text.
    #[error("content is not UTF-8 text")]
    NotText,

    /// The front-matter block is opened but never closed.
    #[error("front matter block is not closed")]
    Unclosed,

    /// Key or value cannot be represented.
    #[error("invalid front matter field '{0}'")]
    InvalidField(String),
}

/// Key-level access to a body's front matter.
pub trait FrontMatter: Send + Sync + Debug {
    /// The value of `key`, if present.
    fn get(&self, body: &[u8], key: &str) -> Option<String>;

    /// A copy of `body` with `key` set to `value`.
    fn set(&self, body: &[u8], key: &str, value: &str) -> Result<Vec<u8>, FrontMatterError>;
}

const DELIMITER: &str = "---";

/// Line-based `key: value` front matter delimited by `---` lines.
///
/// # Example
///
/// ```
/// use editflow::collab::{FrontMatter, LineFrontMatter};
///
/// let fm = LineFrontMatter;
/// let body = fm.set(b"Hello", "translates", "content/en/a.md").unwrap();
/// assert_eq!(body, b"---\ntranslates: content/en/a.md\n---\nHello");
/// assert_eq!(fm.get(&body, "translates").as_deref(), Some("content/en/a.md"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFrontMatter;

impl LineFrontMatter {
    /// Whether `text` opens a front-matter block without closing it.
    pub fn has_unclosed_block(text: &str) -> bool {
        matches!(split(text), Err(FrontMatterError::Unclosed))
    }
}

/// The block's lines and the remaining body, or `None` if there is no block.
fn split(text: &str) -> Result<Option<(Vec<&str>, &str)>, FrontMatterError> {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return Ok(None);
    };
    let mut lines = Vec::new();
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == DELIMITER {
            return Ok(Some((lines, &rest[offset..])));
        }
        lines.push(trimmed);
    }
    Err(FrontMatterError::Unclosed)
}

fn key_of(line: &str) -> Option<&str> {
    line.split_once(':').map(|(k, _)| k.trim())
}

impl FrontMatter for LineFrontMatter {
    fn get(&self, body: &[u8], key: &str) -> Option<String> {
        let text = std::str::from_utf8(body).ok()?;
        let (lines, _) = split(text).ok()??;
        lines.iter().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            (k.trim() == key).then(|| v.trim().to_string())
        })
    }

    fn set(&self, body: &[u8], key: &str, value: &str) -> Result<Vec<u8>, FrontMatterError> {
        if key.is_empty() || key.contains([':', '\n']) {
            return Err(FrontMatterError::InvalidField(key.to_string()));
        }
        if value.contains('\n') {
            return Err(FrontMatterError::InvalidField(key.to_string()));
        }
        let text = std::str::from_utf8(body).map_err(|_| FrontMatterError::NotText)?;
        let field = format!("{key}: {value}");

        let (mut lines, rest) = match split(text)? {
            Some((lines, rest)) => (lines.into_iter().map(str::to_string).collect::<Vec<_>>(), rest),
            None => (Vec::new(), text),
        };
        match lines.iter_mut().find(|l| key_of(l.as_str()) == Some(key)) {
            Some(line) => *line = field,
            None => lines.push(field),
        }

        let mut out = String::with_capacity(text.len() + key.len() + value.len() + 16);
        out.push_str(DELIMITER);
        out.push('\n');
        for line in &lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(rest);
        Ok(out.into_bytes())
    }
}
