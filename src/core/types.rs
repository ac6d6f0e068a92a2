//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`FsId`] - Name of a mounted filesystem
//! - [`EditorId`] - Opaque identity token of an editor (the lock holder)
//! - [`LocaleTag`] - Parsed `language[-REGION]` tag
//! - [`Shasum`] - SHA-256 content hash used for write verification
//! - [`UtcTimestamp`] - RFC3339 timestamp
//!
//! # Validation
//!
//! These types enforce validity at construction time. A lock file whose
//! content does not parse as an [`EditorId`] is treated as no lock at all,
//! so the validation rules here are also the self-healing rules of the
//! lock manager.
//!
//! # Examples
//!
//! ```
//! use editflow::core::types::{EditorId, FsId, LocaleTag};
//!
//! let editor = EditorId::new("alice@example.com").unwrap();
//! let fs = FsId::new("content").unwrap();
//! let tag = LocaleTag::parse("en-us").unwrap();
//! assert_eq!(tag.as_str(), "en-US");
//!
//! assert!(EditorId::new("has space").is_err());
//! assert!(FsId::new("").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid editor id: {0}")]
    InvalidEditorId(String),

    #[error("invalid filesystem id: {0}")]
    InvalidFsId(String),

    #[error("invalid locale tag: {0}")]
    InvalidLocale(String),

    #[error("invalid shasum: {0}")]
    InvalidShasum(String),
}

/// An opaque editor identity token.
///
/// This is the exact content written to a lock sidecar. Ownership checks
/// compare tokens byte for byte, so no normalization is applied.
///
/// Rules:
/// - 1 to 128 characters
/// - ASCII alphanumerics and `.`, `_`, `@`, `+`, `-` only
///
/// # Example
///
/// ```
/// use editflow::core::types::EditorId;
///
/// let id = EditorId::new("Bob_42").unwrap();
/// assert_eq!(id.as_str(), "Bob_42");
///
/// assert!(EditorId::new("").is_err());
/// assert!(EditorId::new("bob\n").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EditorId(String);

impl EditorId {
    /// Longest token accepted.
    pub const MAX_LEN: usize = 128;

    /// Create a new validated editor id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidEditorId` if the token is malformed.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Parse lock file content. Returns `None` for anything malformed.
    pub fn from_lock_content(content: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(content).ok()?;
        Self::new(text).ok()
    }

    fn validate(id: &str) -> Result<(), TypeError> {
        if id.is_empty() {
            return Err(TypeError::InvalidEditorId(
                "editor id cannot be empty".into(),
            ));
        }
        if id.len() > Self::MAX_LEN {
            return Err(TypeError::InvalidEditorId(format!(
                "editor id longer than {} characters",
                Self::MAX_LEN
            )));
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '+' | '-')))
        {
            return Err(TypeError::InvalidEditorId(format!(
                "editor id cannot contain {c:?}"
            )));
        }
        Ok(())
    }

    /// Get the editor id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EditorId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EditorId> for String {
    fn from(id: EditorId) -> Self {
        id.0
    }
}

impl AsRef<str> for EditorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EditorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A filesystem id naming a group of mount points.
///
/// Filesystem ids are kebab-case: lowercase ASCII alphanumerics and `-`,
/// not starting or ending with `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FsId(String);

impl FsId {
    /// Create a new validated filesystem id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidFsId` if the id is empty or not kebab-case.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::InvalidFsId("filesystem id cannot be empty".into()));
        }
        if id.starts_with('-') || id.ends_with('-') {
            return Err(TypeError::InvalidFsId(format!(
                "'{id}' cannot start or end with '-'"
            )));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(TypeError::InvalidFsId(format!("'{id}' is not kebab-case")));
        }
        Ok(Self(id))
    }

    /// Get the filesystem id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FsId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FsId> for String {
    fn from(id: FsId) -> Self {
        id.0
    }
}

impl std::fmt::Display for FsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `language[-REGION]` locale tag.
///
/// The language subtag is 2-3 ASCII letters (lowercased), the optional region
/// is 2 letters (uppercased) or 3 digits. `_` is accepted as a separator.
///
/// # Example
///
/// ```
/// use editflow::core::types::LocaleTag;
///
/// let tag = LocaleTag::parse("fr_ca").unwrap();
/// assert_eq!(tag.language(), "fr");
/// assert_eq!(tag.region(), Some("CA"));
/// assert_eq!(tag.to_string(), "fr-CA");
///
/// assert!(LocaleTag::parse("default").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleTag {
    tag: String,
    split: usize,
}

impl LocaleTag {
    /// Parse and normalize a locale tag.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidLocale` if the input is not a locale tag.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let mut parts = input.split(['-', '_']);
        let language = parts.next().unwrap_or_default();
        let region = parts.next();
        if parts.next().is_some() {
            return Err(TypeError::InvalidLocale(format!(
                "'{input}' has too many subtags"
            )));
        }

        if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(TypeError::InvalidLocale(format!(
                "'{input}' does not start with a language subtag"
            )));
        }

        let mut tag = language.to_ascii_lowercase();
        let split = tag.len();
        if let Some(region) = region {
            let alpha = region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic());
            let numeric = region.len() == 3 && region.chars().all(|c| c.is_ascii_digit());
            if !alpha && !numeric {
                return Err(TypeError::InvalidLocale(format!(
                    "'{input}' has an invalid region subtag"
                )));
            }
            tag.push('-');
            tag.push_str(&region.to_ascii_uppercase());
        }

        Ok(Self { tag, split })
    }

    /// The language subtag.
    pub fn language(&self) -> &str {
        &self.tag[..self.split]
    }

    /// The region subtag, if any.
    pub fn region(&self) -> Option<&str> {
        self.tag.get(self.split + 1..)
    }

    /// Get the normalized tag.
    pub fn as_str(&self) -> &str {
        &self.tag
    }
}

impl TryFrom<String> for LocaleTag {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<LocaleTag> for String {
    fn from(tag: LocaleTag) -> Self {
        tag.tag
    }
}

impl std::fmt::Display for LocaleTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag)
    }
}

/// A SHA-256 content hash, lowercase hex.
///
/// Used only to verify that bytes written are the bytes read back; it is
/// never an address or a deduplication key.
///
/// # Example
///
/// ```
/// use editflow::core::types::Shasum;
///
/// let a = Shasum::of(b"hello");
/// let b = Shasum::of(b"hello");
/// assert_eq!(a, b);
/// assert_ne!(a, Shasum::of(b"hello!"));
/// assert_eq!(a.short(8).len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Shasum(String);

impl Shasum {
    /// Hash a byte slice.
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Parse a hex digest (normalized to lowercase).
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidShasum` unless the input is 64 hex digits.
    pub fn new(hex: impl Into<String>) -> Result<Self, TypeError> {
        let hex = hex.into().to_ascii_lowercase();
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidShasum(format!(
                "expected 64 hex characters, got '{hex}'"
            )));
        }
        Ok(Self(hex))
    }

    /// Abbreviated form for display.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the digest as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Shasum {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Shasum> for String {
    fn from(sum: Shasum) -> Self {
        sum.0
    }
}

impl std::fmt::Display for Shasum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp in RFC3339 format.
///
/// File created/updated times are carried in this type so that copy and
/// move can re-apply them exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }

    /// Convert to a `SystemTime` for filesystem calls.
    pub fn to_system_time(self) -> std::time::SystemTime {
        self.0.into()
    }
}

impl From<std::time::SystemTime> for UtcTimestamp {
    fn from(time: std::time::SystemTime) -> Self {
        Self(time.into())
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
