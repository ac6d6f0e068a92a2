//! core::identity
//!
//! Resource identity: the `(filesystem id, locale/code, path)` triple that
//! addresses one editable unit.
//!
//! # Invariants
//!
//! - The canonical file path never includes a sidecar suffix. A request
//!   that names a sidecar directly is recorded in [`ResourceIdentity::tilde`]
//!   and the suffix is stripped.
//! - Identities are recomputed per request and never persisted.
//!
//! # Example
//!
//! ```
//! use editflow::core::identity::ResourceIdentity;
//! use editflow::core::paths::Sidecar;
//!
//! let id = ResourceIdentity::parse("content", "en", "/blog/post.md.~draft").unwrap();
//! assert_eq!(id.file_path(), "en/blog/post.md");
//! assert_eq!(id.canonical(), "content/en/blog/post.md");
//! assert_eq!(id.tilde, Some(Sidecar::Draft));
//! assert_eq!(id.locale().unwrap().as_str(), "en");
//! ```

use serde::{Deserialize, Serialize};

use super::paths::{self, Sidecar};
use super::types::{FsId, LocaleTag, TypeError};

/// The address of an editable resource.
///
/// Equality and hashing consider only `(fsid, code, path)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceIdentity {
    /// Filesystem id of the mount group holding the resource.
    pub fsid: FsId,
    /// Locale tag or other code (theme name, catalog code). May be empty.
    pub code: String,
    /// Path relative to the code directory.
    pub path: String,
    /// Set when the request named a sidecar rather than the resource.
    #[serde(skip)]
    pub tilde: Option<Sidecar>,
}

impl ResourceIdentity {
    /// Build an identity from raw request parts.
    ///
    /// The code and path are normalized; a trailing sidecar suffix on the
    /// path is stripped into `tilde`.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidFsId` if the filesystem id is malformed.
    pub fn parse(fsid: &str, code: &str, path: &str) -> Result<Self, TypeError> {
        let fsid = FsId::new(fsid)?;
        let normalized = paths::normalize(path);
        let (base, tilde) = Sidecar::strip(&normalized);
        Ok(Self {
            fsid,
            code: paths::normalize(code),
            path: base.to_string(),
            tilde,
        })
    }

    /// Build an identity from already-validated parts.
    pub fn new(fsid: FsId, code: impl Into<String>, path: impl Into<String>) -> Self {
        let code = paths::normalize(&code.into());
        let normalized = paths::normalize(&path.into());
        let (base, tilde) = Sidecar::strip(&normalized);
        Self {
            fsid,
            code,
            path: base.to_string(),
            tilde,
        }
    }

    /// Mount-relative canonical file path (`code/path`).
    pub fn file_path(&self) -> String {
        paths::join(&[&self.code, &self.path])
    }

    /// Mount-relative path of one of this resource's sidecars.
    pub fn sidecar_path(&self, kind: Sidecar) -> String {
        paths::sidecar_path(&self.file_path(), kind)
    }

    /// Fully qualified address (`fsid/code/path`), used in messages,
    /// redirects and translation back-references.
    pub fn canonical(&self) -> String {
        paths::join(&[self.fsid.as_str(), &self.code, &self.path])
    }

    /// The code parsed as a locale, if it is one.
    pub fn locale(&self) -> Option<LocaleTag> {
        LocaleTag::parse(&self.code).ok()
    }

    /// The directory containing this resource, relative to the code.
    pub fn parent_dir(&self) -> &str {
        paths::parent(&self.path)
    }

    /// The final path segment.
    pub fn file_name(&self) -> &str {
        paths::file_name(&self.path)
    }

    /// The same resource in a different directory/name.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self::new(self.fsid.clone(), self.code.clone(), path)
    }
}

impl PartialEq for ResourceIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.fsid == other.fsid && self.code == other.code && self.path == other.path
    }
}

impl Eq for ResourceIdentity {}

impl std::hash::Hash for ResourceIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.fsid.hash(state);
        self.code.hash(state);
        self.path.hash(state);
    }
}

impl std::fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}
