//! core::paths
//!
//! Centralized path routing for mount-relative files and their sidecars.
//!
//! # Architecture
//!
//! Every path the engine hands to a filesystem view is a mount-relative,
//! `/`-separated string with no leading slash and no `.` or `..` segments.
//! All of them are produced here so that the sidecar naming convention
//! lives in exactly one place.
//!
//! # Sidecar Layout
//!
//! Sidecars are colocated with the resource they describe:
//! - `<path>.~lock` - raw editor id of the lock holder
//! - `<path>.~draft` - full candidate replacement body
//!
//! The suffixes are bit-exact for interop with existing content trees.
//!
//! # Example
//!
//! ```
//! use editflow::core::paths::{join, parent, sidecar_path, Sidecar};
//!
//! assert_eq!(join(&["en", "blog/", "/post.md"]), "en/blog/post.md");
//! assert_eq!(parent("en/blog/post.md"), "en/blog");
//! assert_eq!(sidecar_path("en/blog/post.md", Sidecar::Lock), "en/blog/post.md.~lock");
//! assert_eq!(Sidecar::strip("en/post.md.~draft"), ("en/post.md", Some(Sidecar::Draft)));
//! ```

use serde::{Deserialize, Serialize};

/// The kind of sidecar marker colocated with a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sidecar {
    /// Lock marker: content is the holder's editor id.
    Lock,
    /// Draft marker: content is the unpublished replacement body.
    Draft,
}

impl Sidecar {
    /// All sidecar kinds.
    pub const ALL: [Sidecar; 2] = [Sidecar::Lock, Sidecar::Draft];

    /// The file name suffix, including the leading `.~`.
    pub fn suffix(self) -> &'static str {
        match self {
            Sidecar::Lock => ".~lock",
            Sidecar::Draft => ".~draft",
        }
    }

    /// Split a path into its canonical part and sidecar kind, if any.
    pub fn strip(path: &str) -> (&str, Option<Sidecar>) {
        for kind in Self::ALL {
            if let Some(base) = path.strip_suffix(kind.suffix()) {
                if !base.is_empty() {
                    return (base, Some(kind));
                }
            }
        }
        (path, None)
    }

    /// Whether a file name denotes any sidecar (used when listing directories).
    pub fn is_sidecar(name: &str) -> bool {
        Self::strip(name).1.is_some()
    }
}

/// Compute the sidecar path for a canonical file path.
pub fn sidecar_path(file_path: &str, kind: Sidecar) -> String {
    format!("{}{}", file_path, kind.suffix())
}

/// Normalize a path: drop empty, `.` and `..` segments and leading slashes.
///
/// `..` is dropped rather than resolved; callers never get to walk out of
/// the mount root.
pub fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join path parts with `/` and normalize the result.
pub fn join(parts: &[&str]) -> String {
    normalize(&parts.join("/"))
}

/// The parent directory of a path (empty string for top-level entries).
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// The final segment of a path.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Whether `path` lies under the directory `prefix` (or equals it).
///
/// An empty prefix covers everything.
pub fn covers(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() || prefix == path {
        return true;
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}
