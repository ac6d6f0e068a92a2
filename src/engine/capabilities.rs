//! engine::capabilities
//!
//! Editor permissions for operation gating.
//!
//! # Architecture
//!
//! Every operation descriptor names the one [`Permission`] it requires. The
//! [`Authorizer`](crate::collab::Authorizer) maps an editor to the
//! [`PermissionSet`] they hold, and the dispatcher refuses the operation when
//! the requirement is missing. A permission is binary: held or not.
//!
//! # Example
//!
//! ```
//! use editflow::engine::capabilities::{Permission, PermissionSet};
//!
//! let perms = PermissionSet::with([Permission::View, Permission::Edit]);
//! assert!(perms.has(Permission::Edit));
//! assert!(!perms.has(Permission::Publish));
//!
//! let missing = perms.missing(&[Permission::Edit, Permission::Delete]);
//! assert_eq!(missing, vec![Permission::Delete]);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A permission an editor may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    /// Read resources and search.
    View,
    /// Lock resources, write drafts, discard own work.
    Edit,
    /// Create new resources from archetypes.
    Create,
    /// Promote drafts and manage the search index.
    Publish,
    /// Delete resources, drafts and directories.
    Delete,
    /// Move resources between locations.
    Move,
    /// Take over a lock held by another editor.
    Retake,
}

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: [Permission; 7] = [
        Permission::View,
        Permission::Edit,
        Permission::Create,
        Permission::Publish,
        Permission::Delete,
        Permission::Move,
        Permission::Retake,
    ];

    /// The config/wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::View => "view",
            Permission::Edit => "edit",
            Permission::Create => "create",
            Permission::Publish => "publish",
            Permission::Delete => "delete",
            Permission::Move => "move",
            Permission::Retake => "retake",
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Permission::View => "view content",
            Permission::Edit => "edit content",
            Permission::Create => "create content",
            Permission::Publish => "publish content",
            Permission::Delete => "delete content",
            Permission::Move => "move content",
            Permission::Retake => "take over another editor's lock",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of permissions held by one editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    permissions: BTreeSet<Permission>,
}

impl PermissionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every permission.
    pub fn all() -> Self {
        Self::with(Permission::ALL)
    }

    /// Create a set with the given permissions.
    pub fn with<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            permissions: iter.into_iter().collect(),
        }
    }

    /// Insert a permission.
    pub fn insert(&mut self, permission: Permission) {
        self.permissions.insert(permission);
    }

    /// Add every permission of `other`.
    pub fn extend(&mut self, other: &PermissionSet) {
        self.permissions.extend(other.permissions.iter().copied());
    }

    /// Whether a permission is held.
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// The required permissions that are not held, in the given order.
    pub fn missing(&self, required: &[Permission]) -> Vec<Permission> {
        required
            .iter()
            .filter(|p| !self.permissions.contains(p))
            .copied()
            .collect()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Iterate in order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.permissions.iter().copied()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self::with(iter)
    }
}
