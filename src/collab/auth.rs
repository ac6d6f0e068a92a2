//! collab::auth
//!
//! Permission lookup per editor.

use std::collections::BTreeMap;

use crate::core::types::EditorId;
use crate::engine::capabilities::PermissionSet;

/// Maps an editor to the permissions they hold.
pub trait Authorizer: Send + Sync + std::fmt::Debug {
    /// The permissions held by `editor`.
    fn permissions(&self, editor: &EditorId) -> PermissionSet;
}

/// Grants every permission to every editor.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn permissions(&self, _editor: &EditorId) -> PermissionSet {
        PermissionSet::all()
    }
}

/// Role table: editors are members of named roles, each granting a set of
/// permissions. Editors in no role get the default set.
///
/// # Example
///
/// ```
/// use editflow::collab::{Authorizer, RoleAuthorizer};
/// use editflow::core::types::EditorId;
/// use editflow::engine::capabilities::{Permission, PermissionSet};
///
/// let auth = RoleAuthorizer::new(PermissionSet::with([Permission::View]))
///     .with_role("editor", PermissionSet::with([Permission::Edit]), ["alice"]);
///
/// let alice = EditorId::new("alice").unwrap();
/// let guest = EditorId::new("guest").unwrap();
/// assert!(auth.permissions(&alice).has(Permission::Edit));
/// assert!(auth.permissions(&alice).has(Permission::View));
/// assert!(!auth.permissions(&guest).has(Permission::Edit));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoleAuthorizer {
    default: PermissionSet,
    roles: BTreeMap<String, PermissionSet>,
    members: BTreeMap<String, Vec<String>>,
}

impl RoleAuthorizer {
    /// Create a table where unlisted editors hold `default`.
    pub fn new(default: PermissionSet) -> Self {
        Self {
            default,
            ..Self::default()
        }
    }

    /// Add a role with its members.
    pub fn with_role<I, S>(mut self, name: &str, permissions: PermissionSet, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.insert(name.to_string(), permissions);
        for member in members {
            self.members
                .entry(member.into())
                .or_default()
                .push(name.to_string());
        }
        self
    }

    /// The roles `editor` belongs to.
    pub fn roles_of(&self, editor: &EditorId) -> &[String] {
        self.members
            .get(editor.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Authorizer for RoleAuthorizer {
    fn permissions(&self, editor: &EditorId) -> PermissionSet {
        let mut set = self.default.clone();
        for role in self.roles_of(editor) {
            if let Some(perms) = self.roles.get(role) {
                set.extend(perms);
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::capabilities::Permission;

    #[test]
    fn roles_accumulate() {
        let auth = RoleAuthorizer::new(PermissionSet::new())
            .with_role("editor", PermissionSet::with([Permission::Edit]), ["alice"])
            .with_role(
                "publisher",
                PermissionSet::with([Permission::Publish]),
                ["alice", "bob"],
            );
        let alice = EditorId::new("alice").expect("id");
        let bob = EditorId::new("bob").expect("id");
        let perms = auth.permissions(&alice);
        assert!(perms.has(Permission::Edit));
        assert!(perms.has(Permission::Publish));
        assert!(!auth.permissions(&bob).has(Permission::Edit));
        assert_eq!(auth.roles_of(&alice), ["editor", "publisher"]);
    }

    #[test]
    fn allow_all_grants_everything() {
        let anyone = EditorId::new("x").expect("id");
        assert_eq!(AllowAll.permissions(&anyone), PermissionSet::all());
    }
}
