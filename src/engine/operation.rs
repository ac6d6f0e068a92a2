//! engine::operation
//!
//! Operation descriptors and the registry that maps operation keys to them.
//!
//! # Architecture
//!
//! Every user-facing action is an [`OperationKind`] mapped to a fixed
//! [`Descriptor`]: the permission it requires, an optional confirmation key,
//! and plain function pointers for its validation and execution steps. The
//! [`Registry`] is built once at startup and never mutated, so lookups need
//! no synchronization.
//!
//! # Invariants
//!
//! - Every [`OperationKind`] has exactly one descriptor in
//!   [`Registry::standard`]
//! - Validation steps take `&OpContext` and cannot mutate engine state;
//!   only execution steps receive `&mut OpContext`
//!
//! # Example
//!
//! ```
//! use editflow::engine::capabilities::Permission;
//! use editflow::engine::operation::{OperationKind, Registry};
//!
//! let registry = Registry::standard();
//! let delete = registry.get("delete").unwrap();
//! assert_eq!(delete.kind, OperationKind::Delete);
//! assert_eq!(delete.permission, Permission::Delete);
//! assert_eq!(delete.confirm, Some("delete-confirmed"));
//! assert!(registry.get("frobnicate").is_none());
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;

use super::capabilities::Permission;
use super::context::{OpContext, OpError, Redirect};
use super::{ops, publish, transfer};

/// Every operation the engine knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    View,
    Edit,
    Unlock,
    Retake,
    Delete,
    DeleteDraft,
    DeletePath,
    Commit,
    Publish,
    Cancel,
    Move,
    Copy,
    Translate,
    IndexPage,
    DeIndexPage,
    CreatePage,
    CreateMenu,
    Change,
    Search,
}

impl OperationKind {
    /// Every operation, in wire-key order.
    pub const ALL: [OperationKind; 19] = [
        OperationKind::View,
        OperationKind::Edit,
        OperationKind::Unlock,
        OperationKind::Retake,
        OperationKind::Delete,
        OperationKind::DeleteDraft,
        OperationKind::DeletePath,
        OperationKind::Commit,
        OperationKind::Publish,
        OperationKind::Cancel,
        OperationKind::Move,
        OperationKind::Copy,
        OperationKind::Translate,
        OperationKind::IndexPage,
        OperationKind::DeIndexPage,
        OperationKind::CreatePage,
        OperationKind::CreateMenu,
        OperationKind::Change,
        OperationKind::Search,
    ];

    /// The key submitted in the `submit` form field.
    pub fn key(&self) -> &'static str {
        match self {
            OperationKind::View => "view",
            OperationKind::Edit => "edit",
            OperationKind::Unlock => "unlock",
            OperationKind::Retake => "retake",
            OperationKind::Delete => "delete",
            OperationKind::DeleteDraft => "delete-draft",
            OperationKind::DeletePath => "delete-path",
            OperationKind::Commit => "commit",
            OperationKind::Publish => "publish",
            OperationKind::Cancel => "cancel",
            OperationKind::Move => "move",
            OperationKind::Copy => "copy",
            OperationKind::Translate => "translate",
            OperationKind::IndexPage => "index-page",
            OperationKind::DeIndexPage => "de-index-page",
            OperationKind::CreatePage => "create-page",
            OperationKind::CreateMenu => "create-menu",
            OperationKind::Change => "change",
            OperationKind::Search => "search",
        }
    }

    /// Whether the operation can change files.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            OperationKind::View | OperationKind::Search | OperationKind::IndexPage
                | OperationKind::DeIndexPage
        )
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.key() == s)
            .ok_or_else(|| format!("unknown operation '{s}'"))
    }
}

/// Validation step: a pure function of the request and current resource
/// state. Returns [`OpError::Invalid`] with every problem found.
pub type ValidateFn = fn(&OpContext<'_>) -> Result<(), OpError>;

/// Execution step: performs the side effects and returns where to go next.
pub type ExecuteFn = fn(&mut OpContext<'_>) -> Result<Redirect, OpError>;

/// The registered triple for one operation.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    /// Which operation.
    pub kind: OperationKind,
    /// Permission the caller must hold.
    pub permission: Permission,
    /// Form key that must be truthy before the operation runs.
    pub confirm: Option<&'static str>,
    /// Validation step.
    pub validate: ValidateFn,
    /// Execution step.
    pub execute: ExecuteFn,
}

impl Descriptor {
    const fn new(
        kind: OperationKind,
        permission: Permission,
        validate: ValidateFn,
        execute: ExecuteFn,
    ) -> Self {
        Self {
            kind,
            permission,
            confirm: None,
            validate,
            execute,
        }
    }

    const fn confirmed(mut self, key: &'static str) -> Self {
        self.confirm = Some(key);
        self
    }
}

/// Immutable map from operation key to descriptor.
#[derive(Debug, Clone)]
pub struct Registry {
    descriptors: BTreeMap<&'static str, Descriptor>,
}

impl Registry {
    /// The standard set of operations.
    pub fn standard() -> Self {
        use OperationKind as K;
        use Permission as P;

        let descriptors = [
            Descriptor::new(K::View, P::View, ops::validate_view, ops::execute_view),
            Descriptor::new(K::Edit, P::Edit, ops::validate_edit, ops::execute_edit),
            Descriptor::new(K::Unlock, P::Edit, ops::validate_unlock, ops::execute_unlock),
            Descriptor::new(K::Retake, P::Retake, ops::validate_retake, ops::execute_retake)
                .confirmed("retake-confirmed"),
            Descriptor::new(K::Delete, P::Delete, ops::validate_delete, ops::execute_delete)
                .confirmed("delete-confirmed"),
            Descriptor::new(
                K::DeleteDraft,
                P::Edit,
                ops::validate_delete_draft,
                ops::execute_delete_draft,
            )
            .confirmed("delete-draft-confirmed"),
            Descriptor::new(
                K::DeletePath,
                P::Delete,
                ops::validate_delete_path,
                ops::execute_delete_path,
            )
            .confirmed("delete-path-confirmed"),
            Descriptor::new(K::Commit, P::Edit, ops::validate_commit, ops::execute_commit),
            Descriptor::new(K::Publish, P::Publish, publish::validate, publish::execute),
            Descriptor::new(K::Cancel, P::Edit, ops::validate_cancel, ops::execute_cancel),
            Descriptor::new(K::Move, P::Move, transfer::validate, transfer::execute),
            Descriptor::new(K::Copy, P::Edit, transfer::validate, transfer::execute),
            Descriptor::new(K::Translate, P::Edit, transfer::validate, transfer::execute),
            Descriptor::new(K::IndexPage, P::Publish, ops::validate_index, ops::execute_index),
            Descriptor::new(
                K::DeIndexPage,
                P::Publish,
                ops::validate_index,
                ops::execute_deindex,
            ),
            Descriptor::new(K::CreatePage, P::Create, ops::validate_create, ops::execute_create),
            Descriptor::new(K::CreateMenu, P::Create, ops::validate_create, ops::execute_create),
            Descriptor::new(K::Change, P::Edit, ops::validate_change, ops::execute_change),
            Descriptor::new(K::Search, P::View, ops::validate_search, ops::execute_search),
        ];

        Self {
            descriptors: descriptors
                .into_iter()
                .map(|d| (d.kind.key(), d))
                .collect(),
        }
    }

    /// Look up a descriptor by wire key.
    pub fn get(&self, key: &str) -> Option<&Descriptor> {
        self.descriptors.get(key)
    }

    /// The descriptor for a kind.
    pub fn descriptor(&self, kind: OperationKind) -> Option<&Descriptor> {
        self.get(kind.key())
    }

    /// Iterate over all descriptors in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.values()
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}
