//! engine::gate
//!
//! Permission and confirmation gating for operation dispatch.
//!
//! # Architecture
//!
//! Gating runs after descriptor lookup and before validation. It answers
//! two questions in order: does the caller hold the descriptor's
//! permission, and if the descriptor declares a confirmation key, did the
//! form confirm it? Either "no" stops the request before any resource state
//! is read.
//!
//! # Invariants
//!
//! - Gating never returns `Ready` when the permission is missing
//! - A permission denial is reported before a missing confirmation
//! - Gating is a pure function of the descriptor, the submitted form and
//!   the caller's permission set
//!
//! # Example
//!
//! ```
//! use editflow::engine::capabilities::{Permission, PermissionSet};
//! use editflow::engine::form::Form;
//! use editflow::engine::gate::{gate, GateResult};
//! use editflow::engine::operation::Registry;
//!
//! let registry = Registry::standard();
//! let delete = registry.get("delete").unwrap();
//! let perms = PermissionSet::with([Permission::View, Permission::Delete]);
//!
//! let unconfirmed = Form::new().with("submit", "delete");
//! assert!(matches!(
//!     gate(delete, &unconfirmed, &perms),
//!     GateResult::NeedsConfirmation { .. }
//! ));
//!
//! let confirmed = Form::new().with("submit", "delete-confirmed");
//! assert!(gate(delete, &confirmed, &perms).is_ready());
//! ```

use super::capabilities::{Permission, PermissionSet};
use super::form::Form;
use super::operation::{Descriptor, OperationKind};

/// Result of gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResult {
    /// The operation may proceed to validation.
    Ready,
    /// The caller lacks the required permission.
    Denied {
        /// The operation.
        op: OperationKind,
        /// The permission that is missing.
        missing: Permission,
    },
    /// The operation must be resubmitted with confirmation.
    NeedsConfirmation {
        /// The operation.
        op: OperationKind,
        /// Form key that confirms it.
        key: &'static str,
    },
}

impl GateResult {
    /// Whether gating passed.
    pub fn is_ready(&self) -> bool {
        matches!(self, GateResult::Ready)
    }

    /// User-facing message for a failed gate.
    pub fn message(&self) -> Option<String> {
        match self {
            GateResult::Ready => None,
            GateResult::Denied { op, missing } => Some(format!(
                "permission denied: {op} requires the '{missing}' permission"
            )),
            GateResult::NeedsConfirmation { op, .. } => Some(format!("must confirm {op}")),
        }
    }
}

/// Whether the form confirms `descriptor`.
///
/// Either the submit value carries the `-confirmed` suffix, or the
/// descriptor's confirmation key is present and truthy.
pub fn is_confirmed(descriptor: &Descriptor, form: &Form) -> bool {
    let Some(key) = descriptor.confirm else {
        return true;
    };
    form.submit().is_some_and(|s| s.confirmed) || form.is_truthy(key)
}

/// Gate one operation.
pub fn gate(descriptor: &Descriptor, form: &Form, permissions: &PermissionSet) -> GateResult {
    if !permissions.has(descriptor.permission) {
        return GateResult::Denied {
            op: descriptor.kind,
            missing: descriptor.permission,
        };
    }
    match descriptor.confirm {
        Some(key) if !is_confirmed(descriptor, form) => GateResult::NeedsConfirmation {
            op: descriptor.kind,
            key,
        },
        _ => GateResult::Ready,
    }
}
