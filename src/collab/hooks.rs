//! collab::hooks
//!
//! Extension points other features can intercept.
//!
//! When a move, copy or translate arrives without a destination file name,
//! the engine asks each registered [`FileNameHook`] in turn. The first one
//! to supply a name wins; if none does, the operation fails validation
//! with "file name required".

use std::fmt::Debug;

use crate::core::identity::ResourceIdentity;
use crate::engine::form::Form;
use crate::engine::operation::OperationKind;

/// Supplies a default destination file name.
pub trait FileNameHook: Send + Sync + Debug {
    /// A file name for the destination of `op` from `source`, or `None` to
    /// defer to the next hook.
    fn file_name_required(
        &self,
        op: OperationKind,
        source: &ResourceIdentity,
        form: &Form,
    ) -> Option<String>;
}

/// Keep the source's file name for copy and translate.
///
/// A move without a name stays an error: moving to the same name in the
/// same place is a no-op the caller should not reach by omission.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepSourceName;

impl FileNameHook for KeepSourceName {
    fn file_name_required(
        &self,
        op: OperationKind,
        source: &ResourceIdentity,
        _form: &Form,
    ) -> Option<String> {
        match op {
            OperationKind::Copy | OperationKind::Translate => {
                Some(source.file_name().to_string())
            }
            _ => None,
        }
    }
}
