//! core::ops
//!
//! Sidecar-backed resource state: locks and drafts.
//!
//! # Modules
//!
//! - [`lock`] - Per-resource editor lock (`<path>.~lock`)
//! - [`draft`] - Per-resource unpublished copy (`<path>.~draft`)
//!
//! # Architecture
//!
//! Sidecar files are the only shared mutable state between concurrent
//! requests. Both managers borrow the [`MountTable`](crate::mount::MountTable)
//! and are cheap to construct per request.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use editflow::core::identity::ResourceIdentity;
//! use editflow::core::ops::{DraftManager, LockManager, LockPolicy};
//! use editflow::core::types::{EditorId, FsId};
//! use editflow::mount::{MemFs, MountPoint, MountTable};
//!
//! let fs = Arc::new(MemFs::new().with_file("en/about.md", b"old"));
//! let table = MountTable::new().with(MountPoint::read_write(
//!     FsId::new("content").unwrap(), "", fs.clone(), fs,
//! ));
//! let id = ResourceIdentity::parse("content", "en", "about.md").unwrap();
//! let alice = EditorId::new("alice").unwrap();
//!
//! LockManager::new(&table, LockPolicy::Exclusive).acquire(&alice, &id).unwrap();
//! let drafts = DraftManager::new(&table);
//! drafts.write(&id, b"new").unwrap();
//! assert!(drafts.exists(&id));
//! ```

pub mod draft;
pub mod lock;

pub use draft::{DraftError, DraftManager};
pub use lock::{LockError, LockManager, LockPolicy, LockStatus};
