//! collab::index
//!
//! Search index registration.
//!
//! Publish registers the promoted resource as its final step; delete and
//! move de-register the old address. Queries back the `search` operation.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::core::identity::ResourceIdentity;
use crate::core::types::FsId;

/// Errors from the index collaborator.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index rejected or failed the request.
    #[error("index unavailable: {0}")]
    Unavailable(String),
}

/// A search index over resources.
pub trait Indexer: Send + Sync + Debug {
    /// Register (or refresh) a resource with its current content.
    fn index(&self, id: &ResourceIdentity, content: &[u8]) -> Result<(), IndexError>;

    /// Remove a resource. Succeeds if it was not indexed.
    fn deindex(&self, id: &ResourceIdentity) -> Result<(), IndexError>;

    /// Whether a resource is indexed.
    fn is_indexed(&self, id: &ResourceIdentity) -> bool;

    /// Resources of `fsid` whose content matches `query`.
    fn search(&self, fsid: &FsId, query: &str) -> Result<Vec<ResourceIdentity>, IndexError>;
}

/// Case-insensitive substring index held in memory.
///
/// # Example
///
/// ```
/// use editflow::collab::{Indexer, MemoryIndexer};
/// use editflow::core::identity::ResourceIdentity;
///
/// let index = MemoryIndexer::new();
/// let id = ResourceIdentity::parse("content", "en", "about.md").unwrap();
/// index.index(&id, b"All About Us").unwrap();
/// assert_eq!(index.search(&id.fsid, "about").unwrap(), vec![id]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryIndexer {
    entries: Mutex<BTreeMap<String, (ResourceIdentity, String)>>,
}

impl MemoryIndexer {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Indexer for MemoryIndexer {
    fn index(&self, id: &ResourceIdentity, content: &[u8]) -> Result<(), IndexError> {
        let text = String::from_utf8_lossy(content).to_lowercase();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.canonical(), (id.clone(), text));
        Ok(())
    }

    fn deindex(&self, id: &ResourceIdentity) -> Result<(), IndexError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id.canonical());
        Ok(())
    }

    fn is_indexed(&self, id: &ResourceIdentity) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id.canonical())
    }

    fn search(&self, fsid: &FsId, query: &str) -> Result<Vec<ResourceIdentity>, IndexError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(id, text)| &id.fsid == fsid && text.contains(&needle))
            .map(|(id, _)| id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_is_scoped_to_fsid() {
        let index = MemoryIndexer::new();
        let a = ResourceIdentity::parse("content", "en", "a.md").expect("identity");
        let b = ResourceIdentity::parse("archive", "en", "a.md").expect("identity");
        index.index(&a, b"hello").expect("index");
        index.index(&b, b"hello").expect("index");
        assert_eq!(index.search(&a.fsid, "HELLO").expect("search"), vec![a]);
    }

    #[test]
    fn deindex_removes_and_is_idempotent() {
        let index = MemoryIndexer::new();
        let a = ResourceIdentity::parse("content", "en", "a.md").expect("identity");
        index.index(&a, b"x").expect("index");
        assert!(index.is_indexed(&a));
        index.deindex(&a).expect("deindex");
        index.deindex(&a).expect("deindex again");
        assert!(!index.is_indexed(&a));
    }

    #[test]
    fn empty_query_matches_nothing() {
        let index = MemoryIndexer::new();
        let a = ResourceIdentity::parse("content", "en", "a.md").expect("identity");
        index.index(&a, b"x").expect("index");
        assert!(index.search(&a.fsid, "  ").expect("search").is_empty());
    }
}
