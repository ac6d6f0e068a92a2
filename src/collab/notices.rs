//! collab::notices
//!
//! Per-editor notices: the user-visible outcome of every failure path and
//! of the non-fatal warnings (render demotion, partial completion).
//!
//! # Storage
//!
//! - [`MemoryNotices`] keeps notices in process, for embedding and tests
//! - [`JournalNotices`] appends one JSON object per line to a file, so a
//!   notice raised by one `ef` invocation can be read by the next
//!
//! # Invariants
//!
//! - Notices are keyed by editor id and returned in the order pushed
//! - `drain` returns and removes exactly one editor's notices

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::identity::ResourceIdentity;
use crate::core::types::{EditorId, UtcTimestamp};

/// Errors from notice storage.
#[derive(Debug, Error)]
pub enum NoticeError {
    /// Reading or writing the notice log failed.
    #[error("notice log i/o error on '{path}': {source}")]
    Io {
        /// Log path.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A log line could not be parsed.
    #[error("notice log '{path}' line {line}: {message}")]
    Parse {
        /// Log path.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Parser message.
        message: String,
    },
}

/// Notice severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Informational.
    Info,
    /// Non-fatal problem.
    Warn,
    /// The operation failed.
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        })
    }
}

/// A user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity.
    pub level: Level,
    /// Message text.
    pub message: String,
    /// Canonical address of the resource concerned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// When the notice was raised.
    pub at: UtcTimestamp,
}

impl Notice {
    /// Create a notice.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            resource: None,
            at: UtcTimestamp::now(),
        }
    }

    /// An info notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    /// A warning notice.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Level::Warn, message)
    }

    /// An error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    /// Attach the resource concerned.
    pub fn about(mut self, id: &ResourceIdentity) -> Self {
        self.resource = Some(id.canonical());
        self
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.resource {
            Some(r) => write!(f, "[{}] {}: {}", self.level, r, self.message),
            None => write!(f, "[{}] {}", self.level, self.message),
        }
    }
}

/// Delivery of notices to editors.
pub trait NoticeSink: Send + Sync + std::fmt::Debug {
    /// Queue a notice for `editor`.
    fn push(&self, editor: &EditorId, notice: Notice) -> Result<(), NoticeError>;

    /// The notices queued for `editor`, without removing them.
    fn pending(&self, editor: &EditorId) -> Result<Vec<Notice>, NoticeError>;

    /// Remove and return the notices queued for `editor`.
    fn drain(&self, editor: &EditorId) -> Result<Vec<Notice>, NoticeError>;
}

/// In-process notice queues.
#[derive(Debug, Default)]
pub struct MemoryNotices {
    queues: Mutex<BTreeMap<EditorId, Vec<Notice>>>,
}

impl MemoryNotices {
    /// Create empty queues.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoticeSink for MemoryNotices {
    fn push(&self, editor: &EditorId, notice: Notice) -> Result<(), NoticeError> {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(editor.clone())
            .or_default()
            .push(notice);
        Ok(())
    }

    fn pending(&self, editor: &EditorId) -> Result<Vec<Notice>, NoticeError> {
        Ok(self
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(editor)
            .cloned()
            .unwrap_or_default())
    }

    fn drain(&self, editor: &EditorId) -> Result<Vec<Notice>, NoticeError> {
        Ok(self
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(editor)
            .unwrap_or_default())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    editor: EditorId,
    #[serde(flatten)]
    notice: Notice,
}

/// Append-only JSON-lines notice log.
///
/// Each push appends one line and syncs it to disk. Draining rewrites the
/// log without the drained editor's lines (temp file, then rename).
#[derive(Debug)]
pub struct JournalNotices {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JournalNotices {
    /// Use the log at `path`. The file is created on first push.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// The log path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io(&self, source: std::io::Error) -> NoticeError {
        NoticeError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_all(&self) -> Result<Vec<Entry>, NoticeError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io(e)),
        };
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| NoticeError::Parse {
                    path: self.path.clone(),
                    line: i + 1,
                    message: e.to_string(),
                })
            })
            .collect()
    }

    fn rewrite(&self, entries: &[Entry]) -> Result<(), NoticeError> {
        let mut content = String::new();
        for entry in entries {
            let line = serde_json::to_string(entry).map_err(|e| NoticeError::Parse {
                path: self.path.clone(),
                line: 0,
                message: e.to_string(),
            })?;
            content.push_str(&line);
            content.push('\n');
        }
        let temp = self.path.with_extension("jsonl.tmp");
        let mut file = fs::File::create(&temp).map_err(|e| self.io(e))?;
        file.write_all(content.as_bytes()).map_err(|e| self.io(e))?;
        file.sync_all().map_err(|e| self.io(e))?;
        fs::rename(&temp, &self.path).map_err(|e| self.io(e))
    }
}

impl NoticeSink for JournalNotices {
    fn push(&self, editor: &EditorId, notice: Notice) -> Result<(), NoticeError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io(e))?;
        }
        let entry = Entry {
            editor: editor.clone(),
            notice,
        };
        let mut line = serde_json::to_string(&entry).map_err(|e| NoticeError::Parse {
            path: self.path.clone(),
            line: 0,
            message: e.to_string(),
        })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io(e))?;
        file.write_all(line.as_bytes()).map_err(|e| self.io(e))?;
        file.sync_all().map_err(|e| self.io(e))
    }

    fn pending(&self, editor: &EditorId) -> Result<Vec<Notice>, NoticeError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| &e.editor == editor)
            .map(|e| e.notice)
            .collect())
    }

    fn drain(&self, editor: &EditorId) -> Result<Vec<Notice>, NoticeError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let (mine, rest): (Vec<Entry>, Vec<Entry>) = self
            .read_all()?
            .into_iter()
            .partition(|e| &e.editor == editor);
        if !mine.is_empty() {
            self.rewrite(&rest)?;
        }
        Ok(mine.into_iter().map(|e| e.notice).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn editor(s: &str) -> EditorId {
        EditorId::new(s).expect("editor id")
    }

    #[test]
    fn memory_drain_is_per_editor() {
        let sink = MemoryNotices::new();
        sink.push(&editor("alice"), Notice::info("one")).expect("push");
        sink.push(&editor("bob"), Notice::warn("two")).expect("push");
        sink.push(&editor("alice"), Notice::error("three")).expect("push");

        let alice: Vec<_> = sink
            .drain(&editor("alice"))
            .expect("drain")
            .into_iter()
            .map(|n| n.message)
            .collect();
        assert_eq!(alice, vec!["one", "three"]);
        assert!(sink.pending(&editor("alice")).expect("pending").is_empty());
        assert_eq!(sink.pending(&editor("bob")).expect("pending").len(), 1);
    }

    #[test]
    fn journal_survives_reopen() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("state/notices.jsonl");
        let id = ResourceIdentity::parse("content", "en", "a.md").expect("identity");

        JournalNotices::new(&path)
            .push(&editor("alice"), Notice::warn("render failed").about(&id))
            .expect("push");
        JournalNotices::new(&path)
            .push(&editor("bob"), Notice::info("hello"))
            .expect("push");

        let log = JournalNotices::new(&path);
        let pending = log.pending(&editor("alice")).expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].level, Level::Warn);
        assert_eq!(pending[0].resource.as_deref(), Some("content/en/a.md"));

        let drained = log.drain(&editor("alice")).expect("drain");
        assert_eq!(drained, pending);
        assert!(log.pending(&editor("alice")).expect("pending").is_empty());
        assert_eq!(log.pending(&editor("bob")).expect("pending").len(), 1);
    }

    #[test]
    fn journal_reports_corrupt_lines() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("notices.jsonl");
        fs::write(&path, "{not json}\n").expect("write");
        let err = JournalNotices::new(&path)
            .pending(&editor("alice"))
            .unwrap_err();
        assert!(matches!(err, NoticeError::Parse { line: 1, .. }));
    }

    #[test]
    fn display_includes_resource() {
        let id = ResourceIdentity::parse("content", "en", "a.md").expect("identity");
        let n = Notice::error("locked").about(&id);
        assert_eq!(n.to_string(), "[error] content/en/a.md: locked");
    }
}
