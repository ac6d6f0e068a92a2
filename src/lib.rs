//! editflow - lock, draft and publish workflow for file-backed content
//!
//! editflow edits content that lives as plain files: pages, templates,
//! menus and assets spread over several mounted filesystems. An editor
//! takes a lock, saves drafts next to the published file, and publishes
//! once the draft renders. Copy, move and translate carry the sidecars
//! along and check integrity before anything is removed.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Lookup → Gate → Validate → Execute lifecycle and the operations
//! - [`core`] - Domain types, resource identity, locks, drafts and config
//! - [`mount`] - Filesystem abstraction and the mount table
//! - [`collab`] - Collaborator traits: authorization, rendering, indexing, notices
//! - [`telemetry`] - Structured logging
//! - [`ui`] - Output formatting
//!
//! # Correctness Invariants
//!
//! 1. At most one editor holds the lock on a resource
//! 2. Nothing is written by a request that fails gating or validation
//! 3. Read-only mounts are never written
//! 4. A transfer never removes its source unless the copy verified

pub mod cli;
pub mod collab;
pub mod core;
pub mod engine;
pub mod mount;
pub mod telemetry;
pub mod ui;
