//! core
//!
//! Core domain types and resource state for editflow.
//!
//! # Modules
//!
//! - [`types`] - Strong types: EditorId, FsId, LocaleTag, Shasum, etc.
//! - [`identity`] - Resource identity and sidecar addressing
//! - [`paths`] - Path normalization and sidecar suffixes
//! - [`naming`] - File name sanitization
//! - [`ops`] - Lock and draft sidecars
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Identity is value-based and independent of which mount serves it

pub mod config;
pub mod identity;
pub mod naming;
pub mod ops;
pub mod paths;
pub mod types;
