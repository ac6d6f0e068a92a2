//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! Searched in order:
//! 1. `--config <path>` on the command line
//! 2. `$EDITFLOW_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/editflow/config.toml`
//! 4. `~/.editflow/config.toml`
//!
//! # Validation
//!
//! Values are validated after parsing: filesystem ids and editor ids must
//! be well formed, every mount needs a directory, and role names must be
//! unique.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::collab::ContentKind;
use crate::core::types::{EditorId, FsId};
use crate::engine::capabilities::Permission;

/// The configuration file.
///
/// # Example
///
/// ```toml
/// default_permissions = ["view"]
///
/// [[mounts]]
/// fsid = "content"
/// kind = "page"
/// read_only = "/srv/site/content"
/// read_write = "/srv/site/content"
///
/// [[mounts]]
/// fsid = "archive"
/// kind = "page"
/// read_only = "/srv/site/archive"
///
/// [lock]
/// exclusive_create = true
///
/// [publish]
/// render_gate = true
/// renderer = "template"
///
/// [logging]
/// filter = "editflow=info"
/// format = "compact"
///
/// [[roles]]
/// name = "editors"
/// permissions = ["view", "edit", "create", "publish"]
/// members = ["alice", "bob"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Filesystems, in the order they are consulted.
    pub mounts: Vec<MountConfig>,

    /// Lock sidecar behavior.
    pub lock: Option<LockConfig>,

    /// Publish pipeline behavior.
    pub publish: Option<PublishConfig>,

    /// Log output.
    pub logging: Option<LoggingConfig>,

    /// Notice delivery.
    pub notices: Option<NoticesConfig>,

    /// Permissions of editors in no role. Absent means every editor holds
    /// every permission, unless roles are configured.
    pub default_permissions: Option<Vec<Permission>>,

    /// Role table.
    pub roles: Vec<RoleConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for mount in &self.mounts {
            mount.validate()?;
        }
        if let Some(publish) = &self.publish {
            publish.validate()?;
        }
        if let Some(logging) = &self.logging {
            logging.validate()?;
        }

        let mut names = BTreeSet::new();
        for role in &self.roles {
            if role.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "role name cannot be empty".to_string(),
                ));
            }
            if !names.insert(role.name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "role '{}' is defined twice",
                    role.name
                )));
            }
            for member in &role.members {
                EditorId::new(member).map_err(|e| {
                    ConfigError::InvalidValue(format!("role '{}': {}", role.name, e))
                })?;
            }
        }
        Ok(())
    }
}

/// One mount point.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MountConfig {
    /// Filesystem id.
    pub fsid: String,

    /// Path prefix this mount covers within the filesystem (empty: all).
    pub prefix: String,

    /// Content kind.
    pub kind: ContentKind,

    /// Directory served read-only.
    pub read_only: Option<PathBuf>,

    /// Directory that receives writes. Absent means the mount is read-only.
    pub read_write: Option<PathBuf>,
}

impl MountConfig {
    /// Validate one mount.
    pub fn validate(&self) -> Result<(), ConfigError> {
        FsId::new(&self.fsid)
            .map_err(|e| ConfigError::InvalidValue(format!("mount '{}': {}", self.fsid, e)))?;
        if self.read_only.is_none() && self.read_write.is_none() {
            return Err(ConfigError::InvalidValue(format!(
                "mount '{}' needs read_only or read_write",
                self.fsid
            )));
        }
        Ok(())
    }
}

/// Lock sidecar settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LockConfig {
    /// Create lock files atomically (default: true).
    pub exclusive_create: Option<bool>,
}

/// Publish pipeline settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// Check that content renders before publishing (default: true).
    pub render_gate: Option<bool>,

    /// Renderer: "template" or "noop" (default: "template").
    pub renderer: Option<String>,
}

impl PublishConfig {
    /// Valid renderer names.
    pub const VALID_RENDERERS: &'static [&'static str] = &["template", "noop"];

    /// Validate the publish configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(renderer) = &self.renderer {
            if !Self::VALID_RENDERERS.contains(&renderer.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid renderer '{}', must be one of: {}",
                    renderer,
                    Self::VALID_RENDERERS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives (default: "editflow=info").
    pub filter: Option<String>,

    /// "compact" or "json" (default: "compact").
    pub format: Option<String>,
}

impl LoggingConfig {
    /// Valid output formats.
    pub const VALID_FORMATS: &'static [&'static str] = &["compact", "json"];

    /// Validate the logging configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(format) = &self.format {
            if !Self::VALID_FORMATS.contains(&format.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid log format '{}', must be one of: {}",
                    format,
                    Self::VALID_FORMATS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Notice delivery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NoticesConfig {
    /// JSON-lines notice log (default: `~/.editflow/notices.jsonl`).
    pub path: Option<PathBuf>,
}

/// A named role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RoleConfig {
    /// Role name.
    pub name: String,

    /// Permissions the role grants.
    pub permissions: Vec<Permission>,

    /// Editor ids in the role.
    pub members: Vec<String>,
}
