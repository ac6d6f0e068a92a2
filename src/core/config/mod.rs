//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, first match wins:
//! 1. An explicit path (`--config`)
//! 2. `$EDITFLOW_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/editflow/config.toml`
//! 4. `~/.editflow/config.toml`
//!
//! An explicit path that does not exist is an error; the other locations
//! are skipped when absent, and defaults are used if none is found.
//!
//! # Example
//!
//! ```no_run
//! use editflow::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! let mounts = config.mount_table().unwrap();
//! println!("{} filesystem(s)", mounts.fsids().count());
//! println!("render gate: {}", config.render_gate());
//! ```

pub mod schema;

pub use schema::{
    ConfigFile, LockConfig, LoggingConfig, MountConfig, NoticesConfig, PublishConfig, RoleConfig,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::collab::{
    AllowAll, Authorizer, ContentKind, NoopRenderer, Renderer, RoleAuthorizer, TemplateRenderer,
};
use crate::core::ops::LockPolicy;
use crate::core::types::FsId;
use crate::engine::capabilities::PermissionSet;
use crate::mount::{LocalFs, MountPoint, MountTable};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "EDITFLOW_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// The parsed file (defaults if none was found).
    pub file: ConfigFile,
    /// Where it was loaded from.
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `explicit`, else the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated, or if `explicit` does not exist.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match explicit {
            Some(path) if path.exists() => Some(path.to_path_buf()),
            Some(path) => return Err(ConfigError::NotFound(path.to_path_buf())),
            None => Self::locate(),
        };
        match path {
            Some(path) => {
                let file = Self::read(&path)?;
                file.validate()?;
                Ok(Config {
                    file,
                    path: Some(path),
                })
            }
            None => Ok(Config::default()),
        }
    }

    /// Parse a config from a string, for embedding and tests.
    pub fn from_toml(contents: &str) -> Result<Config, ConfigError> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(Config { file, path: None })
    }

    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("editflow/config.toml");
            if path.exists() {
                return Some(path);
            }
        }
        dirs::home_dir()
            .map(|home| home.join(".editflow/config.toml"))
            .filter(|path| path.exists())
    }

    fn read(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Where the config was loaded from, if a file was found.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The per-user state directory, `~/.editflow`.
    pub fn state_dir() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".editflow"))
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    /// Build the mount table over local directories.
    pub fn mount_table(&self) -> Result<MountTable, ConfigError> {
        let mut table = MountTable::new();
        for m in &self.file.mounts {
            let fsid = FsId::new(&m.fsid)
                .map_err(|e| ConfigError::InvalidValue(format!("mount '{}': {}", m.fsid, e)))?;
            let mount = match (&m.read_only, &m.read_write) {
                (ro, Some(rw_dir)) => {
                    let rw = Arc::new(LocalFs::new(rw_dir));
                    match ro.as_deref().filter(|ro| *ro != rw_dir.as_path()) {
                        Some(ro) => MountPoint::read_write(
                            fsid,
                            &m.prefix,
                            Arc::new(LocalFs::new(ro)),
                            rw,
                        ),
                        None => MountPoint::read_write(fsid, &m.prefix, rw.clone(), rw),
                    }
                }
                (Some(ro), None) => {
                    MountPoint::read_only(fsid, &m.prefix, Arc::new(LocalFs::new(ro)))
                }
                (None, None) => {
                    return Err(ConfigError::InvalidValue(format!(
                        "mount '{}' needs read_only or read_write",
                        m.fsid
                    )))
                }
            };
            table.add(mount);
        }
        Ok(table)
    }

    /// Content kind per filesystem id. The first mount of an id decides.
    pub fn kinds(&self) -> Vec<(FsId, ContentKind)> {
        let mut kinds: Vec<(FsId, ContentKind)> = Vec::new();
        for m in &self.file.mounts {
            if let Ok(fsid) = FsId::new(&m.fsid) {
                if !kinds.iter().any(|(f, _)| f == &fsid) {
                    kinds.push((fsid, m.kind));
                }
            }
        }
        kinds
    }

    /// Lock creation policy. Defaults to exclusive create.
    pub fn lock_policy(&self) -> LockPolicy {
        let exclusive = self
            .file
            .lock
            .as_ref()
            .and_then(|l| l.exclusive_create)
            .unwrap_or(true);
        if exclusive {
            LockPolicy::Exclusive
        } else {
            LockPolicy::Advisory
        }
    }

    /// Whether the render gate runs. Defaults to `true`.
    pub fn render_gate(&self) -> bool {
        self.file
            .publish
            .as_ref()
            .and_then(|p| p.render_gate)
            .unwrap_or(true)
    }

    /// The configured renderer. Defaults to structural template checks.
    pub fn renderer(&self) -> Arc<dyn Renderer> {
        match self
            .file
            .publish
            .as_ref()
            .and_then(|p| p.renderer.as_deref())
        {
            Some("noop") => Arc::new(NoopRenderer),
            _ => Arc::new(TemplateRenderer),
        }
    }

    /// The authorizer: the role table if roles or default permissions are
    /// configured, else allow-all.
    pub fn authorizer(&self) -> Arc<dyn Authorizer> {
        if self.file.roles.is_empty() && self.file.default_permissions.is_none() {
            return Arc::new(AllowAll);
        }
        let default = self
            .file
            .default_permissions
            .as_ref()
            .map(|p| PermissionSet::with(p.iter().copied()))
            .unwrap_or_default();
        let table = self.file.roles.iter().fold(RoleAuthorizer::new(default), |t, role| {
            t.with_role(
                &role.name,
                PermissionSet::with(role.permissions.iter().copied()),
                role.members.iter().cloned(),
            )
        });
        Arc::new(table)
    }

    /// The notice log path. Defaults to `~/.editflow/notices.jsonl`.
    pub fn notices_path(&self) -> Result<PathBuf, ConfigError> {
        match self.file.notices.as_ref().and_then(|n| n.path.clone()) {
            Some(path) => Ok(path),
            None => Ok(Self::state_dir()?.join("notices.jsonl")),
        }
    }

    /// Log filter directives. Defaults to `editflow=info`.
    pub fn log_filter(&self) -> &str {
        self.file
            .logging
            .as_ref()
            .and_then(|l| l.filter.as_deref())
            .unwrap_or("editflow=info")
    }

    /// Whether logs are emitted as JSON.
    pub fn log_json(&self) -> bool {
        self.file
            .logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            == Some("json")
    }
}
