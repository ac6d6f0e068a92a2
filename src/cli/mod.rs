//! cli
//!
//! Command-line interface layer for editflow.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and install logging
//! - Assemble the [`Engine`] from configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Every state change is a [`Request`](crate::engine::Request)
//! dispatched through the engine; handlers only translate arguments into
//! requests and outcomes into output.

pub mod args;
pub mod commands;

pub use args::{Cli, Command, Shell, Target};

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::collab::JournalNotices;
use crate::core::config::Config;
use crate::core::identity::ResourceIdentity;
use crate::core::types::EditorId;
use crate::engine::{Engine, Settings};
use crate::telemetry::{self, LogFormat};
use crate::ui::output::Verbosity;

/// Everything a command handler needs.
#[derive(Debug)]
pub struct Context {
    /// The loaded configuration.
    pub config: Config,
    /// The engine built from it.
    pub engine: Engine,
    /// Who is acting.
    pub editor: EditorId,
    /// Output verbosity.
    pub verbosity: Verbosity,
    /// Print JSON instead of text.
    pub json: bool,
}

impl Context {
    /// Load configuration and build the engine.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config.as_deref())?;
        init_logging(&config, cli.debug)?;

        let editor = cli
            .editor_name()
            .context("no editor given; pass --editor or set EDITFLOW_EDITOR")?;
        let editor = EditorId::new(editor)?;

        Ok(Self {
            engine: build_engine(&config)?,
            config,
            editor,
            verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
            json: cli.json,
        })
    }

    /// Resolve a command-line target to a resource identity.
    pub fn resource(&self, target: &Target) -> Result<ResourceIdentity> {
        ResourceIdentity::parse(&target.fsid, &target.code, &target.path)
            .with_context(|| format!("invalid resource address '{}'", target.fsid))
    }
}

/// Build an engine from configuration.
pub fn build_engine(config: &Config) -> Result<Engine> {
    let mounts = config.mount_table()?;
    let notices = JournalNotices::new(config.notices_path()?);
    Ok(Engine::builder(mounts)
        .kinds(config.kinds())
        .settings(Settings {
            lock_policy: config.lock_policy(),
            render_gate: config.render_gate(),
        })
        .renderer(config.renderer())
        .authorizer(config.authorizer())
        .notices(Arc::new(notices))
        .build())
}

fn init_logging(config: &Config, debug: bool) -> Result<()> {
    let filter = if debug {
        "editflow=debug"
    } else {
        config.log_filter()
    };
    let format = if config.log_json() {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    telemetry::initialise(filter, format)?;
    Ok(())
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    if let Command::Completion { shell } = cli.command {
        return commands::completion(shell);
    }

    let ctx = Context::from_cli(&cli)?;
    commands::dispatch(cli.command, &ctx)
}
