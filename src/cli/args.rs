//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file
//! - `--editor <id>`: Act as this editor (default: `$EDITFLOW_EDITOR`, then `$USER`)
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// editflow - lock, draft and publish workflow for file-backed content
#[derive(Parser, Debug)]
#[command(name = "ef")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use this config file instead of the standard locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Act as this editor
    #[arg(long, global = true, value_name = "ID")]
    pub editor: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// The editor to act as: `--editor`, then `$EDITFLOW_EDITOR`, then
    /// `$USER`.
    pub fn editor_name(&self) -> Option<String> {
        self.editor
            .clone()
            .or_else(|| std::env::var(EDITOR_ENV).ok())
            .or_else(|| std::env::var("USER").ok())
            .filter(|e| !e.trim().is_empty())
    }
}

/// Environment variable naming the acting editor.
pub const EDITOR_ENV: &str = "EDITFLOW_EDITOR";

/// A resource address.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Filesystem id
    pub fsid: String,

    /// Path within the filesystem (empty or `/` for the top level)
    #[arg(default_value = "")]
    pub path: String,

    /// Language or variant code
    #[arg(short, long, default_value = "")]
    pub code: String,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one operation on a resource
    #[command(
        name = "submit",
        long_about = "Run one operation on a resource.\n\n\
            The operation goes through the same lifecycle as a form submission: \
            permission check, confirmation, validation, then execution. Problems are \
            reported as notices and nothing is written unless every check passes.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Lock a page for editing
    ef submit edit content blog/post.md -c en

    # Save a draft from a file, then publish it
    ef submit commit content blog/post.md -c en --content-file post.md
    ef submit publish content blog/post.md -c en

    # Copy to a new name, translate to French
    ef submit copy content blog/post.md -c en -f dst-name=post-2.md
    ef submit translate content blog/post.md -c en -f dst-lang=fr

    # Destructive operations need --confirm
    ef submit delete content blog/post.md -c en --confirm

OPERATION FIELDS:
    Fields given with -f are scoped to the operation: `-f dst-name=x` on a
    copy becomes `copy~dst-name=x`. Use --raw-field for unscoped fields."
    )]
    Submit {
        /// Operation key (view, edit, commit, publish, move, copy, ...)
        op: String,

        #[command(flatten)]
        target: Target,

        /// Operation-scoped field, as key=value
        #[arg(short = 'f', long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// Unscoped form field, as key=value
        #[arg(long = "raw-field", value_name = "KEY=VALUE")]
        raw_fields: Vec<String>,

        /// Read the `content` field from a file (`-` for stdin)
        #[arg(long, value_name = "PATH")]
        content_file: Option<PathBuf>,

        /// Confirm a destructive operation
        #[arg(long)]
        confirm: bool,

        /// Redirect to the parent directory on success
        #[arg(long)]
        return_to_directory: bool,
    },

    /// Show lock, draft and leftover state for a resource
    #[command(
        name = "status",
        long_about = "Show the state of a resource: the canonical file, the draft, \
            the lock holder, and any sidecars left behind by an operation that \
            stopped part way.",
        after_help = "\
RECOVERY:
    A publish, move or delete that fails part way leaves sidecars behind.
    `ef status` names them; remove them by hand once you have checked the
    published content."
    )]
    Status {
        #[command(flatten)]
        target: Target,
    },

    /// List the operations offered for a resource
    Actions {
        #[command(flatten)]
        target: Target,
    },

    /// Show and clear your pending notices
    Notices {
        /// Show without clearing
        #[arg(long)]
        keep: bool,
    },

    /// List every operation with its permission and confirmation key
    Operations,

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
INSTALLATION:
    # Bash
    ef completion bash > ~/.local/share/bash-completion/completions/ef

    # Zsh
    ef completion zsh > ~/.zfunc/_ef

    # Fish
    ef completion fish > ~/.config/fish/completions/ef.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
