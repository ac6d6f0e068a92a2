//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Turns command-specific arguments into a resource and a form
//! 2. Calls the engine
//! 3. Formats and displays output
//!
//! Handlers never touch the mounts directly.

mod actions;
mod completion;
mod notices;
mod operations;
mod status;
mod submit;

pub use actions::actions;
pub use completion::completion;
pub use notices::notices;
pub use operations::operations;
pub use status::status;
pub use submit::{build_form, submit, SubmitArgs};

use anyhow::Result;

use super::args::Command;
use super::Context;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Submit {
            op,
            target,
            fields,
            raw_fields,
            content_file,
            confirm,
            return_to_directory,
        } => submit(
            ctx,
            SubmitArgs {
                op,
                target,
                fields,
                raw_fields,
                content_file,
                confirm,
                return_to_directory,
            },
        ),
        Command::Status { target } => status(ctx, &target),
        Command::Actions { target } => actions(ctx, &target),
        Command::Notices { keep } => notices(ctx, keep),
        Command::Operations => operations(ctx),
        Command::Completion { shell } => completion(shell),
    }
}
