//! notices command - Show and clear pending notices

use anyhow::Result;

use crate::cli::Context;
use crate::ui::output;

/// Show the editor's pending notices, clearing them unless `keep`.
pub fn notices(ctx: &Context, keep: bool) -> Result<()> {
    let sink = ctx.engine.notices();
    let pending = if keep {
        sink.pending(&ctx.editor)?
    } else {
        sink.drain(&ctx.editor)?
    };

    if ctx.json {
        output::json(&pending)?;
        return Ok(());
    }

    if pending.is_empty() {
        output::print("no notices", ctx.verbosity);
    }
    for notice in &pending {
        output::notice(notice, ctx.verbosity);
    }
    Ok(())
}
