//! actions command - List operations offered for a resource

use anyhow::Result;

use crate::cli::args::Target;
use crate::cli::Context;
use crate::ui::output;

/// List the operations the editor is offered for a resource.
pub fn actions(ctx: &Context, target: &Target) -> Result<()> {
    let resource = ctx.resource(target)?;
    let actions = ctx.engine.available_actions(&resource, &ctx.editor)?;

    if ctx.json {
        output::json(&actions)?;
        return Ok(());
    }

    if actions.state.demoted {
        output::warn(
            format!("{} does not render; some operations are withheld", resource),
            ctx.verbosity,
        );
    }
    output::print(output::format_list(&actions.ops, ""), ctx.verbosity);
    Ok(())
}
