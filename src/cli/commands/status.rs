//! status command - Show resource state and leftovers

use anyhow::Result;

use crate::cli::args::Target;
use crate::cli::Context;
use crate::engine::health::{FileSummary, Severity};
use crate::ui::output;

fn describe(summary: &Option<FileSummary>) -> String {
    match summary {
        Some(f) => format!(
            "{} ({} bytes, {}, {})",
            f.path,
            f.size,
            f.shasum.short(12),
            f.updated
        ),
        None => "none".to_string(),
    }
}

/// Show the state of one resource.
pub fn status(ctx: &Context, target: &Target) -> Result<()> {
    let resource = ctx.resource(target)?;
    let report = ctx.engine.status(&resource)?;

    if ctx.json {
        output::json(&report)?;
        return Ok(());
    }

    let v = ctx.verbosity;
    output::print(format!("resource:  {}", report.resource), v);
    output::print(format!("writable:  {}", output::format_flag(report.writable)), v);
    output::print(format!("published: {}", describe(&report.canonical)), v);
    output::print(format!("draft:     {}", describe(&report.draft)), v);
    let holder = report
        .lock_holder
        .as_ref()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "none".to_string());
    output::print(format!("locked by: {holder}"), v);

    for issue in &report.issues {
        let line = format!("{}: {}", issue.path, issue.message);
        if issue.severity == Severity::Warning {
            output::warn(line, v);
        } else {
            output::print(line, v);
        }
    }
    Ok(())
}
