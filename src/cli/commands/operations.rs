//! operations command - List the operation registry

use anyhow::Result;
use serde::Serialize;

use crate::cli::Context;
use crate::engine::{OperationKind, Permission};
use crate::ui::output;

#[derive(Serialize)]
struct Row {
    op: OperationKind,
    permission: Permission,
    confirm: Option<&'static str>,
}

/// List every registered operation.
pub fn operations(ctx: &Context) -> Result<()> {
    let rows: Vec<Row> = ctx
        .engine
        .registry()
        .iter()
        .map(|d| Row {
            op: d.kind,
            permission: d.permission,
            confirm: d.confirm,
        })
        .collect();

    if ctx.json {
        output::json(&rows)?;
        return Ok(());
    }

    for row in &rows {
        let confirm = row
            .confirm
            .map(|key| format!("  (confirm: {key})"))
            .unwrap_or_default();
        output::print(
            format!("{:<16} {:<12}{}", row.op.key(), row.permission.to_string(), confirm),
            ctx.verbosity,
        );
    }
    Ok(())
}
