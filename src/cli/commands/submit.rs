//! submit command - Run one operation through the engine

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use crate::cli::args::Target;
use crate::cli::Context;
use crate::engine::form::{Form, CONFIRMED_SUFFIX};
use crate::engine::{Outcome, Request, Status};
use crate::ui::output;

/// Arguments of `ef submit`.
#[derive(Debug, Clone)]
pub struct SubmitArgs {
    pub op: String,
    pub target: Target,
    pub fields: Vec<String>,
    pub raw_fields: Vec<String>,
    pub content_file: Option<PathBuf>,
    pub confirm: bool,
    pub return_to_directory: bool,
}

/// Assemble the form for `args`, without reading `--content-file`.
pub fn build_form(args: &SubmitArgs) -> Result<Form> {
    let mut form = Form::new();
    for raw in &args.raw_fields {
        let (key, value) = Form::parse_pair(raw)?;
        form.insert(key, value);
    }
    for field in &args.fields {
        let (key, value) = Form::parse_pair(field)?;
        form.insert(format!("{}~{}", args.op, key), value);
    }
    if args.return_to_directory {
        form.insert("return", "directory");
    }
    let submit = if args.confirm {
        format!("{}{}", args.op, CONFIRMED_SUFFIX)
    } else {
        args.op.clone()
    };
    form.insert("submit", submit);
    Ok(form)
}

fn read_content(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read content from stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read content file '{}'", path.display()))
}

/// Run one operation.
pub fn submit(ctx: &Context, args: SubmitArgs) -> Result<()> {
    let resource = ctx.resource(&args.target)?;
    let mut form = build_form(&args)?;
    if let Some(path) = &args.content_file {
        form.insert("content", read_content(path)?);
    }

    let request = Request::new(ctx.editor.clone(), resource, form);
    let outcome = ctx.engine.dispatch(&request)?;

    if ctx.json {
        output::json(&outcome)?;
    } else {
        report(ctx, &outcome);
    }

    if !outcome.is_done() {
        bail!("{} {}", args.op, failure(&outcome));
    }
    Ok(())
}

fn report(ctx: &Context, outcome: &Outcome) {
    for notice in &outcome.notices {
        output::notice(notice, ctx.verbosity);
    }
    if outcome.is_done() {
        output::print(format!("done, next: {}", outcome.redirect), ctx.verbosity);
    }
}

fn failure(outcome: &Outcome) -> String {
    match &outcome.status {
        Status::Done => "done".to_string(),
        Status::UnknownOperation => "is not an operation".to_string(),
        Status::Denied { missing } => format!("denied: missing '{missing}' permission"),
        Status::NeedsConfirmation => "needs confirmation; pass --confirm".to_string(),
        Status::Invalid { errors } => format!("rejected: {errors}"),
        Status::Failed { kind, message } => format!("failed ({kind}): {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(op: &str) -> SubmitArgs {
        SubmitArgs {
            op: op.to_string(),
            target: Target {
                fsid: "content".to_string(),
                path: "blog/a.md".to_string(),
                code: "en".to_string(),
            },
            fields: Vec::new(),
            raw_fields: Vec::new(),
            content_file: None,
            confirm: false,
            return_to_directory: false,
        }
    }

    #[test]
    fn fields_are_scoped_to_the_operation() {
        let mut a = args("copy");
        a.fields = vec!["dst-name=b.md".to_string()];
        a.raw_fields = vec!["q=term".to_string()];
        let form = build_form(&a).expect("form");
        assert_eq!(form.scoped("copy", "dst-name"), Some("b.md"));
        assert_eq!(form.value("q"), Some("term"));
        assert_eq!(form.submit().expect("submit").key, "copy");
    }

    #[test]
    fn confirm_marks_submit_value() {
        let mut a = args("delete");
        a.confirm = true;
        a.return_to_directory = true;
        let form = build_form(&a).expect("form");
        let submit = form.submit().expect("submit");
        assert_eq!(submit.key, "delete");
        assert!(submit.confirmed);
        assert!(form.returns_to_directory());
    }

    #[test]
    fn malformed_field_rejected() {
        let mut a = args("change");
        a.fields = vec!["title".to_string()];
        assert!(build_form(&a).is_err());
    }
}
