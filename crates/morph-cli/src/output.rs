use atty::Stream;
use color_eyre::Result;
use morph_core::{CommandGroup, CommandInfo, ExecutionOutcome};
use serde_json::Value;

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

pub fn emit_output(
    opts: OutputOptions,
    info: CommandInfo,
    outcome: &ExecutionOutcome,
) -> Result<i32> {
    let code = outcome.status.exit_code();

    if opts.json {
        let payload = morph_core::to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }
    if opts.quiet {
        return Ok(code);
    }

    let style = Style::new(opts.no_color, atty::is(Stream::Stdout));
    let message = morph_core::format_status_message(info, &outcome.message);
    println!("{}", style.status(outcome.status, &message));
    for line in render_body(&style, info, &outcome.details) {
        println!("{line}");
    }
    if let Some(hint) = hint_from_details(&outcome.details) {
        println!("{}", style.info(&format!("Hint: {hint}")));
    }

    Ok(code)
}

fn render_body(style: &Style, info: CommandInfo, details: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    if info.group == CommandGroup::List {
        if let Some(workspaces) = details.get("workspaces").and_then(Value::as_array) {
            for entry in workspaces {
                let Some(address) = entry.get("address").and_then(Value::as_str) else {
                    continue;
                };
                let active = entry.get("active").and_then(Value::as_bool).unwrap_or(false);
                let marker = if active { "*" } else { " " };
                lines.push(format!("{marker} {address}"));
            }
        }
        return lines;
    }
    if info.group == CommandGroup::Show {
        for (label, key) in [("code", "code"), ("json", "json")] {
            if let Some(text) = details.get(key).and_then(Value::as_str) {
                lines.push(style.dim(&format!("── {label} ──")));
                lines.push(text.trim_end().to_string());
            }
        }
    }
    if let Some(rendered) = details
        .get("rendered")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
    {
        let ok = details
            .get("result")
            .and_then(|result| result.get("ok"))
            .and_then(Value::as_bool)
            .unwrap_or(true);
        if info.group == CommandGroup::Show {
            lines.push(style.dim("── result ──"));
        }
        lines.push(style.result(rendered, ok));
    }
    lines
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}
