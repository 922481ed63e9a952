use anyhow::{Context, Result};
use morph_domain::{address_for, Flag, WorkspaceName, WorkspacePatch};
use serde_json::json;
use tokio::runtime::Builder;

use super::{merge_details, open_session, workspace_details};
use crate::config::context::CommandContext;
use crate::core::tooling::outcome::ExecutionOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Code,
    Json,
}

impl EditField {
    fn as_str(self) -> &'static str {
        match self {
            EditField::Code => "code",
            EditField::Json => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SetRequest {
    pub field: EditField,
    pub value: String,
}

#[derive(Debug, Clone, Copy)]
pub struct FlagRequest {
    pub flag: Flag,
    pub value: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    /// Defaults to the active workspace.
    pub name: Option<String>,
}

/// Loads the active workspace; fast workspaces are evaluated.
///
/// # Errors
/// Returns an error if the store cannot be listed.
pub fn workspace_show(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let session = open_session(ctx)?;
    let message = format!(
        "{} ({} mode{})",
        address_for(session.name()),
        session.mode().as_str(),
        if session.state().persisted { "" } else { ", unsaved" }
    );
    let location = &ctx.config().storage().location;
    Ok(ExecutionOutcome::success(
        message,
        merge_details(
            workspace_details(&session),
            json!({
                "storage": {
                    "path": location.path.display().to_string(),
                    "source": location.source,
                },
            }),
        ),
    ))
}

/// # Errors
/// Returns an error if the store cannot be listed.
pub fn workspace_list(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let active = ctx.active_name();
    let names = ctx.store().list_names()?;
    let workspaces: Vec<_> = names
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "address": address_for(name),
                "active": *name == active,
            })
        })
        .collect();
    let message = match names.len() {
        0 => "no saved workspaces".to_string(),
        1 => "1 workspace".to_string(),
        count => format!("{count} workspaces"),
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({ "active": active, "workspaces": workspaces }),
    ))
}

/// Write-through edit of the script or document.
///
/// # Errors
/// Returns an error if the record cannot be saved.
pub fn workspace_set(ctx: &CommandContext, request: &SetRequest) -> Result<ExecutionOutcome> {
    let mut session = open_session(ctx)?;
    let patch = match request.field {
        EditField::Code => WorkspacePatch::default().code(request.value.clone()),
        EditField::Json => WorkspacePatch::default().json(request.value.clone()),
    };
    session.edit(patch)?;
    let message = format!(
        "updated {} of {}",
        request.field.as_str(),
        address_for(session.name())
    );
    Ok(ExecutionOutcome::success(message, workspace_details(&session)))
}

/// Persisted flag toggle.
///
/// # Errors
/// Returns an error if the record cannot be saved.
pub fn workspace_flag(ctx: &CommandContext, request: &FlagRequest) -> Result<ExecutionOutcome> {
    let mut session = open_session(ctx)?;
    session.set_flag(request.flag, request.value)?;
    let message = format!(
        "{} {} for {}",
        request.flag,
        if request.value { "on" } else { "off" },
        address_for(session.name())
    );
    Ok(ExecutionOutcome::success(message, workspace_details(&session)))
}

/// Explicit evaluation of the active workspace, whatever its mode.
///
/// Fast workspaces were just evaluated by loading them; that result is
/// reused. A failing script is still a successful command; the fault is the
/// result.
///
/// # Errors
/// Returns an error if the evaluation runtime cannot be started.
pub fn workspace_run(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let mut session = open_session(ctx)?;
    let outcome = match session.state().result.clone() {
        Some(loaded) => session.apply_result(loaded).clone(),
        None => {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to create evaluation runtime")?;
            runtime.block_on(session.run()).clone()
        }
    };
    let style = session.render_style();
    let message = match outcome.fault_kind() {
        None => format!("evaluated {}", address_for(session.name())),
        Some(kind) => format!("{} failed: {}", address_for(session.name()), kind.label()),
    };
    let details = merge_details(
        workspace_details(&session),
        json!({
            "result": outcome.to_json(),
            "rendered": outcome.render(style),
        }),
    );
    Ok(ExecutionOutcome::success(message, details))
}

/// Removes a stored workspace. The active address is left alone.
///
/// # Errors
/// Returns an error if the record cannot be removed.
pub fn workspace_delete(ctx: &CommandContext, request: &DeleteRequest) -> Result<ExecutionOutcome> {
    let mut session = open_session(ctx)?;
    let name = match &request.name {
        Some(raw) => match WorkspaceName::new(raw.strip_prefix('#').unwrap_or(raw)) {
            Ok(name) => name,
            Err(err) => {
                return Ok(ExecutionOutcome::user_error(
                    err.to_string(),
                    json!({ "reason": "invalid_workspace", "hint": "pass a name such as `orders`" }),
                ))
            }
        },
        None => session.name().clone(),
    };
    let existed = session.state().names.contains(&name);
    session.delete(&name)?;
    let message = if existed {
        format!("deleted {}", address_for(&name))
    } else {
        format!("{} was not saved", address_for(&name))
    };
    Ok(ExecutionOutcome::success(
        message,
        merge_details(
            workspace_details(&session),
            json!({ "deleted": name, "existed": existed }),
        ),
    ))
}
