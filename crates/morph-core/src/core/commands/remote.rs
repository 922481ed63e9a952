use anyhow::Result;
use morph_domain::{address_for, BundleField};
use serde_json::{json, Value};

use super::{merge_details, open_session, workspace_details};
use crate::config::context::CommandContext;
use crate::core::remote::RemoteSyncError;
use crate::core::session::PullOutcome;
use crate::core::tooling::outcome::ExecutionOutcome;

#[derive(Debug, Clone)]
pub struct GistLinkRequest {
    pub id: String,
}

pub struct GistPullRequest<'a> {
    /// Asked with the fields a pull would overwrite; `false` cancels.
    pub confirm: &'a dyn Fn(&[BundleField]) -> bool,
}

/// # Errors
/// Returns an error if the record cannot be saved.
pub fn gist_link(ctx: &CommandContext, request: &GistLinkRequest) -> Result<ExecutionOutcome> {
    let mut session = open_session(ctx)?;
    session.link_remote(&request.id)?;
    let message = format!(
        "linked {} to gist {}",
        address_for(session.name()),
        request.id.trim()
    );
    Ok(ExecutionOutcome::success(message, workspace_details(&session)))
}

/// # Errors
/// Returns an error if the record cannot be saved.
pub fn gist_unlink(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let mut session = open_session(ctx)?;
    let previous = session.record().gist.clone();
    session.unlink_remote()?;
    let message = match &previous {
        Some(id) => format!("unlinked {} from gist {id}", address_for(session.name())),
        None => format!("{} has no linked gist", address_for(session.name())),
    };
    Ok(ExecutionOutcome::success(
        message,
        merge_details(workspace_details(&session), json!({ "unlinked": previous })),
    ))
}

/// Fetches the linked gist into the active workspace.
///
/// # Errors
/// Returns an error if the workspace cannot be loaded or saved.
pub fn gist_pull(ctx: &CommandContext, request: &GistPullRequest<'_>) -> Result<ExecutionOutcome> {
    let mut session = open_session(ctx)?;
    let pulled = match session.pull_remote(ctx.remote(), request.confirm) {
        Ok(pulled) => pulled,
        Err(err) => return remote_failure(err),
    };
    let address = address_for(session.name());
    let outcome = match pulled {
        PullOutcome::Applied(fields) => ExecutionOutcome::success(
            format!("pulled {} into {address}", field_list(&fields)),
            merge_details(
                workspace_details(&session),
                json!({ "pull": "applied", "fields": field_names(&fields) }),
            ),
        ),
        PullOutcome::Unchanged => ExecutionOutcome::success(
            format!("{address} already matches the gist"),
            merge_details(workspace_details(&session), json!({ "pull": "unchanged" })),
        ),
        PullOutcome::Declined(fields) => ExecutionOutcome::user_error(
            format!("pull would overwrite {} of {address}", field_list(&fields)),
            json!({
                "reason": "pull_not_confirmed",
                "pull": "declined",
                "fields": field_names(&fields),
                "hint": "re-run with `--yes` to overwrite local changes",
            }),
        ),
    };
    Ok(outcome)
}

/// Saves the active workspace's script and document to its gist.
///
/// # Errors
/// Returns an error if the workspace cannot be loaded.
pub fn gist_push(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let session = open_session(ctx)?;
    match session.push_remote(ctx.remote()) {
        Ok(id) => Ok(ExecutionOutcome::success(
            format!("pushed {} to gist {id}", address_for(session.name())),
            workspace_details(&session),
        )),
        Err(err) => remote_failure(err),
    }
}

/// Turns a sync failure into an outcome; anything else keeps propagating.
fn remote_failure(err: anyhow::Error) -> Result<ExecutionOutcome> {
    let Some(sync) = err.downcast_ref::<RemoteSyncError>() else {
        return Err(err);
    };
    let mut details = json!({
        "reason": sync.reason(),
        "error": sync.to_string(),
    });
    if let Some(hint) = sync.hint() {
        details["hint"] = Value::String(hint);
    }
    if sync.is_user_error() {
        Ok(ExecutionOutcome::user_error(sync.to_string(), details))
    } else {
        let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
        details["issues"] = json!(issues);
        Ok(ExecutionOutcome::failure(sync.to_string(), details))
    }
}

fn field_names(fields: &[BundleField]) -> Vec<&'static str> {
    fields.iter().map(|field| field.as_str()).collect()
}

fn field_list(fields: &[BundleField]) -> String {
    field_names(fields).join(" and ")
}
