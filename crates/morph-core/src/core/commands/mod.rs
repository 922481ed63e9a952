//! Command handlers behind the `morph` CLI. Each one opens a session on the
//! active workspace, performs one action, and reports an [`ExecutionOutcome`].

mod remote;
mod workspace;

pub use remote::{gist_link, gist_pull, gist_push, gist_unlink, GistLinkRequest, GistPullRequest};
pub use workspace::{
    workspace_delete, workspace_flag, workspace_list, workspace_run, workspace_set,
    workspace_show, DeleteRequest, EditField, FlagRequest, SetRequest,
};

use anyhow::Result;
use morph_domain::address_for;
use serde_json::{json, Value};

use crate::config::context::CommandContext;
use crate::core::session::Session;

fn open_session<'c>(ctx: &'c CommandContext<'_>) -> Result<Session<'c>> {
    Session::open(ctx.store(), ctx.engine(), ctx.address())
}

/// Snapshot of a session as reported in command details.
fn workspace_details(session: &Session<'_>) -> Value {
    let state = session.state();
    let names: Vec<String> = state.names.iter().map(address_for).collect();
    json!({
        "workspace": state.name,
        "address": address_for(&state.name),
        "persisted": state.persisted,
        "names": names,
        "mode": state.mode,
        "code": state.record.code,
        "json": state.record.json,
        "flags": state.record.flags,
        "gist": state.record.gist,
        "result": session.displayed_result().map(morph_domain::EvaluationOutcome::to_json),
        "rendered": session.render_result(),
    })
}

fn merge_details(mut details: Value, extra: Value) -> Value {
    if let (Value::Object(base), Value::Object(extra)) = (&mut details, extra) {
        base.extend(extra);
    }
    details
}
