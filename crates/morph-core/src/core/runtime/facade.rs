use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::context::CommandInfo;
use crate::core::tooling::outcome::ExecutionOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandGroup {
    Show,
    List,
    Set,
    Flag,
    Run,
    Delete,
    Gist,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Show => "show",
            CommandGroup::List => "list",
            CommandGroup::Set => "set",
            CommandGroup::Flag => "flag",
            CommandGroup::Run => "run",
            CommandGroup::Delete => "delete",
            CommandGroup::Gist => "gist",
        };
        f.write_str(name)
    }
}

/// The `{status, message, details}` envelope printed by `--json`.
#[must_use]
pub fn to_json_response(info: CommandInfo, outcome: &ExecutionOutcome) -> Value {
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": outcome.status.as_str(),
        "message": format_status_message(info, &outcome.message),
        "details": details,
    })
}

#[must_use]
pub fn format_status_message(info: CommandInfo, message: &str) -> String {
    let group_name = info.group.to_string();
    let prefix = if group_name == info.name {
        format!("morph {}", info.name)
    } else {
        format!("morph {} {}", group_name, info.name)
    };
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tooling::outcome::CommandStatus;

    #[test]
    fn messages_are_prefixed_with_the_command() {
        let show = CommandInfo::new(CommandGroup::Show, "show");
        assert_eq!(format_status_message(show, ""), "morph show");
        assert_eq!(format_status_message(show, "loaded #a"), "morph show: loaded #a");

        let pull = CommandInfo::new(CommandGroup::Gist, "pull");
        assert_eq!(format_status_message(pull, "applied"), "morph gist pull: applied");
        assert_eq!(
            format_status_message(pull, "morph gist pull: already"),
            "morph gist pull: already"
        );
    }

    #[test]
    fn json_envelope_wraps_non_object_details() {
        let info = CommandInfo::new(CommandGroup::List, "list");
        let outcome = ExecutionOutcome::success("2 workspaces", json!(["#a", "#b"]));
        let payload = to_json_response(info, &outcome);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "morph list: 2 workspaces");
        assert_eq!(payload["details"]["value"], json!(["#a", "#b"]));

        let outcome = ExecutionOutcome {
            status: CommandStatus::UserError,
            message: "no gist".into(),
            details: Value::Null,
        };
        let payload = to_json_response(info, &outcome);
        assert_eq!(payload["status"], "user-error");
        assert_eq!(payload["details"], json!({}));
    }
}
