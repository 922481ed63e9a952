use std::fs;
use std::io::{self, BufRead, Read, Write};

use atty::Stream;
use color_eyre::Result;
use morph_core::domain::BundleField;
use morph_core::{
    CommandContext, CommandGroup, CommandInfo, DeleteRequest, ExecutionOutcome, FlagRequest,
    GistLinkRequest, GistPullRequest, SetRequest, UserError,
};
use serde_json::json;

use crate::cli::{CommandGroupCli, GistCommand, SetArgs, Switch};

pub fn dispatch_command(
    ctx: &CommandContext,
    group: &CommandGroupCli,
) -> Result<(CommandInfo, ExecutionOutcome)> {
    match group {
        CommandGroupCli::Show => {
            let info = CommandInfo::new(CommandGroup::Show, "show");
            core_call(info, || morph_core::workspace_show(ctx))
        }
        CommandGroupCli::List => {
            let info = CommandInfo::new(CommandGroup::List, "list");
            core_call(info, || morph_core::workspace_list(ctx))
        }
        CommandGroupCli::Set(args) => {
            let info = CommandInfo::new(CommandGroup::Set, "set");
            core_call(info, || {
                let request = set_request_from_args(args)?;
                morph_core::workspace_set(ctx, &request)
            })
        }
        CommandGroupCli::Flag(args) => {
            let info = CommandInfo::new(CommandGroup::Flag, "flag");
            let request = FlagRequest {
                flag: args.flag.into(),
                value: matches!(args.state, Switch::On),
            };
            core_call(info, || morph_core::workspace_flag(ctx, &request))
        }
        CommandGroupCli::Run => {
            let info = CommandInfo::new(CommandGroup::Run, "run");
            core_call(info, || morph_core::workspace_run(ctx))
        }
        CommandGroupCli::Delete(args) => {
            let info = CommandInfo::new(CommandGroup::Delete, "delete");
            let request = DeleteRequest {
                name: args.name.clone(),
            };
            core_call(info, || morph_core::workspace_delete(ctx, &request))
        }
        CommandGroupCli::Gist(command) => dispatch_gist(ctx, command),
    }
}

fn dispatch_gist(
    ctx: &CommandContext,
    command: &GistCommand,
) -> Result<(CommandInfo, ExecutionOutcome)> {
    match command {
        GistCommand::Link(args) => {
            let info = CommandInfo::new(CommandGroup::Gist, "link");
            let request = GistLinkRequest {
                id: args.id.clone(),
            };
            core_call(info, || morph_core::gist_link(ctx, &request))
        }
        GistCommand::Unlink => {
            let info = CommandInfo::new(CommandGroup::Gist, "unlink");
            core_call(info, || morph_core::gist_unlink(ctx))
        }
        GistCommand::Pull(args) => {
            let info = CommandInfo::new(CommandGroup::Gist, "pull");
            let assume_yes = args.yes;
            let can_prompt = !ctx.global.json && atty::is(Stream::Stdin);
            let confirm =
                move |fields: &[BundleField]| assume_yes || (can_prompt && prompt_overwrite(fields));
            let request = GistPullRequest { confirm: &confirm };
            core_call(info, || morph_core::gist_pull(ctx, &request))
        }
        GistCommand::Push => {
            let info = CommandInfo::new(CommandGroup::Gist, "push");
            core_call(info, || morph_core::gist_push(ctx))
        }
    }
}

fn set_request_from_args(args: &SetArgs) -> anyhow::Result<SetRequest> {
    let value = match (&args.value, &args.file) {
        (Some(value), _) => value.clone(),
        (None, Some(path)) => fs::read_to_string(path).map_err(|err| {
            UserError::new(
                format!("failed to read {}", path.display()),
                json!({
                    "reason": "unreadable_input",
                    "error": err.to_string(),
                    "hint": "pass an existing file to --file",
                }),
            )
        })?,
        (None, None) => {
            if atty::is(Stream::Stdin) {
                return Err(UserError::new(
                    "no value given",
                    json!({
                        "reason": "missing_value",
                        "hint": "pass VALUE, --file PATH, or pipe the value on stdin",
                    }),
                )
                .into());
            }
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    Ok(SetRequest {
        field: args.field.into(),
        value,
    })
}

fn prompt_overwrite(fields: &[BundleField]) -> bool {
    let names: Vec<&str> = fields.iter().map(|field| field.as_str()).collect();
    eprint!(
        "The gist would overwrite local {}. Continue? [y/N] ",
        names.join(" and ")
    );
    let _ = io::stderr().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn core_call<F>(info: CommandInfo, action: F) -> Result<(CommandInfo, ExecutionOutcome)>
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    match action() {
        Ok(result) => Ok((info, result)),
        Err(err) => {
            if let Some(user) = err.downcast_ref::<UserError>() {
                Ok((
                    info,
                    ExecutionOutcome::user_error(user.message().to_string(), user.details().clone()),
                ))
            } else {
                let issues: Vec<String> =
                    err.chain().map(std::string::ToString::to_string).collect();
                Ok((
                    info,
                    ExecutionOutcome::failure(
                        err.to_string(),
                        json!({
                            "reason": "internal_error",
                            "error": err.to_string(),
                            "issues": issues,
                            "hint": "Re-run with `-v` for more detail, or open an issue if this persists.",
                        }),
                    ),
                ))
            }
        }
    }
}
