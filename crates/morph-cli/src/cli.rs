use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use morph_core::domain::Flag;
use morph_core::EditField;

pub const MORPH_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const MORPH_BEFORE_HELP: &str = concat!(
    "morph ",
    env!("CARGO_PKG_VERSION"),
    " – run Luau transforms against JSON documents\n\n",
    "\x1b[1;36mWorkspaces\x1b[0m\n",
    "  show             Load the active workspace; fast workspaces are evaluated.\n",
    "  list             List saved workspaces as #addresses.\n",
    "  set              Replace the script or the document (saved immediately).\n",
    "  flag             Toggle the slow or simple flag.\n",
    "  run              Evaluate the script against the document now.\n",
    "  delete           Remove a saved workspace.\n\n",
    "\x1b[1;36mSharing\x1b[0m\n",
    "  gist             Link, pull, or push the workspace through a gist.\n\n",
    "Pick the workspace with --at '#name' (or MORPH_ADDRESS); the default is #default.\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = MORPH_BEFORE_HELP,
    help_template = MORPH_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct MorphCli {
    #[arg(
        long,
        value_name = "ADDRESS",
        env = "MORPH_ADDRESS",
        help = "Address whose #fragment names the workspace",
        global = true
    )]
    pub at: Option<String>,
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Load the active workspace and show its script, document, and result.",
        override_usage = "morph show"
    )]
    Show,
    #[command(
        about = "List saved workspaces.",
        override_usage = "morph list"
    )]
    List,
    #[command(
        about = "Replace the script or the document of the active workspace.",
        override_usage = "morph set <code|json> [VALUE] [--file PATH]",
        after_help = "Examples:\n  morph --at '#orders' set json '[1,2,3]'\n  morph set code --file transform.luau\n  cat data.json | morph set json"
    )]
    Set(SetArgs),
    #[command(
        about = "Turn a workspace flag on or off.",
        override_usage = "morph flag <slow|simple> <on|off>"
    )]
    Flag(FlagArgs),
    #[command(
        about = "Evaluate the script against the document now (the slow-mode trigger).",
        override_usage = "morph run"
    )]
    Run,
    #[command(
        about = "Remove a saved workspace (the active one by default).",
        override_usage = "morph delete [NAME]"
    )]
    Delete(DeleteArgs),
    #[command(subcommand, about = "Share the workspace through a gist.")]
    Gist(GistCommand),
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[arg(value_enum)]
    pub field: FieldArg,
    #[arg(value_name = "VALUE", conflicts_with = "file")]
    pub value: Option<String>,
    #[arg(long, value_name = "PATH", help = "Read the new value from a file")]
    pub file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FieldArg {
    Code,
    Json,
}

impl From<FieldArg> for EditField {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::Code => EditField::Code,
            FieldArg::Json => EditField::Json,
        }
    }
}

#[derive(Args, Debug)]
pub struct FlagArgs {
    #[arg(value_enum)]
    pub flag: FlagArg,
    #[arg(value_enum)]
    pub state: Switch,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FlagArg {
    Slow,
    Simple,
}

impl From<FlagArg> for Flag {
    fn from(arg: FlagArg) -> Self {
        match arg {
            FlagArg::Slow => Flag::Slow,
            FlagArg::Simple => Flag::Simple,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[arg(value_name = "NAME")]
    pub name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum GistCommand {
    #[command(about = "Link the workspace to a gist id.", override_usage = "morph gist link <ID>")]
    Link(GistLinkArgs),
    #[command(about = "Forget the linked gist.", override_usage = "morph gist unlink")]
    Unlink,
    #[command(
        about = "Replace the script and document with the gist's files.",
        override_usage = "morph gist pull [--yes]"
    )]
    Pull(GistPullArgs),
    #[command(
        about = "Save the script and document to the gist (needs a token).",
        override_usage = "morph gist push"
    )]
    Push,
}

#[derive(Args, Debug)]
pub struct GistLinkArgs {
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug)]
pub struct GistPullArgs {
    #[arg(short, long, help = "Overwrite local changes without asking")]
    pub yes: bool,
}
