#![deny(clippy::all)]

mod core;

pub(crate) use crate::core::config;
pub(crate) use crate::core::runtime::effects;

pub use crate::core::commands::{
    gist_link, gist_pull, gist_push, gist_unlink, workspace_delete, workspace_flag,
    workspace_list, workspace_run, workspace_set, workspace_show, DeleteRequest, EditField,
    FlagRequest, GistLinkRequest, GistPullRequest, SetRequest,
};
pub use crate::core::config::context::{CommandContext, CommandInfo};
pub use crate::core::config::{
    Config, EvalConfig, GlobalOptions, NetworkConfig, RemoteConfig, StorageConfig,
};
pub use crate::core::engine::{EngineLimits, EvaluationEngine, Transform};
pub use crate::core::remote::{build_http_client, GistClient, RemoteSyncError};
pub use crate::core::runtime::effects::{
    Effects, RemoteClient, SharedEffects, SystemEffects, WorkspaceStore,
};
pub use crate::core::runtime::{format_status_message, to_json_response, CommandGroup};
pub use crate::core::session::{ExecutionMode, LoadedWorkspace, PullOutcome, Session};
pub use crate::core::store::{
    resolve_storage_root, DirStorage, MemoryStorage, StorageError, StorageLocation,
    StorageMedium, StorageWorkspaceStore, WorkspaceRegistry,
};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome, UserError};

pub use morph_domain as domain;

pub(crate) const MORPH_VERSION: &str = env!("CARGO_PKG_VERSION");
