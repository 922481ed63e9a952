#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod address;
pub mod outcome;
pub mod remote;
pub mod workspace;

pub use address::{address_for, resolve};
pub use outcome::{EvaluationFault, EvaluationOutcome, FaultKind, RenderStyle};
pub use remote::{BundleField, GistFile, GistPayload, RemoteBundle, DOCUMENT_FILE, SCRIPT_FILE};
pub use workspace::{
    Flag, Flags, WorkspaceName, WorkspaceNameError, WorkspacePatch, WorkspaceRecord, DEFAULT_CODE,
    DEFAULT_DOCUMENT, DEFAULT_WORKSPACE, STORAGE_PREFIX,
};
