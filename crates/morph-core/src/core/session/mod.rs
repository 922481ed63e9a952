//! The loaded view of one workspace and the execution-mode rules around it.
//!
//! Fast workspaces evaluate on every load. Slow workspaces evaluate only on
//! an explicit run, and that result lives next to the loaded state until the
//! session moves to another workspace.

use std::future::Future;

use anyhow::Result;
use morph_domain::{
    resolve, BundleField, EvaluationOutcome, Flag, Flags, RemoteBundle, RenderStyle,
    WorkspaceName, WorkspacePatch, WorkspaceRecord,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::core::engine::EvaluationEngine;
use crate::core::tooling::outcome::UserError;
use crate::effects::{RemoteClient, WorkspaceStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Fast,
    Slow,
}

impl ExecutionMode {
    #[must_use]
    pub fn from_flags(flags: &Flags) -> Self {
        if flags.slow {
            ExecutionMode::Slow
        } else {
            ExecutionMode::Fast
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::Fast => "fast",
            ExecutionMode::Slow => "slow",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedWorkspace {
    pub name: WorkspaceName,
    /// Every stored workspace at load time.
    pub names: Vec<WorkspaceName>,
    pub record: WorkspaceRecord,
    /// False when the record is the default stand-in for a missing one.
    pub persisted: bool,
    pub mode: ExecutionMode,
    /// Present only in fast mode.
    pub result: Option<EvaluationOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Applied(Vec<BundleField>),
    Unchanged,
    Declined(Vec<BundleField>),
}

pub struct Session<'a> {
    store: &'a dyn WorkspaceStore,
    engine: EvaluationEngine,
    state: LoadedWorkspace,
    last_result: Option<EvaluationOutcome>,
}

impl<'a> Session<'a> {
    /// Loads the workspace `address` points at.
    ///
    /// # Errors
    /// Returns an error if the stored workspaces cannot be listed.
    pub fn open(
        store: &'a dyn WorkspaceStore,
        engine: EvaluationEngine,
        address: &str,
    ) -> Result<Self> {
        let state = load(store, engine, resolve(address))?;
        Ok(Self {
            store,
            engine,
            state,
            last_result: None,
        })
    }

    pub fn state(&self) -> &LoadedWorkspace {
        &self.state
    }

    pub fn name(&self) -> &WorkspaceName {
        &self.state.name
    }

    pub fn record(&self) -> &WorkspaceRecord {
        &self.state.record
    }

    pub fn mode(&self) -> ExecutionMode {
        self.state.mode
    }

    /// Re-resolves `address` and loads its workspace. Moving to another
    /// workspace drops the slow-mode result.
    ///
    /// # Errors
    /// Returns an error if the stored workspaces cannot be listed.
    pub fn navigate(&mut self, address: &str) -> Result<()> {
        let name = resolve(address);
        if name != self.state.name {
            debug!(from = %self.state.name, to = %name, "switching workspace");
            self.last_result = None;
        }
        self.state = load(self.store, self.engine, name)?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the stored workspaces cannot be listed.
    pub fn reload(&mut self) -> Result<()> {
        self.state = load(self.store, self.engine, self.state.name.clone())?;
        Ok(())
    }

    /// Applies `patch` on top of the freshest stored record, writes it
    /// through, and reloads.
    ///
    /// # Errors
    /// Returns an error if the record cannot be saved or reloaded.
    pub fn edit(&mut self, patch: WorkspacePatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let base = self
            .store
            .get(&self.state.name)
            .unwrap_or_else(|| self.state.record.clone());
        let record = patch.apply(Some(base));
        self.store.put(&self.state.name, &record)?;
        self.reload()
    }

    /// # Errors
    /// Returns an error if the record cannot be saved or reloaded.
    pub fn set_flag(&mut self, flag: Flag, value: bool) -> Result<()> {
        self.edit(WorkspacePatch::default().flag(flag, value))
    }

    /// Removes `name`'s record. The active name stays selected; deleting it
    /// loads the defaults in its place.
    ///
    /// # Errors
    /// Returns an error if the record cannot be removed.
    pub fn delete(&mut self, name: &WorkspaceName) -> Result<()> {
        self.store.delete(name)?;
        if *name == self.state.name {
            self.last_result = None;
        }
        self.reload()
    }

    /// Snapshots the current script and document for an evaluation on the
    /// blocking pool; it starts when the returned future is first polled.
    /// Completions are applied with [`Session::apply_result`] in whatever
    /// order they arrive.
    pub fn spawn_run(&self) -> impl Future<Output = EvaluationOutcome> + Send + 'static {
        let engine = self.engine;
        let code = self.state.record.code.clone();
        let json = self.state.record.json.clone();
        engine.run_detached(code, json)
    }

    /// Stores a completed evaluation as the last result. The latest call wins.
    pub fn apply_result(&mut self, outcome: EvaluationOutcome) -> &EvaluationOutcome {
        debug!(workspace = %self.state.name, ok = outcome.is_ok(), "applying evaluation result");
        self.last_result.insert(outcome)
    }

    /// Explicit evaluation, the slow-mode trigger.
    pub async fn run(&mut self) -> &EvaluationOutcome {
        let outcome = self.spawn_run().await;
        self.apply_result(outcome)
    }

    /// Fast mode shows the load-time result, slow mode the last explicit run.
    pub fn displayed_result(&self) -> Option<&EvaluationOutcome> {
        match self.state.mode {
            ExecutionMode::Fast => self.state.result.as_ref(),
            ExecutionMode::Slow => self.last_result.as_ref(),
        }
    }

    pub fn render_style(&self) -> RenderStyle {
        RenderStyle::from_simple_flag(self.state.record.flags.simple)
    }

    pub fn render_result(&self) -> String {
        self.displayed_result()
            .map(|outcome| outcome.render(self.render_style()))
            .unwrap_or_default()
    }

    /// # Errors
    /// Returns a [`UserError`] for an empty id, or an error if the record
    /// cannot be saved.
    pub fn link_remote(&mut self, remote_ref: &str) -> Result<()> {
        let remote_ref = remote_ref.trim();
        if remote_ref.is_empty() {
            return Err(UserError::new(
                "gist id must not be empty",
                json!({ "reason": "invalid_gist_id", "hint": "pass the id from the gist URL" }),
            )
            .into());
        }
        self.edit(WorkspacePatch::default().link(remote_ref))
    }

    /// # Errors
    /// Returns an error if the record cannot be saved.
    pub fn unlink_remote(&mut self) -> Result<()> {
        if self.state.record.gist.is_none() {
            return Ok(());
        }
        self.edit(WorkspacePatch::default().unlink())
    }

    /// Fetches the linked gist and applies it. `confirm` is asked first when
    /// the bundle would overwrite local values that differ.
    ///
    /// # Errors
    /// Returns a [`UserError`] when no gist is linked, the fetch error when
    /// the gist cannot be read, or an error if the update cannot be saved.
    pub fn pull_remote<F>(&mut self, client: &dyn RemoteClient, confirm: F) -> Result<PullOutcome>
    where
        F: FnOnce(&[BundleField]) -> bool,
    {
        let remote_ref = self.linked_remote()?;
        let bundle = client.fetch_bundle(&remote_ref)?;
        let changed = bundle.overwrites(&self.state.record);
        if changed.is_empty() {
            debug!(workspace = %self.state.name, gist = %remote_ref, "gist matches workspace");
            return Ok(PullOutcome::Unchanged);
        }
        if !confirm(&changed) {
            warn!(workspace = %self.state.name, gist = %remote_ref, "pull declined");
            return Ok(PullOutcome::Declined(changed));
        }
        self.edit(bundle.to_patch())?;
        info!(workspace = %self.state.name, gist = %remote_ref, "pulled gist");
        Ok(PullOutcome::Applied(changed))
    }

    /// Saves the current script and document to the linked gist.
    ///
    /// # Errors
    /// Returns a [`UserError`] when no gist is linked, or the save error.
    pub fn push_remote(&self, client: &dyn RemoteClient) -> Result<String> {
        let remote_ref = self.linked_remote()?;
        client.save_bundle(&remote_ref, &RemoteBundle::from_record(&self.state.record))?;
        info!(workspace = %self.state.name, gist = %remote_ref, "pushed gist");
        Ok(remote_ref)
    }

    fn linked_remote(&self) -> Result<String> {
        let linked = self
            .state
            .record
            .gist
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        linked.map(ToOwned::to_owned).ok_or_else(|| {
            UserError::new(
                format!("workspace #{} has no linked gist", self.state.name),
                json!({
                    "reason": "no_gist_linked",
                    "workspace": self.state.name,
                    "hint": "run `morph gist link <ID>` first",
                }),
            )
            .into()
        })
    }
}

fn load(
    store: &dyn WorkspaceStore,
    engine: EvaluationEngine,
    name: WorkspaceName,
) -> Result<LoadedWorkspace> {
    let stored = store.get(&name);
    let persisted = stored.is_some();
    let record = stored.unwrap_or_default();
    let names = store.list_names()?;
    let mode = ExecutionMode::from_flags(&record.flags);
    let result = match mode {
        ExecutionMode::Fast => Some(engine.run(&record.code, &record.json)),
        ExecutionMode::Slow => None,
    };
    debug!(workspace = %name, persisted, mode = mode.as_str(), "workspace loaded");
    Ok(LoadedWorkspace {
        name,
        names,
        record,
        persisted,
        mode,
        result,
    })
}
