use anyhow::Result;
use morph_domain::{resolve, WorkspaceName};

use crate::config::{Config, GlobalOptions};
use crate::core::engine::EvaluationEngine;
use crate::effects::{self, SharedEffects, SystemEffects};
use crate::CommandGroup;

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

/// Everything a command handler needs: options, configuration, and effects.
pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a context with the system effects for the current environment.
    ///
    /// # Errors
    /// Returns an error if configuration is invalid or the effects cannot be
    /// prepared.
    pub fn new(global: &'a GlobalOptions) -> Result<Self> {
        let config = Config::from_env()?;
        let effects: SharedEffects = std::sync::Arc::new(SystemEffects::from_config(&config)?);
        Ok(Self::with_effects(global, config, effects))
    }

    #[must_use]
    pub fn with_effects(global: &'a GlobalOptions, config: Config, effects: SharedEffects) -> Self {
        Self {
            global,
            config,
            effects,
        }
    }

    pub fn store(&self) -> &dyn effects::WorkspaceStore {
        self.effects.store()
    }

    pub fn remote(&self) -> &dyn effects::RemoteClient {
        self.effects.remote()
    }

    #[must_use]
    pub fn engine(&self) -> EvaluationEngine {
        EvaluationEngine::new(self.config.eval().limits)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The address the command acts on; empty selects the default workspace.
    pub fn address(&self) -> &str {
        self.global.address.as_deref().unwrap_or("")
    }

    pub fn active_name(&self) -> WorkspaceName {
        resolve(self.address())
    }
}
