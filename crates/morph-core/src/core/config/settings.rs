use std::collections::HashMap;
use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::core::engine::EngineLimits;
use crate::core::store::{resolve_storage_root, StorageLocation};

pub(crate) const DEFAULT_GIST_API: &str = "https://api.github.com";
pub(crate) const DEFAULT_TOKEN_ENV: &str = "MORPH_GIST_TOKEN";
const DEFAULT_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_MEMORY_MB: usize = 64;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub json: bool,
    /// Address whose fragment selects the active workspace.
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub(crate) fn flag_is_disabled(&self, key: &str) -> bool {
        self.var(key).is_some_and(|value| {
            let lowered = value.trim().to_ascii_lowercase();
            matches!(lowered.as_str(), "0" | "false" | "no" | "off" | "")
        })
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }

    fn positive_number<T: std::str::FromStr + PartialOrd + Default>(
        &self,
        key: &str,
    ) -> Result<Option<T>> {
        let Some(raw) = self.var(key) else {
            return Ok(None);
        };
        match raw.trim().parse::<T>() {
            Ok(value) if value > T::default() => Ok(Some(value)),
            _ => Err(anyhow!("{key} must be a positive integer (got {raw:?})")),
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub(crate) storage: StorageConfig,
    pub(crate) network: NetworkConfig,
    pub(crate) remote: RemoteConfig,
    pub(crate) eval: EvalConfig,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if the storage root cannot be resolved or a numeric
    /// setting is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let timeout_ms = snapshot
            .positive_number::<u64>("MORPH_EVAL_TIMEOUT_MS")?
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let memory_mb = snapshot
            .positive_number::<usize>("MORPH_EVAL_MEMORY_MB")?
            .unwrap_or(DEFAULT_MEMORY_MB);
        let token_env = snapshot
            .var("MORPH_GIST_TOKEN_ENV")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_TOKEN_ENV)
            .to_string();
        let token = snapshot
            .var(&token_env)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(ToOwned::to_owned);
        Ok(Self {
            storage: StorageConfig {
                location: resolve_storage_root(snapshot.var("MORPH_HOME"))?,
            },
            network: NetworkConfig {
                online: !snapshot.flag_is_disabled("MORPH_ONLINE"),
            },
            remote: RemoteConfig {
                api_base: snapshot
                    .var("MORPH_GIST_API")
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or(DEFAULT_GIST_API)
                    .to_string(),
                token_env,
                token,
            },
            eval: EvalConfig {
                limits: EngineLimits {
                    timeout: Duration::from_millis(timeout_ms),
                    memory_bytes: memory_mb.saturating_mul(1024 * 1024),
                },
            },
        })
    }

    #[must_use]
    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    #[must_use]
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    #[must_use]
    pub fn remote(&self) -> &RemoteConfig {
        &self.remote
    }

    #[must_use]
    pub fn eval(&self) -> &EvalConfig {
        &self.eval
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub location: StorageLocation,
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkConfig {
    pub online: bool,
}

#[derive(Clone)]
pub struct RemoteConfig {
    pub api_base: String,
    pub token_env: String,
    pub(crate) token: Option<String>,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("api_base", &self.api_base)
            .field("token_env", &self.token_env)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EvalConfig {
    pub limits: EngineLimits,
}
