//! Workspace persistence: the storage medium, the record store on top of it,
//! and the registry that enumerates stored workspaces.

mod location;
mod registry;
mod storage;

pub use location::{resolve_storage_root, StorageLocation};
pub use registry::WorkspaceRegistry;
pub use storage::{DirStorage, MemoryStorage, StorageError, StorageMedium};

use anyhow::{Context, Result};
use morph_domain::{WorkspaceName, WorkspaceRecord};
use tracing::debug;

use crate::effects::WorkspaceStore;

/// [`WorkspaceStore`] backed by any [`StorageMedium`], one key per workspace.
pub struct StorageWorkspaceStore {
    medium: Box<dyn StorageMedium>,
}

impl StorageWorkspaceStore {
    pub fn new(medium: impl StorageMedium + 'static) -> Self {
        Self {
            medium: Box::new(medium),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::default())
    }
}

impl WorkspaceStore for StorageWorkspaceStore {
    fn get(&self, name: &WorkspaceName) -> Option<WorkspaceRecord> {
        let key = name.storage_key();
        let raw = match self.medium.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                debug!(workspace = %name, error = %err, "unreadable workspace record treated as absent");
                return None;
            }
        };
        match serde_json::from_str::<WorkspaceRecord>(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                debug!(workspace = %name, error = %err, "malformed workspace record treated as absent");
                None
            }
        }
    }

    fn put(&self, name: &WorkspaceName, record: &WorkspaceRecord) -> Result<()> {
        let serialized = serde_json::to_string(record).context("failed to serialize workspace")?;
        self.medium
            .set_item(&name.storage_key(), &serialized)
            .with_context(|| format!("failed to save workspace {name}"))?;
        debug!(workspace = %name, bytes = serialized.len(), "workspace saved");
        Ok(())
    }

    fn delete(&self, name: &WorkspaceName) -> Result<()> {
        self.medium
            .remove_item(&name.storage_key())
            .with_context(|| format!("failed to delete workspace {name}"))?;
        debug!(workspace = %name, "workspace deleted");
        Ok(())
    }

    fn list_names(&self) -> Result<Vec<WorkspaceName>> {
        let keys = self
            .medium
            .keys()
            .context("failed to enumerate stored workspaces")?;
        Ok(WorkspaceRegistry::scan(keys))
    }
}
