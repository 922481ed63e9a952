use std::sync::Arc;

use anyhow::{Context, Result};
use morph_domain::{RemoteBundle, WorkspaceName, WorkspaceRecord};

use crate::config::Config;
use crate::core::remote::{GistClient, RemoteSyncError};
use crate::core::store::{DirStorage, StorageWorkspaceStore};

/// Persistence of workspace records, one per name.
pub trait WorkspaceStore: Send + Sync {
    /// `None` when the record is absent or unreadable.
    fn get(&self, name: &WorkspaceName) -> Option<WorkspaceRecord>;
    /// Replaces the whole record.
    fn put(&self, name: &WorkspaceName, record: &WorkspaceRecord) -> Result<()>;
    /// Removing an absent record succeeds.
    fn delete(&self, name: &WorkspaceName) -> Result<()>;
    fn list_names(&self) -> Result<Vec<WorkspaceName>>;
}

pub trait RemoteClient: Send + Sync {
    fn fetch_bundle(&self, remote_ref: &str) -> Result<RemoteBundle, RemoteSyncError>;
    fn save_bundle(&self, remote_ref: &str, bundle: &RemoteBundle) -> Result<(), RemoteSyncError>;
}

pub trait Effects: Send + Sync {
    fn store(&self) -> &dyn WorkspaceStore;
    fn remote(&self) -> &dyn RemoteClient;
}

pub struct SystemEffects {
    store: Arc<StorageWorkspaceStore>,
    remote: Arc<GistClient>,
}

impl SystemEffects {
    /// Directory-backed store under the configured storage root and the gist
    /// client for the configured API.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let root = &config.storage().location.path;
        Ok(Self {
            store: Arc::new(StorageWorkspaceStore::new(DirStorage::new(root))),
            remote: Arc::new(
                GistClient::from_config(config).context("failed to prepare the gist client")?,
            ),
        })
    }
}

impl Effects for SystemEffects {
    fn store(&self) -> &dyn WorkspaceStore {
        self.store.as_ref()
    }

    fn remote(&self) -> &dyn RemoteClient {
        self.remote.as_ref()
    }
}

pub type SharedEffects = Arc<dyn Effects>;
