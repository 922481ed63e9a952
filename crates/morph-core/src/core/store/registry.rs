use morph_domain::WorkspaceName;

/// Enumerates stored workspaces from the keys of a storage medium.
pub struct WorkspaceRegistry;

impl WorkspaceRegistry {
    /// Keeps keys carrying the workspace prefix, stripped, in medium order.
    /// Keys that strip to an empty name are skipped.
    pub fn scan(keys: impl IntoIterator<Item = String>) -> Vec<WorkspaceName> {
        keys.into_iter()
            .filter_map(|key| WorkspaceName::from_storage_key(&key))
            .collect()
    }
}
