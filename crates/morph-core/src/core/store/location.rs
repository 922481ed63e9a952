use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct StorageLocation {
    pub path: PathBuf,
    pub source: &'static str,
}

/// Picks the directory workspace records live in.
///
/// `MORPH_HOME` wins when set; otherwise the platform data directory, then
/// `~/.morph/storage`, then the temp directory.
///
/// # Errors
/// Returns an error when a relative override cannot be anchored to the
/// current directory.
pub fn resolve_storage_root(override_path: Option<&str>) -> Result<StorageLocation> {
    if let Some(raw) = override_path.filter(|raw| !raw.trim().is_empty()) {
        return Ok(StorageLocation {
            path: absolutize(PathBuf::from(raw))?,
            source: "MORPH_HOME",
        });
    }

    if let Some(data) = dirs_next::data_dir() {
        return Ok(StorageLocation {
            path: data.join("morph").join("storage"),
            source: "data dir/morph",
        });
    }

    if let Some(home) = dirs_next::home_dir() {
        return Ok(StorageLocation {
            path: home.join(".morph").join("storage"),
            source: "HOME/.morph",
        });
    }

    Ok(StorageLocation {
        path: std::env::temp_dir().join("morph").join("storage"),
        source: "temp dir/morph",
    })
}

fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()
            .context("failed to resolve MORPH_HOME")?
            .join(path))
    }
}
