use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

const ITEM_EXTENSION: &str = "item";
const DIGEST_EXTENSION: &str = "digest";
/// Longest hex stem kept as a file name; `<stem>.item` stays under NAME_MAX.
const MAX_HEX_STEM: usize = 240;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove {}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to list {}", path.display())]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Synchronous string key/value storage, atomic per key.
///
/// Mirrors the browser's per-origin local storage: other keys may live next
/// to workspace records and must be left alone.
pub trait StorageMedium: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Insertion-ordered in-memory medium.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<IndexMap<String, String>>,
}

impl MemoryStorage {
    fn with_items<T>(&self, f: impl FnOnce(&mut IndexMap<String, String>) -> T) -> T {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut items)
    }
}

impl StorageMedium for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.with_items(|items| items.get(key).cloned()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_items(|items| {
            items.insert(key.to_string(), value.to_string());
        });
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.with_items(|items| {
            items.shift_remove(key);
        });
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.with_items(|items| items.keys().cloned().collect()))
    }
}

/// One file per key under `root`; the key is hex-encoded into the file name
/// so any string is a valid key. Keys are listed in sorted order.
///
/// Keys too long for a file name go to `<sha256>.digest`, whose first line
/// is the hex-encoded key and the rest the value.
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_path(&self, key: &str) -> ItemPath {
        let encoded = hex::encode(key.as_bytes());
        if encoded.len() <= MAX_HEX_STEM {
            return ItemPath::Plain(self.root.join(format!("{encoded}.{ITEM_EXTENSION}")));
        }
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        ItemPath::Digest {
            path: self.root.join(format!("{digest}.{DIGEST_EXTENSION}")),
            header: encoded,
        }
    }

    fn key_from_path(path: &Path) -> Option<String> {
        let stem = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ITEM_EXTENSION) => path.file_stem()?.to_str()?.to_string(),
            Some(DIGEST_EXTENSION) => {
                let contents = fs::read_to_string(path).ok()?;
                contents.split_once('\n')?.0.to_string()
            }
            _ => return None,
        };
        let bytes = hex::decode(stem).ok()?;
        String::from_utf8(bytes).ok()
    }
}

enum ItemPath {
    Plain(PathBuf),
    Digest { path: PathBuf, header: String },
}

impl ItemPath {
    fn path(&self) -> &Path {
        match self {
            ItemPath::Plain(path) | ItemPath::Digest { path, .. } => path,
        }
    }

    fn encode(&self, value: &str) -> String {
        match self {
            ItemPath::Plain(_) => value.to_string(),
            ItemPath::Digest { header, .. } => format!("{header}\n{value}"),
        }
    }

    /// `None` when a digest file belongs to a different key.
    fn decode(&self, contents: String) -> Option<String> {
        match self {
            ItemPath::Plain(_) => Some(contents),
            ItemPath::Digest { header, .. } => match contents.split_once('\n') {
                Some((stored, value)) if stored == header => Some(value.to_string()),
                _ => None,
            },
        }
    }
}

impl StorageMedium for DirStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let item = self.item_path(key);
        match fs::read_to_string(item.path()) {
            Ok(contents) => Ok(item.decode(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                path: item.path().to_path_buf(),
                source,
            }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let item = self.item_path(key);
        let path = item.path();
        let write_err = |source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(write_err)?;
        let mut staged = tempfile::Builder::new()
            .prefix(".staged-")
            .tempfile_in(&self.root)
            .map_err(write_err)?;
        staged
            .write_all(item.encode(value).as_bytes())
            .map_err(write_err)?;
        staged.as_file().sync_all().map_err(write_err)?;
        staged.persist(path).map_err(|err| write_err(err.error))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let item = self.item_path(key);
        match fs::remove_file(item.path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Remove {
                path: item.path().to_path_buf(),
                source,
            }),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::List {
                    path: self.root.clone(),
                    source,
                })
            }
        };
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::List {
                path: self.root.clone(),
                source,
            })?;
            if let Some(key) = Self::key_from_path(&entry.path()) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
