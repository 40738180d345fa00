//! Key-value persistence for the stores.
//!
//! A [`KeyValueStore`] is a synchronous string-keyed backend (the on-disk
//! stand-in for browser local storage). [`Persistence`] layers typed JSON
//! access on top: reads return `Result` so each store picks its own
//! default-on-error policy, writes are best-effort and only logged.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
  #[error("storage backend error: {0}")]
  Backend(#[from] std::io::Error),
  #[error("invalid storage key {0:?}")]
  InvalidKey(String),
  #[error("corrupt value at {key:?}: {source}")]
  Parse {
    key: String,
    #[source]
    source: serde_json::Error,
  },
  #[error("failed to serialize value for {key:?}: {source}")]
  Serialize {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Raw string storage. Each key holds one independent value; there are no
/// cross-key transactions.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
  fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
  fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// --- In-memory backend ---

/// Volatile backend, used for tests and `--ephemeral` sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  values: StdMutex<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
    // A poisoned map is still a valid map; keep serving it.
    self.values.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl KeyValueStore for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    Ok(self.values().get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    self.values().insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    self.values().remove(key);
    Ok(())
  }
}

// --- File backend ---

/// One `<key>.json` file per key under `root`.
#[derive(Debug, Clone)]
pub struct FileStorage {
  root: PathBuf,
}

impl FileStorage {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
    let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
      return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(self.root.join(format!("{}.json", key)))
  }
}

impl KeyValueStore for FileStorage {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let path = self.path_for(key)?;
    match std::fs::read_to_string(&path) {
      Ok(content) => Ok(Some(content)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let path = self.path_for(key)?;
    std::fs::create_dir_all(&self.root)?;
    // Write to a temp file, then rename (atomic)
    let tmp_path = path.with_extension("json.part");
    std::fs::write(&tmp_path, value)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let path = self.path_for(key)?;
    match std::fs::remove_file(&path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}

// --- Typed adapter ---

/// Typed JSON access over a shared backend.
#[derive(Clone)]
pub struct Persistence {
  backend: Arc<dyn KeyValueStore>,
}

impl Persistence {
  pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
    Self { backend }
  }

  /// Convenience for tests and ephemeral sessions.
  pub fn in_memory() -> Self {
    Self::new(Arc::new(MemoryStorage::new()))
  }

  pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
    &self.backend
  }

  /// Read and parse the value at `key`. `Ok(None)` means the key is absent.
  pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
    let Some(raw) = self.backend.get(key)? else { return Ok(None) };
    serde_json::from_str(&raw).map(Some).map_err(|source| StorageError::Parse { key: key.to_string(), source })
  }

  /// Read `key`, falling back to `default` when it is absent or unreadable.
  pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
    self.load_or_else(key, || default)
  }

  pub fn load_or_else<T: DeserializeOwned>(&self, key: &str, default: impl FnOnce() -> T) -> T {
    match self.read(key) {
      Ok(Some(value)) => value,
      Ok(None) => {
        debug!(key, "storage: key absent, using default");
        default()
      }
      Err(e) => {
        warn!(key, err = %e, "storage: unreadable value, using default");
        default()
      }
    }
  }

  /// Serialize `value` to `key`. Fallible counterpart of [`Persistence::save`].
  pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
    let json = serde_json::to_string(value).map_err(|source| StorageError::Serialize { key: key.to_string(), source })?;
    self.backend.set(key, &json)
  }

  /// Best-effort write: failures are logged, never surfaced.
  pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
    if let Err(e) = self.write(key, value) {
      warn!(key, err = %e, "storage: failed to persist value");
    }
  }

  pub fn remove(&self, key: &str) {
    if let Err(e) = self.backend.remove(key) {
      warn!(key, err = %e, "storage: failed to remove value");
    }
  }
}

impl std::fmt::Debug for Persistence {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Persistence").finish_non_exhaustive()
  }
}
