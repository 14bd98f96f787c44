//! Key/value persistence for the session, lookup tables and task lists.
//!
//! Everything is stored as JSON text under a typed [`StorageKey`]. Readers
//! treat a missing or unparsable value as "nothing stored"; a broken cache
//! must never stop the client from starting.

mod keys;
mod sqlite;

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

pub use keys::StorageKey;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  #[error("storage backend error: {0}")]
  Backend(#[from] rusqlite::Error),
  #[error("failed to prepare storage: {0}")]
  Setup(String),
}

/// Trait for persistence backends.
pub trait KeyValueStore: Send + Sync {
  /// Read the raw JSON text stored under `key`.
  fn get(&self, key: &StorageKey) -> Result<Option<String>, StorageError>;

  /// Replace whatever is stored under `key`.
  fn put(&self, key: &StorageKey, value: &str) -> Result<(), StorageError>;

  /// Remove a single key. Removing a missing key is not an error.
  fn remove(&self, key: &StorageKey) -> Result<(), StorageError>;

  /// Remove every key starting with `prefix` (see [`StorageKey::TASKS_PREFIX`]).
  fn remove_prefix(&self, prefix: &str) -> Result<(), StorageError>;
}

/// Load and deserialize a value, degrading every failure to `None`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &StorageKey) -> Option<T> {
  let raw = match store.get(key) {
    Ok(Some(raw)) => raw,
    Ok(None) => return None,
    Err(e) => {
      warn!(key = %key, error = %e, "failed to read persisted value");
      return None;
    }
  };

  match serde_json::from_str(&raw) {
    Ok(value) => Some(value),
    Err(e) => {
      warn!(key = %key, error = %e, "discarding unparsable persisted value");
      None
    }
  }
}

/// Serialize and store a value. Failures are logged, never propagated.
pub fn save_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &StorageKey, value: &T) {
  let raw = match serde_json::to_string(value) {
    Ok(raw) => raw,
    Err(e) => {
      warn!(key = %key, error = %e, "failed to serialize value for storage");
      return;
    }
  };

  if let Err(e) = store.put(key, &raw) {
    warn!(key = %key, error = %e, "failed to persist value");
  }
}

/// Remove a key, logging failures.
pub fn erase(store: &dyn KeyValueStore, key: &StorageKey) {
  if let Err(e) = store.remove(key) {
    warn!(key = %key, error = %e, "failed to erase persisted value");
  }
}

/// In-memory store. Used with `--no-cache` and in tests; nothing survives
/// the process.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
    Ok(self.entries().get(&key.as_key()).cloned())
  }

  fn put(&self, key: &StorageKey, value: &str) -> Result<(), StorageError> {
    self.entries().insert(key.as_key(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
    self.entries().remove(&key.as_key());
    Ok(())
  }

  fn remove_prefix(&self, prefix: &str) -> Result<(), StorageError> {
    self.entries().retain(|k, _| !k.starts_with(prefix));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lookup::LookupKind;
  use crate::tasks::Scope;

  #[test]
  fn test_load_json_missing_key_is_none() {
    let store = MemoryStore::new();
    let value: Option<Vec<u32>> = load_json(&store, &StorageKey::Session);
    assert!(value.is_none());
  }

  #[test]
  fn test_load_json_garbage_is_none() {
    let store = MemoryStore::new();
    store
      .put(&StorageKey::Lookup(LookupKind::Installer), "{not json")
      .unwrap();
    let value: Option<HashMap<u64, String>> =
      load_json(&store, &StorageKey::Lookup(LookupKind::Installer));
    assert!(value.is_none());
  }

  #[test]
  fn test_save_then_load() {
    let store = MemoryStore::new();
    save_json(&store, &StorageKey::Tasks(Scope::new(7)), &vec![1, 2, 3]);
    let value: Option<Vec<u32>> = load_json(&store, &StorageKey::Tasks(Scope::new(7)));
    assert_eq!(value, Some(vec![1, 2, 3]));
  }

  #[test]
  fn test_remove_prefix_only_touches_task_scopes() {
    let store = MemoryStore::new();
    save_json(&store, &StorageKey::Tasks(Scope::new(0)), &1);
    save_json(&store, &StorageKey::Tasks(Scope::new(30)), &2);
    save_json(&store, &StorageKey::Lookup(LookupKind::Address), &3);

    store.remove_prefix(StorageKey::TASKS_PREFIX).unwrap();

    assert!(store.get(&StorageKey::Tasks(Scope::new(0))).unwrap().is_none());
    assert!(store.get(&StorageKey::Tasks(Scope::new(30))).unwrap().is_none());
    assert!(store
      .get(&StorageKey::Lookup(LookupKind::Address))
      .unwrap()
      .is_some());
  }
}
