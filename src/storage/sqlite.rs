//! SQLite-backed key/value store.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{KeyValueStore, StorageError, StorageKey};

/// Schema for the key/value table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite-based store, one row per storage key.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self, StorageError> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self, StorageError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| {
        StorageError::Setup(format!(
          "failed to create cache directory {}: {}",
          parent.display(),
          e
        ))
      })?;
    }

    let conn = Connection::open(path)?;
    conn.execute_batch(STORE_SCHEMA)?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf, StorageError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| StorageError::Setup("could not determine data directory".to_string()))?;

    Ok(data_dir.join("fieldsync").join("cache.db"))
  }

  fn conn(&self) -> MutexGuard<'_, Connection> {
    self.conn.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
    let conn = self.conn();
    let value = conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key.as_key()],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  fn put(&self, key: &StorageKey, value: &str) -> Result<(), StorageError> {
    let conn = self.conn();
    conn.execute(
      "INSERT OR REPLACE INTO kv_store (key, value, stored_at)
       VALUES (?, ?, datetime('now'))",
      params![key.as_key(), value],
    )?;
    Ok(())
  }

  fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
    let conn = self.conn();
    conn.execute("DELETE FROM kv_store WHERE key = ?", params![key.as_key()])?;
    Ok(())
  }

  fn remove_prefix(&self, prefix: &str) -> Result<(), StorageError> {
    let conn = self.conn();
    // substr instead of LIKE so '_' and '%' in a prefix stay literal
    conn.execute(
      "DELETE FROM kv_store WHERE substr(key, 1, ?) = ?",
      params![prefix.chars().count() as i64, prefix],
    )?;
    Ok(())
  }
}
