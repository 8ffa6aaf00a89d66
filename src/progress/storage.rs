//! Durable key-value storage backends for learning progress.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::db::{schema, Database};

/// String-keyed, string-valued durable storage.
pub trait KeyValueStorage: Send + Sync {
  /// Read the raw value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Replace the value stored under `key`.
  fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Box<T> {
  fn get(&self, key: &str) -> Result<Option<String>> {
    (**self).get(key)
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    (**self).set(key, value)
  }
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Arc<T> {
  fn get(&self, key: &str) -> Result<Option<String>> {
    (**self).get(key)
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    (**self).set(key, value)
  }
}

/// In-process storage that forgets everything on exit.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// SQLite-backed storage, one row per key.
pub struct SqliteKvStorage {
  conn: Mutex<Connection>,
}

impl SqliteKvStorage {
  pub fn open(path: &Path) -> Result<Self> {
    let conn = Database::open_at(path, schema::PROGRESS_SCHEMA)?.into_connection();
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }
}

impl KeyValueStorage for SqliteKvStorage {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read key {}: {}", key, e))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write key {}: {}", key, e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_memory_storage_round_trip() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.get("a").unwrap(), None);
    storage.set("a", "1").unwrap();
    storage.set("a", "2").unwrap();
    assert_eq!(storage.get("a").unwrap().as_deref(), Some("2"));
  }

  #[test]
  fn test_sqlite_storage_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.db");

    {
      let storage = SqliteKvStorage::open(&path).unwrap();
      storage.set("french-app-current-grade", "9").unwrap();
    }

    let storage = SqliteKvStorage::open(&path).unwrap();
    assert_eq!(
      storage.get("french-app-current-grade").unwrap().as_deref(),
      Some("9")
    );
    assert_eq!(storage.get("french-app-current-filter").unwrap(), None);
  }
}
