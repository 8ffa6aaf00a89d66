pub mod schema;

use color_eyre::{eyre::eyre, Result};
use rusqlite::Connection;
use std::path::Path;

/// SQLite connection wrapper shared by the progress and cache backends
pub struct Database {
  conn: Connection,
}

impl Database {
  /// Open or create the database at `path` and apply `schema`
  pub fn open_at(path: &Path, schema: &str) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    let db = Self { conn };
    db.run_migrations(schema)?;

    Ok(db)
  }

  fn run_migrations(&self, schema: &str) -> Result<()> {
    self
      .conn
      .execute_batch(schema)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;
    Ok(())
  }

  pub fn into_connection(self) -> Connection {
    self.conn
  }
}
