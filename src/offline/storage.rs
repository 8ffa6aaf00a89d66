//! Bucket storage trait and its SQLite, in-memory and no-op implementations.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

use super::http::Response;
use crate::db::{schema, Database};

/// A response found in one of the buckets.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub response: Response,
  /// Bucket the response was found in
  pub bucket: String,
  /// When the response was stored
  pub cached_at: DateTime<Utc>,
}

/// Trait for named request/response buckets.
///
/// Writing into a bucket that does not exist yet creates it.
pub trait BucketStorage: Send + Sync {
  /// Names of every existing bucket.
  fn bucket_names(&self) -> Result<Vec<String>>;

  /// Look up a request URL across all buckets.
  fn match_any(&self, url: &str) -> Result<Option<CachedResponse>>;

  /// Store a single response, replacing any previous entry for the URL.
  fn put(&self, bucket: &str, url: &str, response: &Response) -> Result<()>;

  /// Store every entry or none of them.
  fn put_all(&self, bucket: &str, entries: &[(String, Response)]) -> Result<()>;

  /// Delete a bucket and its entries. Returns whether it existed.
  fn delete_bucket(&self, name: &str) -> Result<bool>;

  /// Version recorded by the last completed activation.
  fn active_version(&self) -> Result<Option<String>>;

  fn set_active_version(&self, version: &str) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - every lookup misses, every write is dropped.
pub struct NoopBuckets;

impl BucketStorage for NoopBuckets {
  fn bucket_names(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }

  fn match_any(&self, _url: &str) -> Result<Option<CachedResponse>> {
    Ok(None)
  }

  fn put(&self, _bucket: &str, _url: &str, _response: &Response) -> Result<()> {
    Ok(())
  }

  fn put_all(&self, _bucket: &str, _entries: &[(String, Response)]) -> Result<()> {
    Ok(())
  }

  fn delete_bucket(&self, _name: &str) -> Result<bool> {
    Ok(false)
  }

  fn active_version(&self) -> Result<Option<String>> {
    Ok(None)
  }

  fn set_active_version(&self, _version: &str) -> Result<()> {
    Ok(())
  }
}

type Bucket = HashMap<String, (Response, DateTime<Utc>)>;

/// Buckets held in process memory.
#[derive(Default)]
pub struct MemoryBuckets {
  buckets: Mutex<BTreeMap<String, Bucket>>,
  active_version: Mutex<Option<String>>,
}

impl MemoryBuckets {
  pub fn new() -> Self {
    Self::default()
  }
}

impl BucketStorage for MemoryBuckets {
  fn bucket_names(&self) -> Result<Vec<String>> {
    let buckets = self
      .buckets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(buckets.keys().cloned().collect())
  }

  fn match_any(&self, url: &str) -> Result<Option<CachedResponse>> {
    let buckets = self
      .buckets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(buckets.iter().find_map(|(name, bucket)| {
      bucket.get(url).map(|(response, cached_at)| CachedResponse {
        response: response.clone(),
        bucket: name.clone(),
        cached_at: *cached_at,
      })
    }))
  }

  fn put(&self, bucket: &str, url: &str, response: &Response) -> Result<()> {
    self.put_all(bucket, &[(url.to_string(), response.clone())])
  }

  fn put_all(&self, bucket: &str, entries: &[(String, Response)]) -> Result<()> {
    let mut buckets = self
      .buckets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let now = Utc::now();
    let target = buckets.entry(bucket.to_string()).or_default();
    for (url, response) in entries {
      target.insert(url.clone(), (response.clone(), now));
    }
    Ok(())
  }

  fn delete_bucket(&self, name: &str) -> Result<bool> {
    let mut buckets = self
      .buckets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(buckets.remove(name).is_some())
  }

  fn active_version(&self) -> Result<Option<String>> {
    let version = self
      .active_version
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(version.clone())
  }

  fn set_active_version(&self, version: &str) -> Result<()> {
    let mut active = self
      .active_version
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *active = Some(version.to_string());
    Ok(())
  }
}

/// SQLite-based bucket storage.
pub struct SqliteBuckets {
  conn: Mutex<Connection>,
}

impl SqliteBuckets {
  pub fn open(path: &Path) -> Result<Self> {
    let conn = Database::open_at(path, schema::CACHE_SCHEMA)?.into_connection();
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }
}

const ACTIVE_VERSION_KEY: &str = "active_version";

impl BucketStorage for SqliteBuckets {
  fn bucket_names(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM cache_buckets ORDER BY name")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list buckets: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read bucket name: {}", e))?;

    Ok(names)
  }

  fn match_any(&self, url: &str) -> Result<Option<CachedResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(String, u16, String, Vec<u8>, String)> = conn
      .query_row(
        "SELECT bucket, status, headers, body, cached_at FROM cache_entries
         WHERE request_hash = ?
         ORDER BY cached_at DESC
         LIMIT 1",
        params![request_hash(url)],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query cache entry: {}", e))?;

    match row {
      Some((bucket, status, headers, body, cached_at)) => {
        let headers = serde_json::from_str(&headers)
          .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;
        Ok(Some(CachedResponse {
          response: Response {
            status,
            headers,
            body,
          },
          bucket,
          cached_at: parse_datetime(&cached_at)?,
        }))
      }
      None => Ok(None),
    }
  }

  fn put(&self, bucket: &str, url: &str, response: &Response) -> Result<()> {
    self.put_all(bucket, &[(url.to_string(), response.clone())])
  }

  fn put_all(&self, bucket: &str, entries: &[(String, Response)]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "INSERT OR IGNORE INTO cache_buckets (name) VALUES (?)",
      params![bucket],
    )
    .map_err(|e| eyre!("Failed to create bucket {}: {}", bucket, e))?;

    for (url, response) in entries {
      let headers = serde_json::to_string(&response.headers)
        .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

      tx.execute(
        "INSERT OR REPLACE INTO cache_entries (bucket, request_hash, url, status, headers, body, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          bucket,
          request_hash(url),
          url,
          response.status,
          headers,
          response.body
        ],
      )
      .map_err(|e| eyre!("Failed to store {}: {}", url, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn delete_bucket(&self, name: &str) -> Result<bool> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute("DELETE FROM cache_entries WHERE bucket = ?", params![name])
      .map_err(|e| eyre!("Failed to delete entries of {}: {}", name, e))?;
    let removed = tx
      .execute("DELETE FROM cache_buckets WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete bucket {}: {}", name, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  fn active_version(&self) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM registration WHERE key = ?",
        params![ACTIVE_VERSION_KEY],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read active version: {}", e))
  }

  fn set_active_version(&self, version: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO registration (key, value) VALUES (?, ?)",
        params![ACTIVE_VERSION_KEY, version],
      )
      .map_err(|e| eyre!("Failed to record active version: {}", e))?;

    Ok(())
  }
}

/// SHA256 of the request URL, for stable fixed-length keys.
fn request_hash(url: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(url.as_bytes());
  hex::encode(hasher.finalize())
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
