//! SQL schemas for the two local databases.

/// Durable key-value store backing learning progress.
pub const PROGRESS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Versioned request/response buckets for the offline cache.
pub const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_buckets (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS cache_entries (
    bucket TEXT NOT NULL,
    request_hash TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (bucket, request_hash),
    FOREIGN KEY (bucket) REFERENCES cache_buckets(name) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_hash ON cache_entries(request_hash);

-- Which cache version finished activation last
CREATE TABLE IF NOT EXISTS registration (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
