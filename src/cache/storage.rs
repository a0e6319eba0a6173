//! SQLite implementation of the namespaced cache store.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::traits::{CacheStore, CachedResponse};
use crate::http::{RequestKey, Response};

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the store at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open (or create) the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// A throwaway store that lives only as long as this value.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("offcache").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Namespaces in creation order (id is monotonic)
CREATE TABLE IF NOT EXISTS cache_namespaces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Response snapshots keyed by namespace + request identity
CREATE TABLE IF NOT EXISTS cache_entries (
    namespace TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (namespace, method, url)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_request
    ON cache_entries(method, url);
"#;

fn ensure_namespace(conn: &Connection, namespace: &str) -> Result<()> {
  conn
    .execute(
      "INSERT OR IGNORE INTO cache_namespaces (name) VALUES (?)",
      params![namespace],
    )
    .map_err(|e| eyre!("Failed to create cache namespace {}: {}", namespace, e))?;
  Ok(())
}

fn insert_entry(
  conn: &Connection,
  namespace: &str,
  key: &RequestKey,
  response: &Response,
) -> Result<()> {
  let headers = serde_json::to_string(&response.headers)
    .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

  conn
    .execute(
      "INSERT OR REPLACE INTO cache_entries (namespace, method, url, status, headers, body, cached_at)
       VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
      params![
        namespace,
        key.method,
        key.url,
        response.status,
        headers,
        response.body
      ],
    )
    .map_err(|e| eyre!("Failed to store {}: {}", key, e))?;
  Ok(())
}

/// Raw columns of an entry row, decoded outside the rusqlite closure.
struct EntryRow {
  namespace: String,
  status: u16,
  headers: String,
  body: Vec<u8>,
  cached_at: String,
}

impl EntryRow {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      namespace: row.get(0)?,
      status: row.get(1)?,
      headers: row.get(2)?,
      body: row.get(3)?,
      cached_at: row.get(4)?,
    })
  }

  fn decode(self) -> Result<CachedResponse> {
    let headers = serde_json::from_str(&self.headers)
      .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;
    Ok(CachedResponse {
      namespace: self.namespace,
      response: Response {
        status: self.status,
        headers,
        body: self.body,
      },
      cached_at: parse_datetime(&self.cached_at)?,
    })
  }
}

impl CacheStore for SqliteStorage {
  fn open(&self, namespace: &str) -> Result<()> {
    let conn = self.lock()?;
    ensure_namespace(&conn, namespace)
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare("SELECT name FROM cache_namespaces ORDER BY id")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list cache namespaces: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cache namespace: {}", e))?;

    Ok(names)
  }

  fn has(&self, namespace: &str) -> Result<bool> {
    let conn = self.lock()?;
    let found: Option<i64> = conn
      .query_row(
        "SELECT id FROM cache_namespaces WHERE name = ?",
        params![namespace],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query cache namespace {}: {}", namespace, e))?;
    Ok(found.is_some())
  }

  fn delete(&self, namespace: &str) -> Result<bool> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "DELETE FROM cache_entries WHERE namespace = ?",
      params![namespace],
    )
    .map_err(|e| eyre!("Failed to delete entries of {}: {}", namespace, e))?;

    let removed = tx
      .execute(
        "DELETE FROM cache_namespaces WHERE name = ?",
        params![namespace],
      )
      .map_err(|e| eyre!("Failed to delete cache namespace {}: {}", namespace, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  fn lookup(&self, namespace: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
    let conn = self.lock()?;
    let row = conn
      .query_row(
        "SELECT namespace, status, headers, body, cached_at FROM cache_entries
         WHERE namespace = ? AND method = ? AND url = ?",
        params![namespace, key.method, key.url],
        EntryRow::from_row,
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up {}: {}", key, e))?;

    row.map(EntryRow::decode).transpose()
  }

  fn lookup_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>> {
    let conn = self.lock()?;
    let row = conn
      .query_row(
        "SELECT e.namespace, e.status, e.headers, e.body, e.cached_at FROM cache_entries e
         INNER JOIN cache_namespaces n ON n.name = e.namespace
         WHERE e.method = ? AND e.url = ?
         ORDER BY n.id DESC
         LIMIT 1",
        params![key.method, key.url],
        EntryRow::from_row,
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up {}: {}", key, e))?;

    row.map(EntryRow::decode).transpose()
  }

  fn put(&self, namespace: &str, key: &RequestKey, response: &Response) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    ensure_namespace(&tx, namespace)?;
    insert_entry(&tx, namespace, key, response)?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))
  }

  fn put_all(&self, namespace: &str, entries: &[(RequestKey, Response)]) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    ensure_namespace(&tx, namespace)?;
    for (key, response) in entries {
      // Dropping the transaction on error rolls back the whole batch
      insert_entry(&tx, namespace, key, response)?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))
  }

  fn entries(&self, namespace: &str) -> Result<Vec<RequestKey>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare("SELECT method, url FROM cache_entries WHERE namespace = ? ORDER BY url, method")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let keys = stmt
      .query_map(params![namespace], |row| {
        Ok(RequestKey {
          method: row.get(0)?,
          url: row.get(1)?,
        })
      })
      .map_err(|e| eyre!("Failed to list entries of {}: {}", namespace, e))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read entry of {}: {}", namespace, e))?;

    Ok(keys)
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
