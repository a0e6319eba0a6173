//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::Deserialize;

use crate::http::{RequestKey, Response};

/// Trait for namespaced cache storage backends.
///
/// A namespace is a named, versioned store mapping request identity to a
/// response snapshot. Implementations serialize their own operations; callers
/// get no transactional guarantees across separate calls.
pub trait CacheStore: Send + Sync {
  /// Create the namespace if it does not exist yet.
  fn open(&self, namespace: &str) -> Result<()>;

  /// All namespace names, oldest first.
  fn keys(&self) -> Result<Vec<String>>;

  /// Whether the namespace exists.
  fn has(&self, namespace: &str) -> Result<bool>;

  /// Remove a namespace with all of its entries. Returns false if it did not exist.
  fn delete(&self, namespace: &str) -> Result<bool>;

  /// Look up a request in one namespace.
  fn lookup(&self, namespace: &str, key: &RequestKey) -> Result<Option<CachedResponse>>;

  /// Look up a request across every namespace, most recently created first.
  fn lookup_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>>;

  /// Insert or replace a single entry, creating the namespace if needed.
  fn put(&self, namespace: &str, key: &RequestKey, response: &Response) -> Result<()>;

  /// Insert every entry or none of them.
  fn put_all(&self, namespace: &str, entries: &[(RequestKey, Response)]) -> Result<()>;

  /// Keys stored in a namespace.
  fn entries(&self, namespace: &str) -> Result<Vec<RequestKey>>;
}

/// A response served from the cache.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  /// Namespace the entry was found in
  pub namespace: String,
  pub response: Response,
  /// When the entry was written
  pub cached_at: DateTime<Utc>,
}

/// Which namespaces a request lookup consults.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LookupScope {
  /// Only the current version's namespace
  #[default]
  Current,
  /// Every namespace, newest first. Can serve entries from a namespace that
  /// activation is about to delete.
  All,
}
