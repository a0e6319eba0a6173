//! Cache-first request interception.

use color_eyre::Result;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Agent;
use crate::cache::{CacheStore, CachedResponse, LookupScope};
use crate::http::{Request, RequestKey, Response};
use crate::net::Fetcher;

/// How an intercepted request was answered.
pub enum Interception<S: CacheStore> {
  /// Served from the cache without touching the network
  Cached(CachedResponse),
  /// Answered by the network. `cache_write` is set when the response should
  /// be stored; nothing is written until the caller commits or detaches it.
  Network {
    response: Response,
    cache_write: Option<CacheWrite<S>>,
  },
  /// The network produced no response and nothing was cached
  Failed { error: String },
}

#[cfg(test)]
impl<S: CacheStore> Interception<S> {
  /// The response handed back to the page, if any.
  pub fn response(&self) -> Option<&Response> {
    match self {
      Self::Cached(cached) => Some(&cached.response),
      Self::Network { response, .. } => Some(response),
      Self::Failed { .. } => None,
    }
  }

  pub fn is_cached(&self) -> bool {
    matches!(self, Self::Cached(_))
  }
}

impl<S: CacheStore> std::fmt::Debug for Interception<S> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Cached(cached) => f.debug_tuple("Cached").field(cached).finish(),
      Self::Network {
        response,
        cache_write,
      } => f
        .debug_struct("Network")
        .field("status", &response.status)
        .field("cache_write", &cache_write.as_ref().map(CacheWrite::key))
        .finish(),
      Self::Failed { error } => f.debug_struct("Failed").field("error", error).finish(),
    }
  }
}

/// A pending copy of a network response into the current namespace.
pub struct CacheWrite<S: CacheStore> {
  store: Arc<S>,
  namespace: String,
  key: RequestKey,
  response: Response,
}

impl<S: CacheStore> CacheWrite<S> {
  pub fn key(&self) -> &RequestKey {
    &self.key
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  /// Store the response now.
  pub fn commit(self) -> Result<()> {
    self.store.put(&self.namespace, &self.key, &self.response)?;
    debug!(namespace = %self.namespace, key = %self.key, "Cached network response");
    Ok(())
  }
}

impl<S: CacheStore + 'static> CacheWrite<S> {
  /// Store the response on the blocking pool. The handle yields the write's result.
  pub fn detach(self) -> JoinHandle<Result<()>> {
    tokio::task::spawn_blocking(move || self.commit())
  }
}

impl<S: CacheStore, F: Fetcher> Agent<S, F> {
  /// Answer a request from the cache, falling back to the network.
  ///
  /// Only GET requests are looked up. A cached entry is returned as is, with
  /// no staleness check. A network failure resolves to
  /// [`Interception::Failed`]; it is logged, never returned as an error.
  pub async fn handle_fetch(&self, request: &Request) -> Interception<S> {
    if request.is_get() {
      match self.lookup(&request.key()) {
        Ok(Some(cached)) => {
          debug!(namespace = %cached.namespace, url = %request.url, "Serving from cache");
          return Interception::Cached(cached);
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, url = %request.url, "Cache lookup failed"),
      }
    }

    let response = match self.fetcher.fetch(request).await {
      Ok(response) => response,
      Err(e) => {
        warn!(error = %e, url = %request.url, "Fetch failed, no offline content available");
        return Interception::Failed {
          error: e.to_string(),
        };
      }
    };

    if response.status != StatusCode::OK.as_u16() || !request.is_get() {
      return Interception::Network {
        response,
        cache_write: None,
      };
    }

    let cache_write = CacheWrite {
      store: Arc::clone(&self.store),
      namespace: self.settings.version.clone(),
      key: request.key(),
      response: response.clone(),
    };

    Interception::Network {
      response,
      cache_write: Some(cache_write),
    }
  }

  fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>> {
    match self.settings.lookup_scope {
      LookupScope::Current => self.store.lookup(&self.settings.version, key),
      LookupScope::All => self.store.lookup_any(key),
    }
  }
}
