//! The request-interception agent.
//!
//! `Agent` is constructed with a cache store and a fetcher and exposes one
//! method per lifecycle event:
//! - install: warm the current namespace with the static assets
//! - activate: delete every namespace but the current one
//! - fetch: cache-first interception with network fallback
//! - sync / push / notification click: see [`hooks`]

mod hooks;
mod intercept;

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::cache::{CacheStore, LookupScope};
use crate::config::{Config, NotificationConfig};
use crate::http::Request;
use crate::net::Fetcher;

pub use hooks::{Capability, FORM_SYNC_TAG};
pub use intercept::Interception;

/// What the agent asks of the hosting runtime after a lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
  /// Activate immediately instead of waiting for old clients to go away
  SkipWaiting,
  /// Take control of already open clients without a reload
  ClaimClients,
}

/// Outcome of the install step. Install failures never abort the lifecycle.
#[derive(Debug, Clone)]
pub struct InstallReport {
  pub namespace: String,
  /// Number of static assets stored
  pub cached: usize,
  /// Why warming the cache failed, if it did
  pub failure: Option<String>,
  pub signal: LifecycleSignal,
}

impl InstallReport {
  pub fn is_complete(&self) -> bool {
    self.failure.is_none()
  }
}

/// Outcome of the activate step.
#[derive(Debug, Clone)]
pub struct ActivateReport {
  /// Namespaces removed because they are not the current version
  pub deleted: Vec<String>,
  pub signal: LifecycleSignal,
}

/// Everything the agent needs to know besides its collaborators.
#[derive(Debug, Clone)]
pub struct AgentSettings {
  /// Current cache namespace
  pub version: String,
  pub static_assets: Vec<Url>,
  pub lookup_scope: LookupScope,
  pub notifications: NotificationConfig,
}

impl AgentSettings {
  pub fn from_config(config: &Config) -> Result<Self> {
    if config.cache.version.trim().is_empty() {
      return Err(eyre!("Cache version must not be empty"));
    }

    Ok(Self {
      version: config.cache.version.clone(),
      static_assets: config.static_asset_urls()?,
      lookup_scope: config.cache.lookup_scope,
      notifications: config.notifications.clone(),
    })
  }
}

/// Dispatcher for lifecycle and network events.
pub struct Agent<S: CacheStore, F: Fetcher> {
  store: Arc<S>,
  fetcher: Arc<F>,
  settings: AgentSettings,
}

impl<S: CacheStore, F: Fetcher> Agent<S, F> {
  pub fn new(store: Arc<S>, fetcher: Arc<F>, settings: AgentSettings) -> Self {
    Self {
      store,
      fetcher,
      settings,
    }
  }

  pub fn settings(&self) -> &AgentSettings {
    &self.settings
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Open the current namespace and store every static asset in it.
  ///
  /// The batch is all-or-nothing: one failed fetch or non-2xx response and
  /// nothing is stored. The failure is logged and reported, not returned.
  pub async fn install(&self) -> InstallReport {
    info!(namespace = %self.settings.version, "Installing");

    let (cached, failure) = match self.warm_cache().await {
      Ok(count) => {
        info!(count, "Cached static assets");
        (count, None)
      }
      Err(e) => {
        warn!(error = %e, "Cache failed");
        (0, Some(e.to_string()))
      }
    };

    InstallReport {
      namespace: self.settings.version.clone(),
      cached,
      failure,
      signal: LifecycleSignal::SkipWaiting,
    }
  }

  async fn warm_cache(&self) -> Result<usize> {
    let namespace = &self.settings.version;
    self.store.open(namespace)?;

    let requests: Vec<Request> = self
      .settings
      .static_assets
      .iter()
      .cloned()
      .map(Request::get)
      .collect();

    let fetches = requests.iter().map(|request| async move {
      let response = self.fetcher.fetch(request).await?;
      if !response.is_ok() {
        return Err(eyre!(
          "Request for {} failed with status {}",
          request.url,
          response.status
        ));
      }
      Ok::<_, color_eyre::Report>((request.key(), response))
    });
    let entries = try_join_all(fetches).await?;

    self.store.put_all(namespace, &entries)?;
    Ok(entries.len())
  }

  /// Delete every namespace that is not the current version.
  pub fn activate(&self) -> Result<ActivateReport> {
    info!(namespace = %self.settings.version, "Activating");

    let mut deleted = Vec::new();
    for name in self.store.keys()? {
      if name == self.settings.version {
        continue;
      }
      info!(namespace = %name, "Deleting old cache");
      if self.store.delete(&name)? {
        deleted.push(name);
      }
    }

    Ok(ActivateReport {
      deleted,
      signal: LifecycleSignal::ClaimClients,
    })
  }
}
