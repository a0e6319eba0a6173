use clap::Subcommand;
use std::path::PathBuf;

/// Lifecycle and network events that can be dispatched to the agent.
#[derive(Subcommand, Debug)]
pub enum Command {
  /// Warm the current cache namespace with the static assets
  Install,
  /// Delete every cache namespace except the current one
  Activate,
  /// Install then activate, as a new version would on first load
  Update,
  /// Intercept a request: serve from cache or fetch from the network
  Fetch {
    /// Absolute URL or path relative to the origin
    url: String,
    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,
    /// Extra request header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
    /// Request body
    #[arg(short, long)]
    data: Option<String>,
    /// Write the cache entry in the background instead of before printing
    #[arg(long)]
    detach: bool,
    /// Write the response body to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// List cache namespaces and their entries
  Caches {
    /// Also list every cached request
    #[arg(short, long)]
    verbose: bool,
  },
  /// Fire a deferred-sync event
  Sync {
    /// Sync tag
    #[arg(default_value = crate::agent::FORM_SYNC_TAG)]
    tag: String,
  },
  /// Deliver a push message and print the resulting notification
  Push {
    /// JSON payload, e.g. '{"title":"Hello","body":"..."}'
    #[arg(short, long)]
    payload: Option<String>,
  },
  /// Simulate a click on a shown notification
  Click,
}
