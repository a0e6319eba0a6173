use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use std::io::Write;
use std::sync::Arc;
use tracing::warn;

use crate::agent::{Agent, AgentSettings, Capability, Interception};
use crate::cache::{CacheStore, SqliteStorage};
use crate::commands::Command;
use crate::config::Config;
use crate::http::Request;
use crate::net::HttpFetcher;
use url::Url;

/// Main application state
pub struct App {
  config: Config,
  agent: Agent<SqliteStorage, HttpFetcher>,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let storage = match &config.cache.database {
      Some(path) => SqliteStorage::open_at(path)?,
      None => SqliteStorage::open()?,
    };
    let fetcher = HttpFetcher::new()?;
    let settings = AgentSettings::from_config(&config)?;
    let agent = Agent::new(Arc::new(storage), Arc::new(fetcher), settings);

    Ok(Self { config, agent })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Install => self.install().await,
      Command::Activate => self.activate(),
      Command::Update => {
        self.install().await?;
        self.activate()
      }
      Command::Fetch {
        url,
        method,
        headers,
        data,
        detach,
        output,
      } => {
        let request = build_request(self.config.resolve(&url)?, &method, &headers, data)?;
        self.fetch(request, detach, output.as_deref()).await
      }
      Command::Caches { verbose } => self.list_caches(verbose),
      Command::Sync { tag } => {
        match self.agent.handle_sync(&tag) {
          None => println!("no handler for sync tag '{}'", tag),
          Some(Capability::Implemented(replayed)) => println!("replayed {} submissions", replayed),
          Some(Capability::NotImplemented { feature }) => {
            println!("sync '{}': {} is not implemented", tag, feature)
          }
        }
        Ok(())
      }
      Command::Push { payload } => {
        let outcome = self
          .agent
          .handle_push(payload.as_deref().map(str::as_bytes))?;
        match outcome {
          Capability::Implemented(Some(notification)) => {
            println!("{}", serde_json::to_string_pretty(&notification)?)
          }
          Capability::Implemented(None) => println!("empty push, nothing to show"),
          Capability::NotImplemented { feature } => println!("{} is not implemented", feature),
        }
        Ok(())
      }
      Command::Click => {
        let actions = self.agent.handle_notification_click();
        println!("{}", serde_json::to_string_pretty(&actions)?);
        Ok(())
      }
    }
  }

  async fn install(&self) -> Result<()> {
    let report = self.agent.install().await;
    if report.is_complete() {
      println!(
        "installed {}: {} assets cached ({:?})",
        report.namespace, report.cached, report.signal
      );
    } else {
      println!(
        "installed {} without cached assets: {} ({:?})",
        report.namespace,
        report.failure.as_deref().unwrap_or("unknown failure"),
        report.signal
      );
    }
    Ok(())
  }

  fn activate(&self) -> Result<()> {
    let report = self.agent.activate()?;
    if report.deleted.is_empty() {
      println!("activated, no old caches ({:?})", report.signal);
    } else {
      println!(
        "activated, deleted {} ({:?})",
        report.deleted.join(", "),
        report.signal
      );
    }
    Ok(())
  }

  async fn fetch(
    &self,
    request: Request,
    detach: bool,
    output: Option<&std::path::Path>,
  ) -> Result<()> {
    let outcome = self.agent.handle_fetch(&request).await;

    let (response, pending) = match outcome {
      Interception::Cached(cached) => {
        eprintln!(
          "{} {} (cache: {}, stored {})",
          cached.response.status,
          request.url,
          cached.namespace,
          cached.cached_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        (cached.response, None)
      }
      Interception::Network {
        response,
        cache_write,
      } => {
        eprintln!(
          "{} {} (network, {})",
          response.status,
          request.url,
          response.header("content-type").unwrap_or("no content type")
        );
        let pending = match cache_write {
          Some(write) if detach => Some(write.detach()),
          Some(write) => {
            eprintln!("cached into {}", write.namespace());
            write.commit()?;
            None
          }
          None => None,
        };
        (response, pending)
      }
      Interception::Failed { error } => {
        return Err(eyre!("No response for {}: {}", request.url, error));
      }
    };

    match output {
      Some(path) => std::fs::write(path, &response.body)
        .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?,
      None => std::io::stdout().write_all(&response.body)?,
    }

    // Keep the process alive until the background write settles
    if let Some(handle) = pending {
      if let Err(e) = handle.await? {
        warn!(error = %e, url = %request.url, "Background cache write failed");
      }
    }

    Ok(())
  }

  fn list_caches(&self, verbose: bool) -> Result<()> {
    let store = self.agent.store();
    let current = &self.agent.settings().version;

    if !store.has(current)? {
      println!("current cache {} is not installed", current);
    }
    for name in store.keys()? {
      let entries = store.entries(&name)?;
      let marker = if &name == current { "*" } else { " " };
      println!("{} {} ({} entries)", marker, name, entries.len());
      if verbose {
        for key in entries {
          println!("    {}", key);
        }
      }
    }
    Ok(())
  }
}

/// Build a request from the `fetch` subcommand's arguments.
fn build_request(
  url: Url,
  method: &str,
  headers: &[String],
  data: Option<String>,
) -> Result<Request> {
  let method = Method::from_bytes(method.to_uppercase().as_bytes())
    .map_err(|e| eyre!("Invalid method '{}': {}", method, e))?;

  let mut request = Request::new(method, url, data.map(String::into_bytes));
  for header in headers {
    let (name, value) = parse_header(header)?;
    request = request.with_header(name, value);
  }
  Ok(request)
}

/// Split a curl-style `Name: value` header.
fn parse_header(header: &str) -> Result<(&str, &str)> {
  let (name, value) = header
    .split_once(':')
    .ok_or_else(|| eyre!("Invalid header '{}', expected 'Name: value'", header))?;

  let name = name.trim();
  if name.is_empty() {
    return Err(eyre!("Invalid header '{}', missing name", header));
  }
  Ok((name, value.trim()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url() -> Url {
    Url::parse("http://localhost:8000/api/complaints").unwrap()
  }

  #[test]
  fn test_parse_header_trims_name_and_value() {
    assert_eq!(
      parse_header("  Content-Type :  application/json ").unwrap(),
      ("Content-Type", "application/json")
    );
  }

  #[test]
  fn test_parse_header_keeps_colons_in_value() {
    assert_eq!(
      parse_header("Referer: http://localhost:8000/").unwrap(),
      ("Referer", "http://localhost:8000/")
    );
    assert_eq!(parse_header("X-Empty:").unwrap(), ("X-Empty", ""));
  }

  #[test]
  fn test_parse_header_rejects_missing_colon() {
    let err = parse_header("Accept text/html").unwrap_err();
    assert_eq!(
      err.to_string(),
      "Invalid header 'Accept text/html', expected 'Name: value'"
    );
  }

  #[test]
  fn test_parse_header_rejects_empty_name() {
    assert!(parse_header(": value").is_err());
  }

  #[test]
  fn test_build_request_from_arguments() {
    let headers = vec![
      "Content-Type: application/x-www-form-urlencoded".to_string(),
      "X-Requested-With: offcache".to_string(),
    ];

    let request = build_request(url(), "post", &headers, Some("room=12".to_string())).unwrap();

    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url, url());
    assert_eq!(request.body.as_deref(), Some(&b"room=12"[..]));
    assert_eq!(
      request.headers,
      vec![
        (
          "Content-Type".to_string(),
          "application/x-www-form-urlencoded".to_string()
        ),
        ("X-Requested-With".to_string(), "offcache".to_string()),
      ]
    );
  }

  #[test]
  fn test_build_request_defaults_to_bodiless_get() {
    let request = build_request(url(), "GET", &[], None).unwrap();

    assert!(request.is_get());
    assert!(request.headers.is_empty());
    assert!(request.body.is_none());
  }

  #[test]
  fn test_build_request_rejects_bad_header() {
    let headers = vec!["nonsense".to_string()];
    assert!(build_request(url(), "GET", &headers, None).is_err());
  }

  #[test]
  fn test_build_request_rejects_bad_method() {
    let err = build_request(url(), "GE T", &[], None).unwrap_err();
    assert!(err.to_string().starts_with("Invalid method 'GE T'"));
  }
}
