use color_eyre::{eyre::eyre, Result};
use reqwest::header::HeaderMap;
use std::future::Future;
use tracing::debug;
use url::Url;

use crate::http::{Request, Response};

/// Issues requests against the network.
///
/// An `Err` means the request produced no response at all (offline, DNS,
/// connection reset). HTTP error statuses are successful fetches.
pub trait Fetcher: Send + Sync {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}

/// Fetcher backed by a reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("offcache/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

impl Fetcher for HttpFetcher {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    debug!(method = %request.method, url = %request.url, "network fetch");

    let mut builder = self
      .client
      .request(request.method.clone(), request.url.clone());
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &request.body {
      builder = builder.body(body.clone());
    }

    let response = builder
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;

    let status = response.status().as_u16();
    let headers = snapshot_headers(response.headers(), &request.url);
    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", request.url, e))?;

    Ok(Response {
      status,
      headers,
      body: body.to_vec(),
    })
  }
}

/// Copy headers into the snapshot. Values that are not valid UTF-8 cannot be
/// stored as text and are skipped.
fn snapshot_headers(headers: &HeaderMap, url: &Url) -> Vec<(String, String)> {
  let mut snapshot = Vec::with_capacity(headers.len());
  for (name, value) in headers {
    match value.to_str() {
      Ok(value) => snapshot.push((name.as_str().to_string(), value.to_string())),
      Err(_) => debug!(header = %name, url = %url, "Skipping non-UTF-8 response header"),
    }
  }
  snapshot
}
