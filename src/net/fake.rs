//! Scripted fetcher for tests.

use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::Fetcher;
use crate::http::{Request, Response};

/// Answers from a fixed route table and counts every call.
/// Unknown URLs fail like an unreachable network.
#[derive(Default)]
pub struct FakeFetcher {
  routes: Mutex<HashMap<String, Response>>,
  calls: AtomicUsize,
}

impl FakeFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn route(self, url: &str, response: Response) -> Self {
    self.set_route(url, response);
    self
  }

  pub fn set_route(&self, url: &str, response: Response) {
    self
      .routes
      .lock()
      .unwrap()
      .insert(url.to_string(), response);
  }

  /// Number of requests that reached the "network".
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Fetcher for FakeFetcher {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self
      .routes
      .lock()
      .unwrap()
      .get(request.url.as_str())
      .cloned()
      .ok_or_else(|| eyre!("network unreachable: {}", request.url))
  }
}
