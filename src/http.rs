//! Request and response snapshots passed between the agent, the cache and the network.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

/// An outgoing request from a controlled page.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub headers: Vec<(String, String)>,
  pub body: Option<Vec<u8>>,
}

impl Request {
  /// A bodiless GET for the given URL.
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      headers: Vec::new(),
      body: None,
    }
  }

  /// A request with an arbitrary method and optional body.
  pub fn new(method: Method, url: Url, body: Option<Vec<u8>>) -> Self {
    Self {
      method,
      url,
      headers: Vec::new(),
      body,
    }
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  /// Cache identity of this request.
  pub fn key(&self) -> RequestKey {
    RequestKey::new(&self.method, &self.url)
  }

  pub fn is_get(&self) -> bool {
    self.method == Method::GET
  }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl Response {
  #[cfg(test)]
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers: Vec::new(),
      body: body.into(),
    }
  }

  /// True for any 2xx status.
  pub fn is_ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

/// Identity of a cached request: method plus absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
  pub method: String,
  pub url: String,
}

impl RequestKey {
  /// Fragments never reach the server, so they are not part of the identity.
  pub fn new(method: &Method, url: &Url) -> Self {
    let mut url = url.clone();
    url.set_fragment(None);
    Self {
      method: method.as_str().to_string(),
      url: url.to_string(),
    }
  }

  #[cfg(test)]
  pub fn get(url: &Url) -> Self {
    Self::new(&Method::GET, url)
  }
}

impl std::fmt::Display for RequestKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", self.method, self.url)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ok_range() {
    assert!(Response::new(200, "").is_ok());
    assert!(Response::new(204, "").is_ok());
    assert!(!Response::new(304, "").is_ok());
    assert!(!Response::new(404, "").is_ok());
  }

  #[test]
  fn test_header_lookup_is_case_insensitive() {
    let mut response = Response::new(200, "x");
    response
      .headers
      .push(("Content-Type".to_string(), "text/html".to_string()));
    assert_eq!(response.header("content-type"), Some("text/html"));
    assert_eq!(response.header("etag"), None);
  }

  #[test]
  fn test_key_uses_method_and_url() {
    let url = Url::parse("http://localhost/index.html").unwrap();
    let get = Request::get(url.clone());
    let post = Request::new(Method::POST, url.clone(), Some(b"a=1".to_vec()));

    assert_eq!(get.key(), RequestKey::get(&url));
    assert_ne!(get.key(), post.key());
    assert_eq!(get.key().to_string(), "GET http://localhost/index.html");
  }

  #[test]
  fn test_key_ignores_fragment() {
    let plain = Url::parse("http://localhost/index.html?tab=2").unwrap();
    let anchored = Url::parse("http://localhost/index.html?tab=2#top").unwrap();

    assert_eq!(Request::get(anchored.clone()).key(), RequestKey::get(&plain));
    assert_eq!(RequestKey::get(&anchored).url, "http://localhost/index.html?tab=2");
    // The request itself keeps its URL untouched
    assert_eq!(Request::get(anchored).url.fragment(), Some("top"));
  }
}
