//! Network access for requests the cache cannot answer.

mod client;
#[cfg(test)]
pub mod fake;

pub use client::{Fetcher, HttpFetcher};
