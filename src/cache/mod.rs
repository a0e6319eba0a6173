//! Versioned, namespaced response cache.
//!
//! Each namespace belongs to one version of the asset set. Bumping the version
//! is the only way previously cached content gets invalidated: the agent
//! deletes every namespace that is not the current one on activation.

mod storage;
mod traits;

pub use storage::SqliteStorage;
pub use traits::{CacheStore, CachedResponse, LookupScope};
