//! Cache Helpers
//!
//! Two layers over a [`KeyValueStore`](crate::storage::KeyValueStore):
//!
//! - [`CacheClient`]: string in, string out, one method per Redis operation.
//! - [`CacheService`]: JSON-encoded values decoded into caller types.
//!
//! Both are cheap to clone and share their store.

pub mod client;
pub mod service;

pub use client::CacheClient;
pub use service::CacheService;

use std::time::Duration;

/// Expiry applied by the `*_default_ttl` helpers and by bare `expire`: three days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);
