//! # rediskit - Typed Redis Helpers and Keyed Collection Utilities
//!
//! rediskit bundles three things that tend to travel together in services
//! that cache data in Redis:
//!
//! - **Collection utilities** for turning query results into keyed maps,
//!   top-N lists, and groups before they are cached.
//! - **Cache helpers** with one method per Redis operation, in a string
//!   flavour ([`CacheClient`]) and a JSON flavour ([`CacheService`]).
//! - **A data source registry** that builds those helpers for every Redis
//!   endpoint named in a YAML configuration file.
//!
//! The helpers talk to a [`KeyValueStore`]. The crate ships
//! [`StorageEngine`], a sharded, thread-safe in-memory implementation with
//! per-key expiry, which backs the registry's [`MemoryConnector`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              rediskit                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────────┐    ┌──────────────────────┐    │
//! │  │ RedisSettings│──>│DataSourceRegistry│──>│ DataSource (per name)│    │
//! │  │   (YAML)    │    │                 │    │ CacheClient          │    │
//! │  └─────────────┘    └────────┬────────┘    │ CacheService (JSON)  │    │
//! │                              │             └──────────┬───────────┘    │
//! │                     StoreConnector                    │                │
//! │                              │                        ▼                │
//! │                              │        ┌──────────────────────────────┐ │
//! │                              └──────> │   dyn KeyValueStore          │ │
//! │                                       │   StorageEngine (64 shards)  │ │
//! │                                       └──────────────▲───────────────┘ │
//! │                                                      │                 │
//! │                                       ┌──────────────┴───────────────┐ │
//! │                                       │ ExpirySweeper (Tokio task)   │ │
//! │                                       └──────────────────────────────┘ │
//! │                                                                         │
//! │  collections: reduce_to_map · top_n · group_by · map/filter helpers     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use rediskit::collections::{reduce_to_map, TieBreak};
//! use rediskit::config::RedisSettings;
//! use rediskit::registry::{DataSourceRegistry, MemoryConnector};
//!
//! # fn main() -> Result<(), rediskit::Error> {
//! let settings = RedisSettings::from_yaml_str("data-source:\n  main:\n    database: 0\n")?;
//! let registry = DataSourceRegistry::from_settings(&settings, MemoryConnector::new())?;
//! let cache = registry.service("main")?;
//!
//! // Latest price per symbol
//! let quotes = vec![("ACME", 1, 10.0), ("ACME", 2, 10.5), ("INIT", 1, 3.2)];
//! let latest = reduce_to_map(quotes, |q| q.0, |q| q.1, |q| q.2, TieBreak::Max);
//!
//! cache.set_json("latest:ACME", &latest["ACME"])?;
//! assert_eq!(cache.get_json::<f64>("latest:ACME")?, Some(10.5));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`collections`]: keyed reduction, top-N selection, grouping, transforms
//! - [`cache`]: string and JSON helpers over a [`KeyValueStore`]
//! - [`config`]: YAML data source settings
//! - [`registry`]: one set of helpers per configured data source
//! - [`storage`]: the store trait, the in-memory engine, and its expiry sweeper
//! - [`error`]: the crate error type
//!
//! ## Design Highlights
//!
//! ### Thread Safety
//!
//! The storage engine spreads keys over 64 independent `RwLock`s, so threads
//! working on different keys rarely block each other.
//!
//! ### Lazy + Active Expiry
//!
//! Keys with a TTL are expired in two ways:
//! 1. **Lazy**: reads skip expired keys and writes purge them
//! 2. **Active**: a background task periodically reclaims expired keys
//!
//! Memory is therefore reclaimed even for keys that are never touched again.

pub mod cache;
pub mod collections;
pub mod config;
pub mod error;
pub mod registry;
pub mod storage;

// Re-export commonly used types for convenience
pub use cache::{CacheClient, CacheService, DEFAULT_TTL};
pub use collections::{reduce_to_map, top_n, OrderType, TieBreak};
pub use config::{DataSourceConfig, PoolConfig, RedisSettings, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{Error, Result};
pub use registry::{DataSource, DataSourceRegistry, MemoryConnector, StoreConnector};
pub use storage::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper, KeyValueStore, StorageEngine};

/// Version of rediskit
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
