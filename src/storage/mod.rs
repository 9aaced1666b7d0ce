//! Storage Module
//!
//! The [`KeyValueStore`] trait the cache helpers talk to, and
//! [`StorageEngine`], a thread-safe, sharded in-memory implementation with
//! per-key expiry and a background expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//!        CacheClient / CacheService
//!                    │
//!                    ▼
//!        ┌───────────────────────┐
//!        │  dyn KeyValueStore    │
//!        └───────────┬───────────┘
//!                    │
//! ┌──────────────────┴──────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use rediskit::storage::{KeyTtl, KeyValueStore, StorageEngine};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let engine = StorageEngine::new();
//!
//! engine.set(b"name", Bytes::from("Ariz"), None);
//! assert_eq!(engine.get(b"name").unwrap(), Some(Bytes::from("Ariz")));
//!
//! engine.set(b"session", Bytes::from("token123"), Some(Duration::from_secs(3600)));
//! assert!(matches!(engine.ttl(b"session"), KeyTtl::Expires(_)));
//! ```

pub mod engine;
pub mod expiry;
pub mod store;
pub mod value;

pub use engine::{StorageEngine, StorageStats};
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper};
pub use store::{KeyTtl, KeyValueStore, ScoredMember, StoreError, StoreResult};
pub use value::{Entry, SortedSet, Value};
