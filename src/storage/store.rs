//! Key-Value Store Interface
//!
//! [`KeyValueStore`] is the seam between the cache helpers and whatever
//! actually holds the data. It mirrors the Redis command families the helpers
//! need: strings, hashes, lists, sets, and sorted sets, plus per-key expiry.
//!
//! All calls are blocking request/response. Keys are raw bytes; values are
//! [`Bytes`] so implementations can hand out cheap clones.
//!
//! ## Conventions
//!
//! - A command against a key holding a different data type fails with
//!   [`StoreError::WrongType`].
//! - Reading a missing key behaves like reading an empty value of the
//!   expected type (`None`, empty `Vec`, zero length).
//! - Collections that become empty are removed, so the key stops existing.
//! - List and sorted-set ranges use inclusive `start`/`stop` indices, where
//!   negative values count back from the tail (`-1` is the last element).

use bytes::Bytes;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Errors a store can report for a single command.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The key holds a value of another data type
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// The stored value is not a 64-bit signed integer
    #[error("value is not an integer or out of range")]
    NotInteger,

    /// An increment overflowed a 64-bit signed integer
    #[error("increment or decrement would overflow")]
    Overflow,

    /// A sorted-set score increment produced NaN
    #[error("resulting score is not a number (NaN)")]
    NotFloat,
}

/// Result type for store commands.
pub type StoreResult<T> = Result<T, StoreError>;

/// A sorted-set member together with its score.
pub type ScoredMember = (Bytes, f64);

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist
    Missing,
    /// The key exists and never expires
    Persistent,
    /// The key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Redis-style seconds: `-2` missing, `-1` persistent, otherwise remaining seconds.
    pub fn as_secs(&self) -> i64 {
        match self {
            KeyTtl::Missing => -2,
            KeyTtl::Persistent => -1,
            KeyTtl::Expires(remaining) => remaining.as_secs() as i64,
        }
    }
}

/// A blocking key-value store with Redis data types.
pub trait KeyValueStore: Send + Sync {
    // ==================== Keys ====================

    /// Returns `true` if the key exists (and has not expired).
    fn exists(&self, key: &[u8]) -> bool;

    /// Deletes a key of any type. Returns `true` if it existed.
    fn delete(&self, key: &[u8]) -> bool;

    /// Sets a time-to-live on an existing key. Returns `false` if the key is missing.
    fn expire(&self, key: &[u8], ttl: Duration) -> bool;

    /// Removes the time-to-live from a key. Returns `true` if one was removed.
    fn persist(&self, key: &[u8]) -> bool;

    /// Returns the remaining lifetime of a key.
    fn ttl(&self, key: &[u8]) -> KeyTtl;

    /// Returns all live keys matching a glob pattern.
    fn keys(&self, pattern: &str) -> Vec<Bytes>;

    /// Returns the Redis type name of a key (`"string"`, `"list"`, `"hash"`,
    /// `"set"`, `"zset"`), or `None` if it does not exist.
    fn key_type(&self, key: &[u8]) -> Option<&'static str>;

    // ==================== Strings ====================

    /// Gets a string value.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>>;

    /// Sets a string value, replacing any existing value and expiry.
    fn set(&self, key: &[u8], value: Bytes, ttl: Option<Duration>);

    /// Adds `delta` to an integer string value, treating a missing key as `0`.
    fn incr_by(&self, key: &[u8], delta: i64) -> StoreResult<i64>;

    // ==================== Hashes ====================

    /// Gets one field of a hash.
    fn hget(&self, key: &[u8], field: &[u8]) -> StoreResult<Option<Bytes>>;

    /// Sets one field of a hash. Returns `true` if the field is new.
    fn hset(&self, key: &[u8], field: Bytes, value: Bytes) -> StoreResult<bool>;

    /// Sets several fields of a hash.
    fn hset_many(&self, key: &[u8], fields: Vec<(Bytes, Bytes)>) -> StoreResult<()>;

    /// Gets several fields of a hash, in request order.
    fn hmget(&self, key: &[u8], fields: &[Bytes]) -> StoreResult<Vec<Option<Bytes>>>;

    /// Adds `delta` to an integer hash field, treating a missing field as `0`.
    fn hincr_by(&self, key: &[u8], field: &[u8], delta: i64) -> StoreResult<i64>;

    /// Returns all field names of a hash.
    fn hkeys(&self, key: &[u8]) -> StoreResult<Vec<Bytes>>;

    /// Returns all values of a hash.
    fn hvals(&self, key: &[u8]) -> StoreResult<Vec<Bytes>>;

    /// Returns all field/value pairs of a hash.
    fn hgetall(&self, key: &[u8]) -> StoreResult<Vec<(Bytes, Bytes)>>;

    /// Deletes fields from a hash. Returns how many existed.
    fn hdel(&self, key: &[u8], fields: &[Bytes]) -> StoreResult<usize>;

    // ==================== Lists ====================

    /// Pushes values onto the head of a list, one at a time. Returns the new length.
    fn lpush(&self, key: &[u8], values: Vec<Bytes>) -> StoreResult<usize>;

    /// Pushes values onto the tail of a list. Returns the new length.
    fn rpush(&self, key: &[u8], values: Vec<Bytes>) -> StoreResult<usize>;

    /// Removes and returns the head of a list.
    fn lpop(&self, key: &[u8]) -> StoreResult<Option<Bytes>>;

    /// Removes and returns the tail of a list.
    fn rpop(&self, key: &[u8]) -> StoreResult<Option<Bytes>>;

    /// Returns the length of a list.
    fn llen(&self, key: &[u8]) -> StoreResult<usize>;

    /// Returns the elements between `start` and `stop`, inclusive.
    fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Bytes>>;

    // ==================== Sets ====================

    /// Adds members to a set. Returns how many were new.
    fn sadd(&self, key: &[u8], members: Vec<Bytes>) -> StoreResult<usize>;

    /// Removes members from a set. Returns how many existed.
    fn srem(&self, key: &[u8], members: &[Bytes]) -> StoreResult<usize>;

    /// Removes and returns up to `count` arbitrary members.
    fn spop(&self, key: &[u8], count: usize) -> StoreResult<Vec<Bytes>>;

    /// Returns all members of a set.
    fn smembers(&self, key: &[u8]) -> StoreResult<HashSet<Bytes>>;

    /// Returns `true` if `member` is in the set.
    fn sismember(&self, key: &[u8], member: &[u8]) -> StoreResult<bool>;

    /// Returns the members present in every given set.
    fn sinter(&self, keys: &[&[u8]]) -> StoreResult<HashSet<Bytes>>;

    /// Returns the number of members in a set.
    fn scard(&self, key: &[u8]) -> StoreResult<usize>;

    // ==================== Sorted sets ====================

    /// Adds or updates members with scores. Returns how many were new.
    fn zadd(&self, key: &[u8], members: Vec<ScoredMember>) -> StoreResult<usize>;

    /// Adds `delta` to a member's score, creating it at `delta`. Returns the new score.
    fn zincr_by(&self, key: &[u8], member: Bytes, delta: f64) -> StoreResult<f64>;

    /// Returns a member's score.
    fn zscore(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<f64>>;

    /// Returns a member's zero-based rank, lowest score first.
    fn zrank(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<usize>>;

    /// Returns members between `start` and `stop` (inclusive), highest score first.
    fn zrevrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<ScoredMember>>;

    /// Returns members with `min <= score <= max`, lowest score first.
    fn zrange_by_score(&self, key: &[u8], min: f64, max: f64) -> StoreResult<Vec<ScoredMember>>;

    /// Returns the number of members in a sorted set.
    fn zcard(&self, key: &[u8]) -> StoreResult<usize>;
}

/// Resolves Redis-style inclusive range indices against a collection length.
///
/// Returns the half-open `start..end` slice bounds, or `None` when the range
/// selects nothing.
pub(crate) fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range(5, 0, -1), Some((0, 5)));
        assert_eq!(resolve_range(5, 1, 3), Some((1, 4)));
        assert_eq!(resolve_range(5, -3, -1), Some((2, 5)));
        assert_eq!(resolve_range(5, 0, 100), Some((0, 5)));
        assert_eq!(resolve_range(5, -100, 1), Some((0, 2)));
        assert_eq!(resolve_range(5, 3, 1), None);
        assert_eq!(resolve_range(5, 5, 10), None);
        assert_eq!(resolve_range(5, 0, -6), None);
        assert_eq!(resolve_range(0, 0, -1), None);
    }

    #[test]
    fn test_key_ttl_as_secs() {
        assert_eq!(KeyTtl::Missing.as_secs(), -2);
        assert_eq!(KeyTtl::Persistent.as_secs(), -1);
        assert_eq!(KeyTtl::Expires(Duration::from_millis(90_500)).as_secs(), 90);
    }

    #[test]
    fn test_store_error_messages() {
        assert_eq!(
            StoreError::WrongType.to_string(),
            "WRONGTYPE Operation against a key holding the wrong kind of value"
        );
        assert_eq!(
            StoreError::NotInteger.to_string(),
            "value is not an integer or out of range"
        );
    }
}
