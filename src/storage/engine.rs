//! Thread-Safe In-Memory Storage Engine
//!
//! [`StorageEngine`] implements [`KeyValueStore`] entirely in memory. It is the
//! store behind every data source built by the in-memory connector, and the
//! store the test suites run against.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: keys are spread over 64 shards, each behind its own
//!    `RwLock`, so commands on different keys rarely contend.
//! 2. **One Value Per Key**: each key holds exactly one [`Value`]; a command
//!    for another data type fails with [`StoreError::WrongType`].
//! 3. **Lazy + Active Expiry**: expired entries are invisible to reads and are
//!    purged before any write to the same key. [`StorageEngine::cleanup_expired`]
//!    (driven by the expiry sweeper) reclaims the rest.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use super::store::{resolve_range, KeyTtl, KeyValueStore, ScoredMember, StoreError, StoreResult};
use super::value::{Entry, Value};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::trace;

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

type EntryMap = HashMap<Bytes, Entry>;

/// A single shard containing a portion of the keys.
#[derive(Debug, Default)]
struct Shard {
    entries: RwLock<EntryMap>,
}

impl Shard {
    // A panic while holding the lock leaves the map itself intact, so keep serving it.
    fn read(&self) -> RwLockReadGuard<'_, EntryMap> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntryMap> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory, sharded key-value store with Redis data types.
///
/// Designed to be wrapped in an `Arc` and shared; every operation is thread-safe.
///
/// # Example
///
/// ```
/// use rediskit::storage::{KeyValueStore, StorageEngine};
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set(b"name", Bytes::from("Ariz"), None);
/// assert_eq!(engine.get(b"name").unwrap(), Some(Bytes::from("Ariz")));
///
/// engine.rpush(b"queue", vec![Bytes::from("a"), Bytes::from("b")]).unwrap();
/// assert_eq!(engine.lpop(b"queue").unwrap(), Some(Bytes::from("a")));
///
/// engine.set(b"session", Bytes::from("abc123"), Some(Duration::from_secs(60)));
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,

    /// Statistics: read commands served
    read_count: AtomicU64,

    /// Statistics: write commands served
    write_count: AtomicU64,

    /// Statistics: keys deleted explicitly
    del_count: AtomicU64,

    /// Statistics: expired keys reclaimed
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("read_count", &self.read_count.load(Ordering::Relaxed))
            .field("write_count", &self.write_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self {
            shards: (0..NUM_SHARDS).map(|_| Shard::default()).collect(),
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard_for(&self, key: &[u8]) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    /// Runs `f` on the live entry for `key` under a read lock.
    fn view_entry<R>(&self, key: &[u8], f: impl FnOnce(Option<&Entry>) -> R) -> R {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        let entries = self.shard_for(key).read();
        f(entries.get(key).filter(|entry| !entry.is_expired()))
    }

    fn view<R>(&self, key: &[u8], f: impl FnOnce(Option<&Value>) -> R) -> R {
        self.view_entry(key, |entry| f(entry.map(|entry| &entry.value)))
    }

    /// Runs `f` on the shard map holding `key` under a write lock, after
    /// purging `key` if it has expired.
    fn update<R>(&self, key: &[u8], f: impl FnOnce(&mut EntryMap) -> R) -> R {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.shard_for(key).write();
        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
            self.expired_count.fetch_add(1, Ordering::Relaxed);
        }
        f(&mut *entries)
    }

    /// Returns the number of live keys.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().values().filter(|e| !e.is_expired()).count())
            .sum()
    }

    /// Returns true if no live keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every key.
    pub fn flush(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }
    }

    /// Removes expired keys from all shards and returns how many were removed.
    ///
    /// Called periodically by the expiry sweeper.
    pub fn cleanup_expired(&self) -> u64 {
        let mut cleaned = 0u64;
        for shard in &self.shards {
            let mut entries = shard.write();
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired());
            cleaned += (before - entries.len()) as u64;
        }

        if cleaned > 0 {
            self.expired_count.fetch_add(cleaned, Ordering::Relaxed);
            trace!(cleaned, "Reclaimed expired keys");
        }
        cleaned
    }

    /// Returns engine statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len() as u64,
            reads: self.read_count.load(Ordering::Relaxed),
            writes: self.write_count.load(Ordering::Relaxed),
            deletes: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Engine statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of live keys
    pub keys: u64,
    /// Read commands served
    pub reads: u64,
    /// Write commands served
    pub writes: u64,
    /// Keys deleted explicitly
    pub deletes: u64,
    /// Expired keys reclaimed lazily or by the sweeper
    pub expired: u64,
}

/// Projects an optional value to the expected type.
fn typed<'a, T>(
    value: Option<&'a Value>,
    project: fn(&Value) -> Option<&T>,
) -> StoreResult<Option<&'a T>> {
    match value {
        None => Ok(None),
        Some(value) => project(value).map(Some).ok_or(StoreError::WrongType),
    }
}

/// Returns the collection stored at `key`, creating an empty one if missing.
fn slot<'a, T>(
    entries: &'a mut EntryMap,
    key: &[u8],
    empty: fn() -> Value,
    project: fn(&mut Value) -> Option<&mut T>,
) -> StoreResult<&'a mut T> {
    let entry = entries
        .entry(Bytes::copy_from_slice(key))
        .or_insert_with(|| Entry::new(empty()));
    project(&mut entry.value).ok_or(StoreError::WrongType)
}

/// Returns the collection stored at `key` if there is one.
fn existing<'a, T>(
    entries: &'a mut EntryMap,
    key: &[u8],
    project: fn(&mut Value) -> Option<&mut T>,
) -> StoreResult<Option<&'a mut T>> {
    match entries.get_mut(key) {
        None => Ok(None),
        Some(entry) => project(&mut entry.value)
            .map(Some)
            .ok_or(StoreError::WrongType),
    }
}

fn drop_if_empty(entries: &mut EntryMap, key: &[u8]) {
    if entries
        .get(key)
        .is_some_and(|entry| entry.value.is_empty_collection())
    {
        entries.remove(key);
    }
}

fn parse_int(raw: &[u8]) -> StoreResult<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(StoreError::NotInteger)
}

impl KeyValueStore for StorageEngine {
    fn exists(&self, key: &[u8]) -> bool {
        self.view(key, |value| value.is_some())
    }

    fn delete(&self, key: &[u8]) -> bool {
        let removed = self.update(key, |entries| entries.remove(key).is_some());
        if removed {
            self.del_count.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    fn expire(&self, key: &[u8], ttl: Duration) -> bool {
        self.update(key, |entries| match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                true
            }
            None => false,
        })
    }

    fn persist(&self, key: &[u8]) -> bool {
        self.update(key, |entries| {
            entries
                .get_mut(key)
                .is_some_and(|entry| entry.expires_at.take().is_some())
        })
    }

    fn ttl(&self, key: &[u8]) -> KeyTtl {
        self.view_entry(key, |entry| match entry {
            None => KeyTtl::Missing,
            Some(entry) => entry
                .remaining()
                .map_or(KeyTtl::Persistent, KeyTtl::Expires),
        })
    }

    fn keys(&self, pattern: &str) -> Vec<Bytes> {
        let pattern = pattern.as_bytes();
        let mut matched = Vec::new();
        for shard in &self.shards {
            let entries = shard.read();
            matched.extend(
                entries
                    .iter()
                    .filter(|(key, entry)| !entry.is_expired() && glob_match(pattern, key))
                    .map(|(key, _)| key.clone()),
            );
        }
        matched
    }

    fn key_type(&self, key: &[u8]) -> Option<&'static str> {
        self.view(key, |value| value.map(Value::type_name))
    }

    // ==================== Strings ====================

    fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.view(key, |value| match value {
            None => Ok(None),
            Some(Value::String(raw)) => Ok(Some(raw.clone())),
            Some(_) => Err(StoreError::WrongType),
        })
    }

    fn set(&self, key: &[u8], value: Bytes, ttl: Option<Duration>) {
        let entry = match ttl {
            Some(ttl) => Entry::with_ttl(Value::String(value), ttl),
            None => Entry::new(Value::String(value)),
        };
        self.update(key, |entries| {
            entries.insert(Bytes::copy_from_slice(key), entry);
        });
    }

    fn incr_by(&self, key: &[u8], delta: i64) -> StoreResult<i64> {
        self.update(key, |entries| {
            let (current, expires_at) = match entries.get(key) {
                None => (0, None),
                Some(Entry {
                    value: Value::String(raw),
                    expires_at,
                }) => (parse_int(raw)?, *expires_at),
                Some(_) => return Err(StoreError::WrongType),
            };

            let next = current.checked_add(delta).ok_or(StoreError::Overflow)?;

            // The counter keeps its existing expiry
            entries.insert(
                Bytes::copy_from_slice(key),
                Entry {
                    value: Value::String(Bytes::from(next.to_string())),
                    expires_at,
                },
            );
            Ok(next)
        })
    }

    // ==================== Hashes ====================

    fn hget(&self, key: &[u8], field: &[u8]) -> StoreResult<Option<Bytes>> {
        self.view(key, |value| {
            Ok(typed(value, Value::as_hash)?.and_then(|hash| hash.get(field).cloned()))
        })
    }

    fn hset(&self, key: &[u8], field: Bytes, value: Bytes) -> StoreResult<bool> {
        self.update(key, |entries| {
            let hash = slot(entries, key, Value::empty_hash, Value::as_hash_mut)?;
            Ok(hash.insert(field, value).is_none())
        })
    }

    fn hset_many(&self, key: &[u8], fields: Vec<(Bytes, Bytes)>) -> StoreResult<()> {
        self.update(key, |entries| {
            slot(entries, key, Value::empty_hash, Value::as_hash_mut)?.extend(fields);
            drop_if_empty(entries, key);
            Ok(())
        })
    }

    fn hmget(&self, key: &[u8], fields: &[Bytes]) -> StoreResult<Vec<Option<Bytes>>> {
        self.view(key, |value| {
            let hash = typed(value, Value::as_hash)?;
            Ok(fields
                .iter()
                .map(|field| hash.and_then(|hash| hash.get(field).cloned()))
                .collect())
        })
    }

    fn hincr_by(&self, key: &[u8], field: &[u8], delta: i64) -> StoreResult<i64> {
        self.update(key, |entries| {
            let hash = slot(entries, key, Value::empty_hash, Value::as_hash_mut)?;
            let current = match hash.get(field) {
                Some(raw) => parse_int(raw)?,
                None => 0,
            };
            let next = current.checked_add(delta).ok_or(StoreError::Overflow)?;
            hash.insert(
                Bytes::copy_from_slice(field),
                Bytes::from(next.to_string()),
            );
            Ok(next)
        })
    }

    fn hkeys(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        self.view(key, |value| {
            Ok(typed(value, Value::as_hash)?
                .map(|hash| hash.keys().cloned().collect())
                .unwrap_or_default())
        })
    }

    fn hvals(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        self.view(key, |value| {
            Ok(typed(value, Value::as_hash)?
                .map(|hash| hash.values().cloned().collect())
                .unwrap_or_default())
        })
    }

    fn hgetall(&self, key: &[u8]) -> StoreResult<Vec<(Bytes, Bytes)>> {
        self.view(key, |value| {
            Ok(typed(value, Value::as_hash)?
                .map(|hash| {
                    hash.iter()
                        .map(|(field, value)| (field.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn hdel(&self, key: &[u8], fields: &[Bytes]) -> StoreResult<usize> {
        self.update(key, |entries| {
            let removed = match existing(entries, key, Value::as_hash_mut)? {
                Some(hash) => fields
                    .iter()
                    .filter(|field| hash.remove(&field[..]).is_some())
                    .count(),
                None => 0,
            };
            drop_if_empty(entries, key);
            Ok(removed)
        })
    }

    // ==================== Lists ====================

    fn lpush(&self, key: &[u8], values: Vec<Bytes>) -> StoreResult<usize> {
        self.update(key, |entries| {
            let list = slot(entries, key, Value::empty_list, Value::as_list_mut)?;
            // LPUSH key a b c leaves [c, b, a]
            for value in values {
                list.push_front(value);
            }
            let len = list.len();
            drop_if_empty(entries, key);
            Ok(len)
        })
    }

    fn rpush(&self, key: &[u8], values: Vec<Bytes>) -> StoreResult<usize> {
        self.update(key, |entries| {
            let list = slot(entries, key, Value::empty_list, Value::as_list_mut)?;
            list.extend(values);
            let len = list.len();
            drop_if_empty(entries, key);
            Ok(len)
        })
    }

    fn lpop(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.update(key, |entries| {
            let popped =
                existing(entries, key, Value::as_list_mut)?.and_then(|list| list.pop_front());
            drop_if_empty(entries, key);
            Ok(popped)
        })
    }

    fn rpop(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.update(key, |entries| {
            let popped =
                existing(entries, key, Value::as_list_mut)?.and_then(|list| list.pop_back());
            drop_if_empty(entries, key);
            Ok(popped)
        })
    }

    fn llen(&self, key: &[u8]) -> StoreResult<usize> {
        self.view(key, |value| Ok(typed(value, Value::as_list)?.map_or(0, |list| list.len())))
    }

    fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Bytes>> {
        self.view(key, |value| {
            let Some(list) = typed(value, Value::as_list)? else {
                return Ok(Vec::new());
            };
            Ok(match resolve_range(list.len(), start, stop) {
                Some((from, to)) => list.range(from..to).cloned().collect(),
                None => Vec::new(),
            })
        })
    }

    // ==================== Sets ====================

    fn sadd(&self, key: &[u8], members: Vec<Bytes>) -> StoreResult<usize> {
        self.update(key, |entries| {
            let set = slot(entries, key, Value::empty_set, Value::as_set_mut)?;
            let added = members
                .into_iter()
                .filter(|member| set.insert(member.clone()))
                .count();
            drop_if_empty(entries, key);
            Ok(added)
        })
    }

    fn srem(&self, key: &[u8], members: &[Bytes]) -> StoreResult<usize> {
        self.update(key, |entries| {
            let removed = match existing(entries, key, Value::as_set_mut)? {
                Some(set) => members
                    .iter()
                    .filter(|member| set.remove(&member[..]))
                    .count(),
                None => 0,
            };
            drop_if_empty(entries, key);
            Ok(removed)
        })
    }

    fn spop(&self, key: &[u8], count: usize) -> StoreResult<Vec<Bytes>> {
        self.update(key, |entries| {
            let popped = match existing(entries, key, Value::as_set_mut)? {
                Some(set) => {
                    let picked: Vec<Bytes> = set.iter().take(count).cloned().collect();
                    for member in &picked {
                        set.remove(member);
                    }
                    picked
                }
                None => Vec::new(),
            };
            drop_if_empty(entries, key);
            Ok(popped)
        })
    }

    fn smembers(&self, key: &[u8]) -> StoreResult<HashSet<Bytes>> {
        self.view(key, |value| Ok(typed(value, Value::as_set)?.cloned().unwrap_or_default()))
    }

    fn sismember(&self, key: &[u8], member: &[u8]) -> StoreResult<bool> {
        self.view(key, |value| {
            Ok(typed(value, Value::as_set)?.is_some_and(|set| set.contains(member)))
        })
    }

    fn sinter(&self, keys: &[&[u8]]) -> StoreResult<HashSet<Bytes>> {
        let Some((first, rest)) = keys.split_first() else {
            return Ok(HashSet::new());
        };

        let mut common = self.smembers(first)?;
        for key in rest {
            let other = self.smembers(key)?;
            common.retain(|member| other.contains(member));
        }
        Ok(common)
    }

    fn scard(&self, key: &[u8]) -> StoreResult<usize> {
        self.view(key, |value| Ok(typed(value, Value::as_set)?.map_or(0, |set| set.len())))
    }

    // ==================== Sorted sets ====================

    fn zadd(&self, key: &[u8], members: Vec<ScoredMember>) -> StoreResult<usize> {
        self.update(key, |entries| {
            let zset = slot(entries, key, Value::empty_sorted_set, Value::as_sorted_set_mut)?;
            let added = members
                .into_iter()
                .filter(|(member, score)| zset.insert(member.clone(), *score))
                .count();
            drop_if_empty(entries, key);
            Ok(added)
        })
    }

    fn zincr_by(&self, key: &[u8], member: Bytes, delta: f64) -> StoreResult<f64> {
        self.update(key, |entries| {
            let zset = slot(entries, key, Value::empty_sorted_set, Value::as_sorted_set_mut)?;
            let score = zset.increment(member, delta);
            drop_if_empty(entries, key);
            score.ok_or(StoreError::NotFloat)
        })
    }

    fn zscore(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<f64>> {
        self.view(key, |value| {
            Ok(typed(value, Value::as_sorted_set)?.and_then(|zset| zset.score(member)))
        })
    }

    fn zrank(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<usize>> {
        self.view(key, |value| {
            Ok(typed(value, Value::as_sorted_set)?.and_then(|zset| zset.rank(member)))
        })
    }

    fn zrevrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<ScoredMember>> {
        self.view(key, |value| {
            let Some(zset) = typed(value, Value::as_sorted_set)? else {
                return Ok(Vec::new());
            };
            let mut members = zset.ascending();
            members.reverse();
            Ok(match resolve_range(members.len(), start, stop) {
                Some((from, to)) => members.drain(from..to).collect(),
                None => Vec::new(),
            })
        })
    }

    fn zrange_by_score(&self, key: &[u8], min: f64, max: f64) -> StoreResult<Vec<ScoredMember>> {
        self.view(key, |value| {
            Ok(typed(value, Value::as_sorted_set)?
                .map(|zset| {
                    zset.ascending()
                        .into_iter()
                        .filter(|(_, score)| (min..=max).contains(score))
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn zcard(&self, key: &[u8]) -> StoreResult<usize> {
        self.view(key, |value| {
            Ok(typed(value, Value::as_sorted_set)?.map_or(0, |zset| zset.len()))
        })
    }
}

/// Redis-style glob matching on raw bytes.
///
/// Supports `*`, `?`, `[abc]`, `[^abc]`, `[a-z]`, and `\` escapes.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((&b'*', rest)) => (0..=text.len()).any(|skip| glob_match(rest, &text[skip..])),
        Some((&b'?', rest)) => !text.is_empty() && glob_match(rest, &text[1..]),
        Some((&b'[', class)) => match (text.split_first(), match_class(class, text.first())) {
            (Some((_, remaining)), Some((true, after))) => glob_match(after, remaining),
            _ => false,
        },
        Some((&b'\\', rest)) => match (rest.split_first(), text.split_first()) {
            (Some((expected, rest)), Some((actual, remaining))) => {
                expected == actual && glob_match(rest, remaining)
            }
            _ => false,
        },
        Some((literal, rest)) => text.first() == Some(literal) && glob_match(rest, &text[1..]),
    }
}

/// Matches one byte against a character class body (the pattern after `[`).
///
/// Returns whether it matched and the pattern following the closing `]`, or
/// `None` for an unterminated class or missing input byte.
fn match_class<'a>(class: &'a [u8], byte: Option<&u8>) -> Option<(bool, &'a [u8])> {
    let byte = *byte?;
    let (negate, mut i) = match class.first() {
        Some(&b'^') => (true, 1),
        _ => (false, 0),
    };

    let mut matched = false;
    while i < class.len() && class[i] != b']' {
        if i + 2 < class.len() && class[i + 1] == b'-' && class[i + 2] != b']' {
            let (low, high) = (class[i].min(class[i + 2]), class[i].max(class[i + 2]));
            matched |= (low..=high).contains(&byte);
            i += 3;
        } else {
            matched |= class[i] == byte;
            i += 1;
        }
    }

    if i >= class.len() {
        return None;
    }
    Some((matched != negate, &class[i + 1..]))
}
