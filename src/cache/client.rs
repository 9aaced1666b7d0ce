//! String Cache Helpers
//!
//! [`CacheClient`] wraps a [`KeyValueStore`] with one method per everyday
//! Redis operation, taking `&str` keys and handing back `String` values.
//! Stored bytes that are not UTF-8 surface as [`Error::InvalidUtf8`].

use super::DEFAULT_TTL;
use crate::error::{Error, Result};
use crate::storage::{KeyTtl, KeyValueStore};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Text-oriented helpers over a shared store.
///
/// Cloning is cheap; clones share the same store.
///
/// # Example
///
/// ```
/// use rediskit::cache::CacheClient;
/// use rediskit::storage::StorageEngine;
/// use std::sync::Arc;
///
/// let cache = CacheClient::new(Arc::new(StorageEngine::new()));
///
/// cache.set("greeting", "hello");
/// assert_eq!(cache.get("greeting").unwrap().as_deref(), Some("hello"));
///
/// cache.hash_put("user:1", "name", "Ariz").unwrap();
/// assert_eq!(cache.hash_get("user:1", "name").unwrap().as_deref(), Some("Ariz"));
/// ```
pub struct CacheClient<S: ?Sized = dyn KeyValueStore> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for CacheClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ?Sized> fmt::Debug for CacheClient<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheClient").finish_non_exhaustive()
    }
}

fn text(value: &str) -> Bytes {
    Bytes::copy_from_slice(value.as_bytes())
}

fn texts<I>(values: I) -> Vec<Bytes>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    values.into_iter().map(|value| text(value.as_ref())).collect()
}

fn decode(key: &str, raw: Bytes) -> Result<String> {
    match std::str::from_utf8(&raw) {
        Ok(value) => Ok(value.to_owned()),
        Err(_) => Err(Error::InvalidUtf8 {
            key: key.to_owned(),
        }),
    }
}

fn decode_opt(key: &str, raw: Option<Bytes>) -> Result<Option<String>> {
    raw.map(|raw| decode(key, raw)).transpose()
}

fn decode_all<C>(key: &str, raw: impl IntoIterator<Item = Bytes>) -> Result<C>
where
    C: FromIterator<String>,
{
    raw.into_iter().map(|raw| decode(key, raw)).collect()
}

impl<S: KeyValueStore + ?Sized> CacheClient<S> {
    /// Creates helpers over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ==================== Keys ====================

    /// Remaining lifetime of `key`.
    pub fn ttl(&self, key: &str) -> KeyTtl {
        self.store.ttl(key.as_bytes())
    }

    /// Expires `key` after [`DEFAULT_TTL`]. Returns `false` if it does not exist.
    pub fn expire(&self, key: &str) -> bool {
        self.expire_in(key, DEFAULT_TTL)
    }

    /// Expires `key` after `ttl`. Returns `false` if it does not exist.
    pub fn expire_in(&self, key: &str, ttl: Duration) -> bool {
        let applied = self.store.expire(key.as_bytes(), ttl);
        debug!(key, ttl_secs = ttl.as_secs(), applied, "Set key expiry");
        applied
    }

    /// Removes any expiry from `key`.
    pub fn persist(&self, key: &str) -> bool {
        self.store.persist(key.as_bytes())
    }

    /// Redis type name of `key`, or `None` if it does not exist.
    pub fn key_type(&self, key: &str) -> Option<&'static str> {
        self.store.key_type(key.as_bytes())
    }

    /// All keys matching a glob pattern.
    pub fn keys(&self, pattern: &str) -> Result<HashSet<String>> {
        self.store
            .keys(pattern)
            .into_iter()
            .map(|raw| {
                String::from_utf8(raw.to_vec()).map_err(|_| Error::InvalidUtf8 {
                    key: String::from_utf8_lossy(&raw).into_owned(),
                })
            })
            .collect()
    }

    pub fn delete(&self, key: &str) -> bool {
        self.store.delete(key.as_bytes())
    }

    /// Deletes every listed key. Returns how many existed.
    pub fn delete_all<I>(&self, keys: I) -> usize
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let deleted = keys
            .into_iter()
            .filter(|key| self.store.delete(key.as_ref().as_bytes()))
            .count();
        debug!(deleted, "Deleted keys");
        deleted
    }

    // ==================== Strings ====================

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        decode_opt(key, self.store.get(key.as_bytes())?)
    }

    /// Stores `value` with no expiry.
    pub fn set(&self, key: &str, value: &str) {
        trace!(key, "SET");
        self.store.set(key.as_bytes(), text(value), None);
    }

    /// Stores `value`, expiring after `ttl`.
    pub fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) {
        trace!(key, ttl_secs = ttl.as_secs(), "SET with expiry");
        self.store.set(key.as_bytes(), text(value), Some(ttl));
    }

    /// Stores `value`, expiring after [`DEFAULT_TTL`].
    pub fn set_with_default_ttl(&self, key: &str, value: &str) {
        self.set_with_ttl(key, value, DEFAULT_TTL);
    }

    /// Increments an integer value by one.
    pub fn incr(&self, key: &str) -> Result<i64> {
        self.incr_by(key, 1)
    }

    pub fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        Ok(self.store.incr_by(key.as_bytes(), delta)?)
    }

    // ==================== Hashes ====================

    pub fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        decode_opt(key, self.store.hget(key.as_bytes(), field.as_bytes())?)
    }

    /// Sets one field. Returns `true` if the field is new.
    pub fn hash_put(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        Ok(self.store.hset(key.as_bytes(), text(field), text(value))?)
    }

    pub fn hash_incr(&self, key: &str, field: &str) -> Result<i64> {
        self.hash_incr_by(key, field, 1)
    }

    pub fn hash_incr_by(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        Ok(self
            .store
            .hincr_by(key.as_bytes(), field.as_bytes(), delta)?)
    }

    /// Values of several fields, in request order. Missing fields are `None`.
    pub fn hash_multi_get<I>(&self, key: &str, fields: I) -> Result<Vec<Option<String>>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.store
            .hmget(key.as_bytes(), &texts(fields))?
            .into_iter()
            .map(|raw| decode_opt(key, raw))
            .collect()
    }

    /// Sets several fields at once.
    ///
    /// Accepts anything yielding string pairs, such as `&HashMap<String, String>`.
    pub fn hash_multi_put<I, F, V>(&self, key: &str, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (F, V)>,
        F: AsRef<str>,
        V: AsRef<str>,
    {
        let fields = entries
            .into_iter()
            .map(|(field, value)| (text(field.as_ref()), text(value.as_ref())))
            .collect();
        Ok(self.store.hset_many(key.as_bytes(), fields)?)
    }

    pub fn hash_keys(&self, key: &str) -> Result<HashSet<String>> {
        decode_all(key, self.store.hkeys(key.as_bytes())?)
    }

    pub fn hash_values(&self, key: &str) -> Result<Vec<String>> {
        decode_all(key, self.store.hvals(key.as_bytes())?)
    }

    pub fn hash_entries(&self, key: &str) -> Result<HashMap<String, String>> {
        self.store
            .hgetall(key.as_bytes())?
            .into_iter()
            .map(|(field, value)| Ok((decode(key, field)?, decode(key, value)?)))
            .collect()
    }

    /// Deletes fields. Returns how many existed.
    pub fn hash_delete<I>(&self, key: &str, fields: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Ok(self.store.hdel(key.as_bytes(), &texts(fields))?)
    }

    // ==================== Lists ====================

    pub fn list_left_pop(&self, key: &str) -> Result<Option<String>> {
        decode_opt(key, self.store.lpop(key.as_bytes())?)
    }

    pub fn list_right_pop(&self, key: &str) -> Result<Option<String>> {
        decode_opt(key, self.store.rpop(key.as_bytes())?)
    }

    /// Pushes onto the head. Returns the new length.
    pub fn list_left_push(&self, key: &str, value: &str) -> Result<usize> {
        Ok(self.store.lpush(key.as_bytes(), vec![text(value)])?)
    }

    /// Pushes onto the tail. Returns the new length.
    pub fn list_right_push(&self, key: &str, value: &str) -> Result<usize> {
        Ok(self.store.rpush(key.as_bytes(), vec![text(value)])?)
    }

    /// Pushes each value onto the head in turn, so the last one ends up first.
    pub fn list_left_push_all<I>(&self, key: &str, values: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Ok(self.store.lpush(key.as_bytes(), texts(values))?)
    }

    pub fn list_right_push_all<I>(&self, key: &str, values: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Ok(self.store.rpush(key.as_bytes(), texts(values))?)
    }

    pub fn list_size(&self, key: &str) -> Result<usize> {
        Ok(self.store.llen(key.as_bytes())?)
    }

    /// Elements from `start` to `stop` inclusive; negative indices count from the tail.
    pub fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        decode_all(key, self.store.lrange(key.as_bytes(), start, stop)?)
    }

    // ==================== Sets ====================

    /// Adds one member. Returns `true` if it was new.
    pub fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self.store.sadd(key.as_bytes(), vec![text(member)])? == 1)
    }

    pub fn set_add_all<I>(&self, key: &str, members: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Ok(self.store.sadd(key.as_bytes(), texts(members))?)
    }

    /// Removes and returns an arbitrary member.
    pub fn set_pop(&self, key: &str) -> Result<Option<String>> {
        let popped = self.store.spop(key.as_bytes(), 1)?;
        decode_opt(key, popped.into_iter().next())
    }

    /// Removes and returns up to `count` arbitrary members.
    pub fn set_pop_count(&self, key: &str, count: usize) -> Result<Vec<String>> {
        decode_all(key, self.store.spop(key.as_bytes(), count)?)
    }

    pub fn set_members(&self, key: &str) -> Result<HashSet<String>> {
        decode_all(key, self.store.smembers(key.as_bytes())?)
    }

    pub fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self.store.sismember(key.as_bytes(), member.as_bytes())?)
    }

    /// Members present in both sets.
    pub fn set_intersect(&self, key: &str, other: &str) -> Result<HashSet<String>> {
        decode_all(
            key,
            self.store.sinter(&[key.as_bytes(), other.as_bytes()])?,
        )
    }

    /// Removes one member. Returns `true` if it was present.
    pub fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self.store.srem(key.as_bytes(), &[text(member)])? == 1)
    }

    pub fn set_remove_all<I>(&self, key: &str, members: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Ok(self.store.srem(key.as_bytes(), &texts(members))?)
    }

    pub fn set_size(&self, key: &str) -> Result<usize> {
        Ok(self.store.scard(key.as_bytes())?)
    }

    // ==================== Sorted sets ====================

    /// Adds `delta` to a member's score. Returns the new score.
    pub fn zset_incr_score(&self, key: &str, member: &str, delta: f64) -> Result<f64> {
        Ok(self.store.zincr_by(key.as_bytes(), text(member), delta)?)
    }

    /// Adds or updates scored members. Returns how many were new.
    pub fn zset_add_all<I, M>(&self, key: &str, members: I) -> Result<usize>
    where
        I: IntoIterator<Item = (M, f64)>,
        M: AsRef<str>,
    {
        let members = members
            .into_iter()
            .map(|(member, score)| (text(member.as_ref()), score))
            .collect();
        Ok(self.store.zadd(key.as_bytes(), members)?)
    }

    /// Adds or updates every member of a score map.
    pub fn zset_add_map(&self, key: &str, scores: &HashMap<String, f64>) -> Result<usize> {
        self.zset_add_all(key, scores.iter().map(|(member, score)| (member, *score)))
    }

    pub fn zset_score(&self, key: &str, member: &str) -> Result<Option<f64>> {
        Ok(self.store.zscore(key.as_bytes(), member.as_bytes())?)
    }

    /// Zero-based rank, lowest score first.
    pub fn zset_rank(&self, key: &str, member: &str) -> Result<Option<usize>> {
        Ok(self.store.zrank(key.as_bytes(), member.as_bytes())?)
    }

    /// Members with scores from `start` to `stop` inclusive, highest score first.
    pub fn zset_reverse_range_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<(String, f64)>> {
        self.store
            .zrevrange(key.as_bytes(), start, stop)?
            .into_iter()
            .map(|(member, score)| Ok((decode(key, member)?, score)))
            .collect()
    }

    /// Members from `start` to `stop` inclusive, highest score first.
    pub fn zset_reverse_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let members = self.store.zrevrange(key.as_bytes(), start, stop)?;
        decode_all(key, members.into_iter().map(|(member, _)| member))
    }

    /// Members with `min <= score <= max`, lowest score first.
    pub fn zset_range_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<(String, f64)>> {
        self.store
            .zrange_by_score(key.as_bytes(), min, max)?
            .into_iter()
            .map(|(member, score)| Ok((decode(key, member)?, score)))
            .collect()
    }

    pub fn zset_size(&self, key: &str) -> Result<usize> {
        Ok(self.store.zcard(key.as_bytes())?)
    }
}
