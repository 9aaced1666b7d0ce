//! Stored values and their expiry metadata.

use bytes::Bytes;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// A value of one of the supported Redis data types.
#[derive(Debug, Clone)]
pub enum Value {
    String(Bytes),
    List(VecDeque<Bytes>),
    Hash(HashMap<Bytes, Bytes>),
    Set(HashSet<Bytes>),
    SortedSet(SortedSet),
}

impl Value {
    /// Redis type name, as reported by `TYPE`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Hash(_) => "hash",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "zset",
        }
    }

    /// Returns `true` for a collection with no elements. Strings are never empty here.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Value::String(_) => false,
            Value::List(list) => list.is_empty(),
            Value::Hash(hash) => hash.is_empty(),
            Value::Set(set) => set.is_empty(),
            Value::SortedSet(zset) => zset.is_empty(),
        }
    }

    pub(crate) fn empty_list() -> Self {
        Value::List(VecDeque::new())
    }

    pub(crate) fn empty_hash() -> Self {
        Value::Hash(HashMap::new())
    }

    pub(crate) fn empty_set() -> Self {
        Value::Set(HashSet::new())
    }

    pub(crate) fn empty_sorted_set() -> Self {
        Value::SortedSet(SortedSet::default())
    }

    pub(crate) fn as_list(&self) -> Option<&VecDeque<Bytes>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub(crate) fn as_hash(&self) -> Option<&HashMap<Bytes, Bytes>> {
        match self {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    pub(crate) fn as_set(&self) -> Option<&HashSet<Bytes>> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub(crate) fn as_sorted_set(&self) -> Option<&SortedSet> {
        match self {
            Value::SortedSet(zset) => Some(zset),
            _ => None,
        }
    }

    pub(crate) fn as_list_mut(&mut self) -> Option<&mut VecDeque<Bytes>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub(crate) fn as_hash_mut(&mut self) -> Option<&mut HashMap<Bytes, Bytes>> {
        match self {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    pub(crate) fn as_set_mut(&mut self) -> Option<&mut HashSet<Bytes>> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub(crate) fn as_sorted_set_mut(&mut self) -> Option<&mut SortedSet> {
        match self {
            Value::SortedSet(zset) => Some(zset),
            _ => None,
        }
    }
}

/// A stored value with optional expiry time.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored value
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates a new entry that expires after `ttl`.
    pub fn with_ttl(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }

    /// Remaining lifetime, or `None` if the entry never expires.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }
}

/// Members with floating-point scores, ordered by `(score, member)`.
///
/// Scores live in a hash map; ordered views are computed on demand.
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    scores: HashMap<Bytes, f64>,
}

impl SortedSet {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Inserts or updates a member. Returns `true` if the member is new.
    pub fn insert(&mut self, member: Bytes, score: f64) -> bool {
        self.scores.insert(member, score).is_none()
    }

    /// Adds `delta` to a member's score (missing members start at `0`).
    ///
    /// Returns `None`, leaving the set untouched, if the result would be NaN.
    pub fn increment(&mut self, member: Bytes, delta: f64) -> Option<f64> {
        let current = self.scores.get(&member).copied().unwrap_or(0.0);
        let next = current + delta;
        if next.is_nan() {
            return None;
        }
        self.scores.insert(member, next);
        Some(next)
    }

    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// Members in ascending `(score, member)` order.
    pub fn ascending(&self) -> Vec<(Bytes, f64)> {
        let mut members: Vec<(Bytes, f64)> = self
            .scores
            .iter()
            .map(|(member, score)| (member.clone(), *score))
            .collect();
        members.sort_by(compare_scored);
        members
    }

    /// Zero-based rank in ascending order.
    pub fn rank(&self, member: &[u8]) -> Option<usize> {
        let score = self.score(member)?;
        let ahead = self
            .scores
            .iter()
            .filter(|&(m, s)| {
                s.total_cmp(&score).then_with(|| m[..].cmp(member)) == Ordering::Less
            })
            .count();
        Some(ahead)
    }
}

fn compare_scored(a: &(Bytes, f64), b: &(Bytes, f64)) -> Ordering {
    a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0))
}
