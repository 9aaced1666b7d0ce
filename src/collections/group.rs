//! Grouping
//!
//! Multi-valued counterpart of keyed reduction: every record is kept, bucketed
//! under its key in input order.

use std::collections::HashMap;
use std::hash::Hash;

/// Groups `records` by `key_fn`, preserving input order within each group.
pub fn group_by<T, K, I, F>(records: I, mut key_fn: F) -> HashMap<K, Vec<T>>
where
    I: IntoIterator<Item = T>,
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut groups: HashMap<K, Vec<T>> = HashMap::new();
    for record in records {
        groups.entry(key_fn(&record)).or_default().push(record);
    }
    groups
}

/// Groups `records` by `key_fn` and keeps `value_fn(record)` in each group.
pub fn group_by_mapping<T, K, V, I, FK, FV>(
    records: I,
    mut key_fn: FK,
    mut value_fn: FV,
) -> HashMap<K, Vec<V>>
where
    I: IntoIterator<Item = T>,
    K: Eq + Hash,
    FK: FnMut(&T) -> K,
    FV: FnMut(T) -> V,
{
    let mut groups: HashMap<K, Vec<V>> = HashMap::new();
    for record in records {
        let key = key_fn(&record);
        groups.entry(key).or_default().push(value_fn(record));
    }
    groups
}
