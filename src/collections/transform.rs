//! List and set transforms.

use std::collections::HashSet;
use std::hash::Hash;

/// Maps `f` over `records` into a `Vec`.
pub fn map_list<T, C, I, F>(records: I, f: F) -> Vec<C>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> C,
{
    records.into_iter().map(f).collect()
}

/// Maps `f` over `records` into a `HashSet`, collapsing equal results.
pub fn map_set<T, C, I, F>(records: I, f: F) -> HashSet<C>
where
    I: IntoIterator<Item = T>,
    C: Eq + Hash,
    F: FnMut(T) -> C,
{
    records.into_iter().map(f).collect()
}

/// Keeps the records matching `predicate`, in order.
pub fn filter_list<T, I, P>(records: I, predicate: P) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    P: FnMut(&T) -> bool,
{
    records.into_iter().filter(predicate).collect()
}

/// Keeps the records matching `predicate` as a set.
pub fn filter_set<T, I, P>(records: I, predicate: P) -> HashSet<T>
where
    I: IntoIterator<Item = T>,
    T: Eq + Hash,
    P: FnMut(&T) -> bool,
{
    records.into_iter().filter(predicate).collect()
}

/// Keeps at most `limit` records after skipping `skip`, in input order.
///
/// Use [`top_n`](super::top_n) to page through records by an order key.
pub fn limit_list<T, I>(records: I, skip: usize, limit: usize) -> Vec<T>
where
    I: IntoIterator<Item = T>,
{
    records.into_iter().skip(skip).take(limit).collect()
}

/// Collects at most `limit` records after skipping `skip`, without sorting.
pub fn limit_set<T, I>(records: I, skip: usize, limit: usize) -> HashSet<T>
where
    I: IntoIterator<Item = T>,
    T: Eq + Hash,
{
    records.into_iter().skip(skip).take(limit).collect()
}
