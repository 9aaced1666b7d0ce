//! Keyed Reduction
//!
//! Converts a sequence of records into a map with exactly one entry per
//! distinct key. When several records share a key, a [`TieBreak`] policy
//! applied to a caller-supplied order key picks the winner.
//!
//! ## Algorithm
//!
//! ```text
//!   records ──► key_fn ──► distinct keys == records?
//!                               │yes                     │no
//!                               ▼                        ▼
//!                 key → value_fn(record)     per key: keep best order_fn(record)
//!                 (order_fn never called)    then key → value_fn(winner)
//! ```
//!
//! Among records with equal order keys the first one encountered wins.

use super::TieBreak;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Reduces `records` into a map from `key_fn(record)` to `value_fn(record)`.
///
/// Duplicate keys are resolved by `tie_break` over `order_fn(record)`. An
/// empty input produces an empty map; callers holding an optional sequence
/// can pass `maybe_records.unwrap_or_default()`.
///
/// # Example
///
/// ```
/// use rediskit::collections::{reduce_to_map, TieBreak};
///
/// let rows = vec![(1, 5, "x"), (1, 9, "y")];
/// let max = reduce_to_map(rows.clone(), |r| r.0, |r| r.1, |r| r.2, TieBreak::Max);
/// let min = reduce_to_map(rows, |r| r.0, |r| r.1, |r| r.2, TieBreak::Min);
/// assert_eq!(max[&1], "y");
/// assert_eq!(min[&1], "x");
/// ```
pub fn reduce_to_map<T, K, U, V, I, FK, FO, FV>(
    records: I,
    mut key_fn: FK,
    mut order_fn: FO,
    mut value_fn: FV,
    tie_break: TieBreak,
) -> HashMap<K, V>
where
    I: IntoIterator<Item = T>,
    K: Eq + Hash,
    U: PartialOrd,
    FK: FnMut(&T) -> K,
    FO: FnMut(&T) -> U,
    FV: FnMut(T) -> V,
{
    let records: Vec<T> = records.into_iter().collect();
    if records.is_empty() {
        return HashMap::new();
    }

    let keys: Vec<K> = records.iter().map(&mut key_fn).collect();
    let distinct = keys.iter().collect::<HashSet<&K>>().len();

    if distinct == records.len() {
        return keys
            .into_iter()
            .zip(records)
            .map(|(key, record)| (key, value_fn(record)))
            .collect();
    }

    let mut winners: HashMap<K, (U, T)> = HashMap::with_capacity(distinct);
    for (key, record) in keys.into_iter().zip(records) {
        let order = order_fn(&record);
        match winners.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert((order, record));
            }
            Entry::Occupied(mut slot) => {
                if tie_break.prefers(&order, &slot.get().0) {
                    slot.insert((order, record));
                }
            }
        }
    }

    winners
        .into_iter()
        .map(|(key, (_, record))| (key, value_fn(record)))
        .collect()
}

/// Like [`reduce_to_map`], storing the winning record itself as the value.
pub fn reduce_records<T, K, U, I, FK, FO>(
    records: I,
    key_fn: FK,
    order_fn: FO,
    tie_break: TieBreak,
) -> HashMap<K, T>
where
    I: IntoIterator<Item = T>,
    K: Eq + Hash,
    U: PartialOrd,
    FK: FnMut(&T) -> K,
    FO: FnMut(&T) -> U,
{
    reduce_to_map(records, key_fn, order_fn, |record| record, tie_break)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        k: u32,
        order: i64,
        v: &'static str,
    }

    fn row(k: u32, order: i64, v: &'static str) -> Row {
        Row { k, order, v }
    }

    #[test]
    fn test_empty_input() {
        let result = reduce_to_map(Vec::<Row>::new(), |r| r.k, |r| r.order, |r| r.v, TieBreak::Max);
        assert!(result.is_empty());
    }

    #[test]
    fn test_absent_input_is_empty() {
        let absent: Option<Vec<Row>> = None;
        let result =
            reduce_records(absent.unwrap_or_default(), |r| r.k, |r| r.order, TieBreak::Min);
        assert!(result.is_empty());
    }

    #[test]
    fn test_distinct_keys_skip_order_fn() {
        let rows = vec![row(1, 5, "a"), row(2, 1, "b"), row(3, 7, "c")];
        let calls = Cell::new(0);

        let result = reduce_to_map(
            rows.clone(),
            |r| r.k,
            |r| {
                calls.set(calls.get() + 1);
                r.order
            },
            |r| r.v,
            TieBreak::Max,
        );

        assert_eq!(calls.get(), 0);
        assert_eq!(result.len(), rows.len());
        for r in &rows {
            assert_eq!(result[&r.k], r.v);
        }
    }

    #[test]
    fn test_duplicate_keys_max_and_min() {
        let rows = vec![row(1, 5, "x"), row(1, 9, "y")];

        let max = reduce_to_map(rows.clone(), |r| r.k, |r| r.order, |r| r.v, TieBreak::Max);
        assert_eq!(max, HashMap::from([(1, "y")]));

        let min = reduce_to_map(rows, |r| r.k, |r| r.order, |r| r.v, TieBreak::Min);
        assert_eq!(min, HashMap::from([(1, "x")]));
    }

    #[test]
    fn test_mixed_groups() {
        let rows = vec![
            row(1, 3, "a3"),
            row(2, 8, "b8"),
            row(1, 7, "a7"),
            row(3, 0, "c0"),
            row(2, 2, "b2"),
            row(1, 5, "a5"),
        ];

        let max = reduce_to_map(rows.clone(), |r| r.k, |r| r.order, |r| r.v, TieBreak::Max);
        assert_eq!(max.len(), 3);
        assert_eq!(max[&1], "a7");
        assert_eq!(max[&2], "b8");
        assert_eq!(max[&3], "c0");

        let min = reduce_to_map(rows, |r| r.k, |r| r.order, |r| r.v, TieBreak::Min);
        assert_eq!(min[&1], "a3");
        assert_eq!(min[&2], "b2");
        assert_eq!(min[&3], "c0");
    }

    #[test]
    fn test_equal_order_keys_first_wins() {
        let rows = vec![row(1, 4, "first"), row(1, 4, "second"), row(1, 1, "low")];

        let max = reduce_to_map(rows.clone(), |r| r.k, |r| r.order, |r| r.v, TieBreak::Max);
        assert_eq!(max[&1], "first");

        let rows = vec![row(1, 4, "low-first"), row(1, 4, "low-second"), row(1, 9, "high")];
        let min = reduce_to_map(rows, |r| r.k, |r| r.order, |r| r.v, TieBreak::Min);
        assert_eq!(min[&1], "low-first");
    }

    #[test]
    fn test_identity_value() {
        let rows = vec![row(1, 5, "x"), row(1, 9, "y"), row(2, 0, "z")];
        let result = reduce_records(rows, |r| r.k, |r| r.order, TieBreak::Max);
        assert_eq!(result[&1], row(1, 9, "y"));
        assert_eq!(result[&2], row(2, 0, "z"));
    }

    #[test]
    fn test_partial_order_keys() {
        let rows = vec![(1, 2.5_f64), (1, f64::NAN), (1, 4.0)];
        let result = reduce_to_map(rows, |r| r.0, |r| r.1, |r| r.1, TieBreak::Max);
        assert_eq!(result[&1], 4.0);

        // A NaN incumbent is never displaced
        let rows = vec![(1, f64::NAN, "nan"), (1, 4.0, "four")];
        let result = reduce_to_map(rows, |r| r.0, |r| r.1, |r| r.2, TieBreak::Max);
        assert_eq!(result[&1], "nan");
    }

    #[test]
    fn test_reduction_is_idempotent() {
        let rows = vec![
            row(1, 3, "a3"),
            row(2, 8, "b8"),
            row(1, 7, "a7"),
            row(2, 2, "b2"),
        ];
        let once = reduce_to_map(rows, |r| r.k, |r| r.order, |r| r.v, TieBreak::Max);

        let projected: Vec<(u32, &'static str)> = once.iter().map(|(k, v)| (*k, *v)).collect();
        let twice = reduce_to_map(projected, |p| p.0, |p| p.1, |p| p.1, TieBreak::Max);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_key_fn_called_once_per_record() {
        let rows = vec![row(1, 1, "a"), row(1, 2, "b"), row(2, 3, "c")];
        let calls = Cell::new(0);

        reduce_to_map(
            rows,
            |r| {
                calls.set(calls.get() + 1);
                r.k
            },
            |r| r.order,
            |r| r.v,
            TieBreak::Max,
        );

        assert_eq!(calls.get(), 3);
    }
}
