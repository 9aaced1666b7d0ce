//! Ordered Selection
//!
//! Sorts a sequence by a derived key and hands back the first few elements.
//!
//! Sorting is stable and always ascending; [`OrderType::Desc`] reverses the
//! ascending result. Elements with equal keys therefore come out in reverse
//! of their input order when descending.

use super::OrderType;

/// Sorts `records` by `order_fn` in the given direction.
///
/// `order_fn` is evaluated exactly once per record.
pub fn sorted_by<T, U, I, F>(records: I, mut order_fn: F, order: OrderType) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    U: Ord,
    F: FnMut(&T) -> U,
{
    let mut keyed: Vec<(U, T)> = records
        .into_iter()
        .map(|record| (order_fn(&record), record))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut sorted: Vec<T> = keyed.into_iter().map(|(_, record)| record).collect();
    if order == OrderType::Desc {
        sorted.reverse();
    }
    sorted
}

/// Returns the first `limit` records after sorting and skipping `skip`.
///
/// The sort happens up front; skipping and bounding are lazy, so callers can
/// stop early without touching the rest.
///
/// # Example
///
/// ```
/// use rediskit::collections::{top_n, OrderType};
///
/// let scores = vec![3, 1, 4, 1, 5, 9, 2, 6];
/// let top: Vec<i32> = top_n(scores, |n| *n, OrderType::Desc, 0, 3).collect();
/// assert_eq!(top, vec![9, 6, 5]);
/// ```
pub fn top_n<T, U, I, F>(
    records: I,
    order_fn: F,
    order: OrderType,
    skip: usize,
    limit: usize,
) -> impl Iterator<Item = T>
where
    I: IntoIterator<Item = T>,
    U: Ord,
    F: FnMut(&T) -> U,
{
    sorted_by(records, order_fn, order)
        .into_iter()
        .skip(skip)
        .take(limit)
}

/// Returns the single record at position `skip` in sorted order.
pub fn limit_one<T, U, I, F>(records: I, order_fn: F, order: OrderType, skip: usize) -> Option<T>
where
    I: IntoIterator<Item = T>,
    U: Ord,
    F: FnMut(&T) -> U,
{
    top_n(records, order_fn, order, skip, 1).next()
}

/// Returns every record after the first `skip` in sorted order.
pub fn skip_sorted<T, U, I, F>(records: I, order_fn: F, order: OrderType, skip: usize) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    U: Ord,
    F: FnMut(&T) -> U,
{
    sorted_by(records, order_fn, order)
        .into_iter()
        .skip(skip)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [i32; 8] = [3, 1, 4, 1, 5, 9, 2, 6];

    #[test]
    fn test_top_n_desc() {
        let top: Vec<i32> = top_n(SAMPLE, |n| *n, OrderType::Desc, 0, 3).collect();
        assert_eq!(top, vec![9, 6, 5]);
    }

    #[test]
    fn test_top_n_asc_with_skip() {
        let top: Vec<i32> = top_n(SAMPLE, |n| *n, OrderType::Asc, 2, 3).collect();
        assert_eq!(top, vec![2, 3, 4]);
    }

    #[test]
    fn test_top_n_bounds() {
        assert_eq!(top_n(SAMPLE, |n| *n, OrderType::Asc, 0, 100).count(), SAMPLE.len());
        assert_eq!(top_n(SAMPLE, |n| *n, OrderType::Asc, 20, 3).count(), 0);
        assert_eq!(top_n(SAMPLE, |n| *n, OrderType::Asc, 0, 0).count(), 0);
        assert_eq!(top_n(Vec::<i32>::new(), |n| *n, OrderType::Desc, 0, 3).count(), 0);
    }

    #[test]
    fn test_desc_reverses_ties() {
        let items = vec![("a", 1), ("b", 2), ("c", 1), ("d", 2)];

        let asc: Vec<&str> = sorted_by(items.clone(), |i| i.1, OrderType::Asc)
            .into_iter()
            .map(|i| i.0)
            .collect();
        assert_eq!(asc, vec!["a", "c", "b", "d"]);

        let desc: Vec<&str> = sorted_by(items, |i| i.1, OrderType::Desc)
            .into_iter()
            .map(|i| i.0)
            .collect();
        assert_eq!(desc, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_limit_one() {
        assert_eq!(limit_one(SAMPLE, |n| *n, OrderType::Desc, 0), Some(9));
        assert_eq!(limit_one(SAMPLE, |n| *n, OrderType::Asc, 1), Some(1));
        assert_eq!(limit_one(SAMPLE, |n| *n, OrderType::Asc, 8), None);
    }

    #[test]
    fn test_skip_sorted() {
        assert_eq!(skip_sorted(SAMPLE, |n| *n, OrderType::Desc, 5), vec![2, 1, 1]);
        assert!(skip_sorted(SAMPLE, |n| *n, OrderType::Desc, 8).is_empty());
    }

    #[test]
    fn test_order_fn_called_once_per_record() {
        let mut calls = 0;
        let _ = sorted_by(
            SAMPLE,
            |n| {
                calls += 1;
                *n
            },
            OrderType::Asc,
        );
        assert_eq!(calls, SAMPLE.len());
    }

    #[test]
    fn test_sort_by_derived_key() {
        let words = vec!["kiwi", "fig", "banana", "apple"];
        let longest: Vec<&str> = top_n(words, |w| w.len(), OrderType::Desc, 0, 2).collect();
        assert_eq!(longest, vec!["banana", "apple"]);
    }
}
