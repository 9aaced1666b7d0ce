//! Collection Utilities
//!
//! Pure helpers over in-memory sequences: keyed reduction into maps, ordered
//! top-N selection, grouping, and simple list/set transforms.
//!
//! Every function takes its input by value (anything `IntoIterator`), owns its
//! working structures, and returns a fresh collection. Nothing here is shared
//! between calls, so concurrent use on independent inputs needs no locking.
//!
//! ## Example
//!
//! ```
//! use rediskit::collections::{reduce_to_map, top_n, OrderType, TieBreak};
//!
//! // Keep the newest version of each document
//! let versions = vec![("readme", 1, "v1"), ("readme", 3, "v3"), ("license", 1, "mit")];
//! let latest = reduce_to_map(versions, |r| r.0, |r| r.1, |r| r.2, TieBreak::Max);
//! assert_eq!(latest["readme"], "v3");
//!
//! let scores = vec![3, 1, 4, 1, 5, 9, 2, 6];
//! let top: Vec<i32> = top_n(scores, |n| *n, OrderType::Desc, 0, 3).collect();
//! assert_eq!(top, vec![9, 6, 5]);
//! ```

pub mod group;
pub mod order;
pub mod reduce;
pub mod transform;

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

pub use group::{group_by, group_by_mapping};
pub use order::{limit_one, skip_sorted, sorted_by, top_n};
pub use reduce::{reduce_records, reduce_to_map};
pub use transform::{filter_list, filter_set, limit_list, limit_set, map_list, map_set};

/// Which record wins when several records share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TieBreak {
    /// Keep the record with the greatest order key
    #[default]
    Max,
    /// Keep the record with the least order key
    Min,
}

impl TieBreak {
    /// Returns `true` if `candidate` should replace `incumbent`.
    ///
    /// Only a strictly better candidate wins, so among equal order keys the
    /// first record encountered is kept.
    ///
    /// Incomparable keys (such as `f64::NAN`) never win, in either direction:
    /// a `NaN` incumbent is never displaced, and a `NaN` candidate never
    /// displaces anything. With such keys the result depends on input order,
    /// so map floats to a totally ordered key first when that matters.
    #[inline]
    pub fn prefers<U: PartialOrd>(self, candidate: &U, incumbent: &U) -> bool {
        match self {
            TieBreak::Max => candidate > incumbent,
            TieBreak::Min => candidate < incumbent,
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TieBreak::Max => f.write_str("max"),
            TieBreak::Min => f.write_str("min"),
        }
    }
}

impl FromStr for TieBreak {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(TieBreak::Max),
            "min" => Ok(TieBreak::Min),
            _ => Err(Error::UnknownPolicy {
                kind: "tie-break",
                value: s.to_string(),
            }),
        }
    }
}

/// Sort direction for the ordered selection helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderType {
    /// Greatest first
    #[default]
    Desc,
    /// Least first
    Asc,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Desc => f.write_str("desc"),
            OrderType::Asc => f.write_str("asc"),
        }
    }
}

impl FromStr for OrderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desc" => Ok(OrderType::Desc),
            "asc" => Ok(OrderType::Asc),
            _ => Err(Error::UnknownPolicy {
                kind: "order",
                value: s.to_string(),
            }),
        }
    }
}
