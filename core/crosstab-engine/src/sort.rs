//! FILENAME: core/crosstab-engine/src/sort.rs
//! Sorting permutations over a computed CrossTab.
//!
//! A permutation maps display position to underlying index. Only the
//! configured entries move; the last slot (Total) always stays last. Sorting
//! is stable, so entries with equal counts keep their configured order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::result::CrossTab;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    None,
    Ascending,
    Descending,
}

impl SortDirection {
    /// Positive is ascending, negative is descending, zero is unsorted.
    pub fn from_sign(sign: i32) -> Self {
        match sign.signum() {
            1 => SortDirection::Ascending,
            -1 => SortDirection::Descending,
            _ => SortDirection::None,
        }
    }

    pub fn sign(self) -> i32 {
        match self {
            SortDirection::None => 0,
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Descending => ordering.reverse(),
            _ => ordering,
        }
    }
}

/// Orders the entries of `axis` by their counts under `counter`.
///
/// For `Axis::Rows` the key of row `i` is the cell at column `sort_index`;
/// for `Axis::Columns` the key of column `k` is the cell at row `sort_index`.
///
/// Returns `None` when there is nothing to sort: no direction, fewer than two
/// entries, no counts, the counters axis, or an out-of-range index.
pub fn sorting_permutation(
    table: &CrossTab,
    axis: Axis,
    counter: usize,
    sort_index: usize,
    direction: SortDirection,
) -> Option<Vec<usize>> {
    if direction == SortDirection::None || !table.is_data_available() {
        return None;
    }
    let length = table.axis(axis).len();
    if length <= 1 || counter >= table.counters().len() {
        return None;
    }

    let key = |i: usize| match axis {
        Axis::Rows => table.get_cell(counter, i, sort_index),
        Axis::Columns => table.get_cell(counter, sort_index, i),
        Axis::Counters => None,
    };
    let other = match axis {
        Axis::Rows => table.columns().len(),
        Axis::Columns => table.rows().len(),
        Axis::Counters => return None,
    };
    if sort_index >= other {
        return None;
    }

    let mut permutation: Vec<usize> = (0..length - 1).collect();
    permutation.sort_by(|&a, &b| direction.apply(key(a).cmp(&key(b))));
    permutation.push(length - 1);
    Some(permutation)
}
