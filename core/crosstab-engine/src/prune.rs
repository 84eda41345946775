//! FILENAME: core/crosstab-engine/src/prune.rs
//! Pruning - drops row/column filters that match no counted item.
//!
//! The filter list and its bit vectors are parallel arrays. They are compacted
//! together with two cursors: `read` walks every slot, `write` marks the end
//! of the surviving prefix. Since `write <= read` at all times, swapping the
//! survivor at `read` down to `write` never disturbs an unvisited slot, and
//! everything past `write` at the end is dropped.

use crate::axis::Axis;
use crate::bitvec::{intersection_cardinality, union, BitVector};
use crate::error::{CrossTabError, CrossTabResult};
use crate::filter::Filter;
use crate::logging::log_debug;

/// Union of the configured counters' vectors, `width` bits wide. The Total
/// counter is left out, so an item is relevant only when some configured
/// counter matches it.
pub fn configured_counter_union(
    counters: &[Filter],
    bits: &[Option<BitVector>],
    width: usize,
) -> BitVector {
    let configured = counters
        .iter()
        .zip(bits)
        .filter(|(filter, _)| !filter.is_total())
        .map(|(_, slot)| slot);
    union(width, configured)
}

/// Removes every non-Total filter whose bit vector is absent or disjoint
/// from `all_counters`, keeping `filters` and `bits` in lockstep. A Total
/// candidate stays in place with an all-zero vector.
///
/// Returns the number of removed filters. On success every remaining slot in
/// `bits` is `Some`.
pub fn prune_empty(
    axis: Axis,
    filters: &mut Vec<Filter>,
    bits: &mut Vec<Option<BitVector>>,
    all_counters: &BitVector,
) -> CrossTabResult<usize> {
    if filters.len() != bits.len() {
        return Err(CrossTabError::AxisLengthMismatch {
            axis: axis.label(),
            filters: filters.len(),
            vectors: bits.len(),
        });
    }

    let width = all_counters.len();
    let length = filters.len();
    let mut write = 0;

    for read in 0..length {
        let live = bits[read]
            .as_ref()
            .is_some_and(|b| intersection_cardinality(b, all_counters) > 0);
        if !live {
            if !filters[read].is_total() {
                log_debug!(
                    "PRUNE",
                    "{} filter id={} matches no counted item",
                    axis,
                    filters[read].id()
                );
                continue;
            }
            bits[read] = Some(BitVector::zeroed(width));
        }
        filters.swap(write, read);
        bits.swap(write, read);
        write += 1;
    }

    filters.truncate(write);
    bits.truncate(write);
    Ok(length - write)
}
