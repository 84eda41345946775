//! FILENAME: core/crosstab-engine/src/builder.rs
//! Bit vector builder - evaluates one axis's filters over the item snapshot.
//!
//! Work is split into bounded units. Each unit runs inside one store read
//! unit and processes items until the axis is exhausted, the time budget is
//! spent, or cancellation is observed. The builder is moved into the
//! blocking task for a unit and handed back afterwards, so its progress
//! survives between units.

use std::sync::Arc;
use std::time::{Duration, Instant};

use item_store::{ItemId, ItemReader};

use crate::axis::Axis;
use crate::bitvec::BitVector;
use crate::engine::CancelFlag;
use crate::filter::{AttributeCache, Filter};

pub struct BitVectorBuilder {
    axis: Axis,
    items: Arc<[ItemId]>,
    filters: Arc<[Filter]>,
    /// One slot per filter; `None` until the first matching item.
    bits: Vec<Option<BitVector>>,
    /// Snapshot position of the next item to evaluate.
    current: usize,
    cache: AttributeCache,
    units: usize,
}

impl BitVectorBuilder {
    pub fn new(axis: Axis, items: Arc<[ItemId]>, filters: Arc<[Filter]>) -> Self {
        let bits = vec![None; filters.len()];
        BitVectorBuilder {
            axis,
            items,
            filters,
            bits,
            current: 0,
            cache: AttributeCache::new(),
            units: 0,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.items.len()
    }

    /// True while there are items left and nobody asked us to stop.
    pub fn should_perform(&self, cancel: &CancelFlag) -> bool {
        !cancel.is_cancelled() && !self.is_finished()
    }

    /// Number of items evaluated so far.
    pub fn progress(&self) -> usize {
        self.current
    }

    /// Number of units run so far.
    pub fn units(&self) -> usize {
        self.units
    }

    /// Runs one bounded unit and returns how many items it evaluated.
    ///
    /// At least one item is processed per unit when any remain, so a budget
    /// shorter than a single evaluation still makes progress.
    pub fn run_unit(
        &mut self,
        reader: &dyn ItemReader,
        budget: Duration,
        cancel: &CancelFlag,
    ) -> usize {
        let deadline = Instant::now() + budget;
        let width = self.items.len();
        let start = self.current;
        self.units += 1;

        while self.should_perform(cancel) {
            self.cache.clear();
            let item = self.items[self.current];
            for (slot, filter) in self.bits.iter_mut().zip(self.filters.iter()) {
                if filter.accepts(item, reader, &mut self.cache) {
                    slot.get_or_insert_with(|| BitVector::zeroed(width)).set(self.current);
                }
            }
            self.current += 1;

            if Instant::now() >= deadline {
                break;
            }
        }
        self.current - start
    }

    pub fn into_bits(self) -> Vec<Option<BitVector>> {
        self.bits
    }
}
