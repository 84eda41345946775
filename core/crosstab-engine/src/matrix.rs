//! FILENAME: core/crosstab-engine/src/matrix.rs
//! Count matrix - `|counter ∩ row ∩ column|` for every triple of axis entries.
//!
//! Layout is dense, counter-major: cell `(c, r, k)` lives at
//! `(c * rows + r) * columns + k`.

use serde::Serialize;

use crate::bitvec::{intersection_cardinality, BitVector};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountMatrix {
    counters: usize,
    rows: usize,
    columns: usize,
    cells: Vec<u32>,
}

impl CountMatrix {
    /// Fills the matrix from per-axis bit vectors. An absent vector counts as
    /// empty, which zeroes its whole slice of the matrix.
    ///
    /// Loops nest counter, row, column. `counter & row` is materialized once
    /// per pair so the inner loop is a two-way popcount.
    pub fn compute(
        counter_bits: &[Option<BitVector>],
        row_bits: &[Option<BitVector>],
        column_bits: &[Option<BitVector>],
    ) -> Self {
        let (counters, rows, columns) = (counter_bits.len(), row_bits.len(), column_bits.len());
        let mut cells = vec![0u32; counters * rows * columns];

        let width = counter_bits
            .iter()
            .chain(row_bits)
            .chain(column_bits)
            .flatten()
            .map(BitVector::len)
            .next()
            .unwrap_or(0);
        let mut pair = BitVector::zeroed(width);

        for (c, counter) in counter_bits.iter().enumerate() {
            let Some(counter) = counter else { continue };
            for (r, row) in row_bits.iter().enumerate() {
                let Some(row) = row else { continue };
                pair.assign_and(counter, row);
                if pair.cardinality() == 0 {
                    continue;
                }
                let base = (c * rows + r) * columns;
                for (k, column) in column_bits.iter().enumerate() {
                    if let Some(column) = column {
                        cells[base + k] = intersection_cardinality(&pair, column) as u32;
                    }
                }
            }
        }

        CountMatrix { counters, rows, columns, cells }
    }

    /// Wraps precomputed cells. Returns `None` when `cells` does not have
    /// exactly `counters * rows * columns` entries.
    pub fn from_cells(
        counters: usize,
        rows: usize,
        columns: usize,
        cells: Vec<u32>,
    ) -> Option<Self> {
        (cells.len() == counters * rows * columns).then_some(CountMatrix {
            counters,
            rows,
            columns,
            cells,
        })
    }

    /// `(counters, rows, columns)`
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.counters, self.rows, self.columns)
    }

    pub fn get(&self, counter: usize, row: usize, column: usize) -> Option<u32> {
        if counter >= self.counters || row >= self.rows || column >= self.columns {
            return None;
        }
        self.cells.get((counter * self.rows + row) * self.columns + column).copied()
    }

    pub fn cells(&self) -> &[u32] {
        &self.cells
    }
}
