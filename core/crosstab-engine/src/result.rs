//! FILENAME: core/crosstab-engine/src/result.rs
//! CrossTab - the immutable product of one computation.

use serde::Serialize;

use crate::axis::{Axis, AxisList};
use crate::error::{CrossTabError, CrossTabResult};
use crate::filter::Filter;
use crate::matrix::CountMatrix;

/// Statistics about how a result was produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CountStats {
    /// Items in the base view snapshot.
    pub item_count: usize,
    pub pruned_rows: usize,
    pub pruned_columns: usize,
    /// Number of bounded read units across all three axes.
    pub read_units: usize,
    pub build_ms: f64,
    pub compute_ms: f64,
}

/// Final axis lists plus the count matrix.
///
/// A result without a matrix is "not available": it still lists the
/// configured axes so a view can render headers.
#[derive(Debug, Clone)]
pub struct CrossTab {
    rows: Vec<Filter>,
    columns: Vec<Filter>,
    counters: Vec<Filter>,
    matrix: Option<CountMatrix>,
    stats: CountStats,
}

impl CrossTab {
    pub(crate) fn counted(
        rows: Vec<Filter>,
        columns: Vec<Filter>,
        counters: Vec<Filter>,
        matrix: CountMatrix,
        stats: CountStats,
    ) -> Self {
        CrossTab {
            rows,
            columns,
            counters,
            matrix: Some(matrix),
            stats,
        }
    }

    /// A result with no counts, used when no counters are configured.
    pub fn unavailable(rows: &AxisList, columns: &AxisList, counters: &AxisList) -> Self {
        CrossTab {
            rows: rows.filters().to_vec(),
            columns: columns.filters().to_vec(),
            counters: counters.filters().to_vec(),
            matrix: None,
            stats: CountStats::default(),
        }
    }

    /// Assembles a result from externally computed counts. The matrix shape
    /// must match the axis lengths.
    pub fn from_matrix(
        rows: Vec<Filter>,
        columns: Vec<Filter>,
        counters: Vec<Filter>,
        matrix: CountMatrix,
    ) -> CrossTabResult<Self> {
        let (c, r, k) = matrix.dims();
        for (axis, filters, vectors) in [
            (Axis::Counters, counters.len(), c),
            (Axis::Rows, rows.len(), r),
            (Axis::Columns, columns.len(), k),
        ] {
            if filters != vectors {
                return Err(CrossTabError::AxisLengthMismatch {
                    axis: axis.label(),
                    filters,
                    vectors,
                });
            }
        }
        Ok(Self::counted(rows, columns, counters, matrix, CountStats::default()))
    }

    pub fn rows(&self) -> &[Filter] {
        &self.rows
    }

    pub fn columns(&self) -> &[Filter] {
        &self.columns
    }

    pub fn counters(&self) -> &[Filter] {
        &self.counters
    }

    pub fn axis(&self, axis: Axis) -> &[Filter] {
        match axis {
            Axis::Rows => &self.rows,
            Axis::Columns => &self.columns,
            Axis::Counters => &self.counters,
        }
    }

    pub fn is_data_available(&self) -> bool {
        self.matrix.is_some()
    }

    /// Count for `(counter, row, column)`; `None` when no matrix was computed
    /// or an index is out of range.
    pub fn get_cell(&self, counter: usize, row: usize, column: usize) -> Option<u32> {
        self.matrix.as_ref()?.get(counter, row, column)
    }

    pub fn matrix(&self) -> Option<&CountMatrix> {
        self.matrix.as_ref()
    }

    pub fn stats(&self) -> &CountStats {
        &self.stats
    }
}
