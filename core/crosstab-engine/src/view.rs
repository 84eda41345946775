//! FILENAME: core/crosstab-engine/src/view.rs
//! Table views - unsorted or permuted presentations of a CrossTab.
//!
//! Views never touch the underlying result. A sorted view holds the base
//! table plus optional row/column permutations, and re-sorting always starts
//! from the base, never from a previous ordering.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::filter::Filter;
use crate::logging::log_debug;
use crate::result::CrossTab;
use crate::sort::{sorting_permutation, SortDirection};

#[derive(Debug, Clone)]
pub struct SortedCrossTab {
    base: Arc<CrossTab>,
    row_order: Option<Arc<[usize]>>,
    column_order: Option<Arc<[usize]>>,
}

#[derive(Debug, Clone)]
pub enum TableView {
    Unsorted(Arc<CrossTab>),
    Sorted(SortedCrossTab),
}

fn map_index(order: Option<&[usize]>, display: usize) -> Option<usize> {
    match order {
        Some(order) => order.get(display).copied(),
        None => Some(display),
    }
}

impl TableView {
    pub fn new(base: Arc<CrossTab>) -> Self {
        TableView::Unsorted(base)
    }

    pub fn base(&self) -> &Arc<CrossTab> {
        match self {
            TableView::Unsorted(base) => base,
            TableView::Sorted(sorted) => &sorted.base,
        }
    }

    pub fn is_sorted(&self) -> bool {
        matches!(self, TableView::Sorted(_))
    }

    fn order(&self, axis: Axis) -> Option<&[usize]> {
        match (self, axis) {
            (TableView::Sorted(s), Axis::Rows) => s.row_order.as_deref(),
            (TableView::Sorted(s), Axis::Columns) => s.column_order.as_deref(),
            _ => None,
        }
    }

    /// Orders rows by their counts in column `column_index` and columns by
    /// their counts in row `row_index`, both under counter `counter_index`.
    /// A zero direction or an invalid index leaves that axis unsorted.
    pub fn sort(
        &self,
        column_index: usize,
        column_direction: i32,
        row_index: usize,
        row_direction: i32,
        counter_index: usize,
    ) -> TableView {
        let base = self.base();
        let row_order = sorting_permutation(
            base,
            Axis::Rows,
            counter_index,
            column_index,
            SortDirection::from_sign(column_direction),
        );
        let column_order = sorting_permutation(
            base,
            Axis::Columns,
            counter_index,
            row_index,
            SortDirection::from_sign(row_direction),
        );

        log_debug!(
            "SORT",
            "counter={} rows by column {} ({}) -> {}, columns by row {} ({}) -> {}",
            counter_index,
            column_index,
            column_direction,
            row_order.is_some(),
            row_index,
            row_direction,
            column_order.is_some()
        );

        if row_order.is_none() && column_order.is_none() {
            return TableView::Unsorted(Arc::clone(base));
        }
        TableView::Sorted(SortedCrossTab {
            base: Arc::clone(base),
            row_order: row_order.map(Into::into),
            column_order: column_order.map(Into::into),
        })
    }

    /// Drops any ordering.
    pub fn unsorted(&self) -> TableView {
        TableView::Unsorted(Arc::clone(self.base()))
    }

    pub fn row_count(&self) -> usize {
        self.base().rows().len()
    }

    pub fn column_count(&self) -> usize {
        self.base().columns().len()
    }

    pub fn counters(&self) -> &[Filter] {
        self.base().counters()
    }

    /// Row at display position `display`.
    pub fn row(&self, display: usize) -> Option<&Filter> {
        self.base().rows().get(map_index(self.order(Axis::Rows), display)?)
    }

    pub fn column(&self, display: usize) -> Option<&Filter> {
        self.base().columns().get(map_index(self.order(Axis::Columns), display)?)
    }

    /// Rows in display order.
    pub fn rows(&self) -> Vec<&Filter> {
        (0..self.row_count()).filter_map(|i| self.row(i)).collect()
    }

    pub fn columns(&self) -> Vec<&Filter> {
        (0..self.column_count()).filter_map(|i| self.column(i)).collect()
    }

    /// Cell at display coordinates.
    pub fn get_cell(&self, counter: usize, row: usize, column: usize) -> Option<u32> {
        let row = map_index(self.order(Axis::Rows), row)?;
        let column = map_index(self.order(Axis::Columns), column)?;
        self.base().get_cell(counter, row, column)
    }

    pub fn is_data_available(&self) -> bool {
        self.base().is_data_available()
    }

    /// Serializable copy of the grid in display order.
    pub fn snapshot(&self) -> GridSnapshot {
        let entry = |f: &Filter| AxisEntry {
            id: f.id().to_string(),
            name: f.display_name().to_string(),
            is_total: f.is_total(),
        };
        let cells = (0..self.counters().len())
            .map(|c| {
                (0..self.row_count())
                    .map(|r| (0..self.column_count()).map(|k| self.get_cell(c, r, k)).collect())
                    .collect()
            })
            .collect();

        GridSnapshot {
            rows: self.rows().into_iter().map(entry).collect(),
            columns: self.columns().into_iter().map(entry).collect(),
            counters: self.counters().iter().map(entry).collect(),
            data_available: self.is_data_available(),
            cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisEntry {
    pub id: String,
    pub name: String,
    pub is_total: bool,
}

/// A grid as a presentation layer receives it. `cells[c][r][k]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub rows: Vec<AxisEntry>,
    pub columns: Vec<AxisEntry>,
    pub counters: Vec<AxisEntry>,
    pub data_available: bool,
    pub cells: Vec<Vec<Vec<Option<u32>>>>,
}
