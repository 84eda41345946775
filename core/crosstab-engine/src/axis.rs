//! FILENAME: core/crosstab-engine/src/axis.rs
//! Axis lists - the ordered filters configured for rows, columns or counters.

use std::fmt;
use std::ops::Index;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::logging::log_warn;

/// One of the three axes of the summary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Rows,
    Columns,
    Counters,
}

impl Axis {
    pub fn label(self) -> &'static str {
        match self {
            Axis::Rows => "row",
            Axis::Columns => "column",
            Axis::Counters => "counter",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The user's filters for one axis with the Total sentinel appended.
///
/// Ids are unique within the list and Total is always the last entry; both
/// are enforced at construction by dropping offending configured entries.
#[derive(Debug, Clone)]
pub struct AxisList {
    filters: Vec<Filter>,
}

impl AxisList {
    pub fn new(axis: Axis, configured: impl IntoIterator<Item = Filter>) -> Self {
        let mut seen = FxHashSet::default();
        let mut filters = Vec::new();
        for filter in configured {
            if filter.is_total() {
                continue;
            }
            if !seen.insert(filter.id().to_string()) {
                log_warn!("AXIS", "dropping duplicate {} filter id={}", axis, filter.id());
                continue;
            }
            filters.push(filter);
        }
        filters.push(Filter::total());
        AxisList { filters }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn into_filters(self) -> Vec<Filter> {
        self.filters
    }

    /// Number of filters including Total.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Always false; Total is never absent.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Number of user-configured filters (Total excluded).
    pub fn configured_len(&self) -> usize {
        self.filters.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Filter> {
        self.filters.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.filters.iter().position(|f| f.id() == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.filters.iter()
    }
}

impl Index<usize> for AxisList {
    type Output = Filter;

    fn index(&self, index: usize) -> &Filter {
        &self.filters[index]
    }
}

impl<'a> IntoIterator for &'a AxisList {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}
