//! FILENAME: core/crosstab-engine/src/filter.rs
//! Filter - a named predicate placed on one axis of the summary table.
//!
//! A filter is an immutable snapshot shared behind an `Arc`; "editing" one
//! (renaming, swapping its predicate) produces a new snapshot with the same
//! id, so a computation that already holds the old snapshot is unaffected.
//! Identity is the id string, never the pointer.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use item_store::{
    evaluate_predicate, AttrValue, AttributeId, ItemId, ItemReader, Predicate, StoreError, ValueKey,
};
use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::logging::log_warn;

/// Id of the Total sentinel.
pub const TOTAL_ID: &str = "#total";

const UNNAMED: &str = "<Unnamed>";

static TOTAL: Lazy<Filter> = Lazy::new(|| Filter::general(TOTAL_ID, "Total", Predicate::True));

// ============================================================================
// MATCHING MODES
// ============================================================================

/// How a filter decides whether an item matches.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Membership of one attribute's value in an accepted set. Reads go
    /// through the per-item `AttributeCache`.
    Attribute {
        attribute: AttributeId,
        accepted: FxHashSet<ValueKey>,
    },
    /// A general compiled predicate evaluated against the full reader.
    General(Predicate),
    /// The predicate could not be built (e.g. it names something that no
    /// longer exists). Never matches.
    Unresolved,
}

/// Attribute values read for the current item, shared by every filter on an
/// axis that tests the same attribute. Must be cleared between items.
#[derive(Debug, Default)]
pub struct AttributeCache {
    values: FxHashMap<AttributeId, Result<AttrValue, StoreError>>,
}

impl AttributeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn get_or_read(
        &mut self,
        item: ItemId,
        attribute: AttributeId,
        reader: &dyn ItemReader,
    ) -> Result<&AttrValue, StoreError> {
        self.values
            .entry(attribute)
            .or_insert_with(|| reader.read_attribute(item, attribute))
            .as_ref()
            .map_err(Clone::clone)
    }
}

// ============================================================================
// FILTER
// ============================================================================

#[derive(Debug)]
struct FilterInner {
    id: String,
    name: String,
    matcher: Matcher,
}

/// A predicate with a stable id. Cheap to clone.
#[derive(Clone)]
pub struct Filter {
    inner: Arc<FilterInner>,
}

impl Filter {
    fn from_parts(id: String, name: String, matcher: Matcher) -> Self {
        Filter {
            inner: Arc::new(FilterInner { id, name, matcher }),
        }
    }

    /// An attribute-membership filter.
    pub fn attribute(
        id: impl Into<String>,
        name: impl Into<String>,
        attribute: AttributeId,
        accepted: impl IntoIterator<Item = ValueKey>,
    ) -> Self {
        Self::from_parts(
            id.into(),
            name.into(),
            Matcher::Attribute {
                attribute,
                accepted: accepted.into_iter().collect(),
            },
        )
    }

    /// A general-mode filter over an arbitrary predicate.
    pub fn general(id: impl Into<String>, name: impl Into<String>, predicate: Predicate) -> Self {
        Self::from_parts(id.into(), name.into(), Matcher::General(predicate))
    }

    /// A filter whose predicate failed to resolve. It keeps its slot on the
    /// axis but counts nothing.
    pub fn unresolved(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_parts(id.into(), name.into(), Matcher::Unresolved)
    }

    /// The shared always-true sentinel appended to every axis.
    pub fn total() -> Self {
        TOTAL.clone()
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Name for display; empty names show as `<Unnamed>`.
    pub fn display_name(&self) -> &str {
        if self.inner.name.is_empty() {
            UNNAMED
        } else {
            &self.inner.name
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.inner.matcher
    }

    /// The attribute this filter tests, if it is an attribute-mode filter.
    pub fn attribute_id(&self) -> Option<AttributeId> {
        match &self.inner.matcher {
            Matcher::Attribute { attribute, .. } => Some(*attribute),
            _ => None,
        }
    }

    pub fn is_total(&self) -> bool {
        self.inner.id == TOTAL_ID
    }

    /// Same id and predicate, new display name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self::from_parts(self.inner.id.clone(), name.into(), self.inner.matcher.clone())
    }

    /// Same id and name, new predicate body.
    pub fn with_predicate(&self, predicate: Predicate) -> Self {
        Self::from_parts(
            self.inner.id.clone(),
            self.inner.name.clone(),
            Matcher::General(predicate),
        )
    }

    /// Tests `item`. Evaluation failures are logged and count as a non-match.
    pub fn accepts(
        &self,
        item: ItemId,
        reader: &dyn ItemReader,
        cache: &mut AttributeCache,
    ) -> bool {
        let outcome = match &self.inner.matcher {
            Matcher::Attribute { attribute, accepted } => cache
                .get_or_read(item, *attribute, reader)
                .map(|value| value_accepted(accepted, value)),
            Matcher::General(predicate) => evaluate_predicate(reader, item, predicate),
            Matcher::Unresolved => Ok(false),
        };
        match outcome {
            Ok(accepted) => accepted,
            Err(e) => {
                log_warn!(
                    "FILTER",
                    "filter={} item={} treated as non-match: {}",
                    self.id(),
                    item,
                    e
                );
                false
            }
        }
    }

    /// Attribute-mode test against an already read value. Always false for
    /// filters in other modes.
    pub fn accepts_value(&self, value: &AttrValue) -> bool {
        match &self.inner.matcher {
            Matcher::Attribute { accepted, .. } => value_accepted(accepted, value),
            _ => false,
        }
    }
}

fn value_accepted(accepted: &FxHashSet<ValueKey>, value: &AttrValue) -> bool {
    value.any_key(|key| accepted.contains(&key))
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.id == other.inner.id
    }
}

impl Eq for Filter {}

impl Hash for Filter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

/// Finds the filter with `id` in `filters`.
pub fn find_by_id<'a>(
    filters: impl IntoIterator<Item = &'a Filter>,
    id: &str,
) -> Option<&'a Filter> {
    filters.into_iter().find(|f| f.id() == id)
}

/// Id equality over optional filters; two absent filters are equal.
pub fn equal_ids(a: Option<&Filter>, b: Option<&Filter>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
