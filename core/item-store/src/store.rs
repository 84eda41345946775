//! FILENAME: core/item-store/src/store.rs
//! PURPOSE: The read-only boundary the counting engine consumes.
//! CONTEXT: A store is shared with other consumers. Every read happens inside
//! a `read_unit`, which is expected to be short; callers that need to scan
//! many items split the scan across several units.

use thiserror::Error;

use crate::predicate::Predicate;
use crate::value::{AttrValue, AttributeId, ItemId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("unknown attribute: {0}")]
    UnknownAttribute(AttributeId),

    #[error("predicate evaluation failed: {0}")]
    Evaluation(String),
}

/// The set of items a table counts over, as the caller describes it.
#[derive(Debug, Clone)]
pub enum BaseView {
    All,
    Matching(Predicate),
    /// A view defined elsewhere (saved query, navigation node). It may not be
    /// resolvable yet, e.g. while the store is still loading.
    Named(String),
}

/// A base view resolved into a predicate the store can run.
#[derive(Debug, Clone)]
pub struct ConcreteView {
    predicate: Predicate,
}

impl ConcreteView {
    pub fn new(predicate: Predicate) -> Self {
        ConcreteView { predicate }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

/// Per-item read primitives. Only valid while a read unit is active.
pub trait ItemReader {
    /// Ids of all items in `view`, ascending.
    fn snapshot_sorted_ids(&self, view: &ConcreteView) -> Vec<ItemId>;

    /// Absent attributes read as `AttrValue::Empty`.
    fn read_attribute(&self, item: ItemId, attribute: AttributeId) -> Result<AttrValue, StoreError>;
}

/// A shared, concurrently readable item collection.
pub trait ItemStore: Send + Sync + 'static {
    /// Returns `None` when the view cannot be resolved yet.
    fn resolve_base_view(&self, view: &BaseView) -> Option<ConcreteView>;

    /// Runs `unit` with read access. Implementations hold their read lock for
    /// the duration of the closure only.
    fn read_unit<R>(&self, unit: impl FnOnce(&dyn ItemReader) -> R) -> R;

    /// Bumped whenever view definitions change. A computation that sees the
    /// epoch move between its start and its end must not trust its snapshot.
    fn view_epoch(&self) -> u64 {
        0
    }
}

/// Evaluates `predicate` against `item` using `reader`.
pub fn evaluate_predicate(
    reader: &dyn ItemReader,
    item: ItemId,
    predicate: &Predicate,
) -> Result<bool, StoreError> {
    predicate.evaluate(item, reader)
}
