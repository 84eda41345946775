//! FILENAME: core/item-store/src/value.rs
//! PURPOSE: Identifier and attribute value types for tracked items.
//! CONTEXT: Attribute values are opaque 64-bit keys (references to other
//! items, enum constants, users...). A value may be absent, single or a
//! small collection; collections are kept inline for the common 1-4 case.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Opaque identifier of a tracked item. Snapshots are sorted by this id.
pub type ItemId = u64;

/// Identifier of an item attribute (e.g. "status", "assignee").
pub type AttributeId = u32;

/// An attribute value key.
pub type ValueKey = u64;

/// Sentinel key standing for "no value". Attribute filters that accept it
/// match items whose attribute is absent or an empty collection.
pub const NO_VALUE: ValueKey = 0;

/// The value of one attribute on one item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttrValue {
    #[default]
    Empty,
    One(ValueKey),
    Many(SmallVec<[ValueKey; 4]>),
}

impl AttrValue {
    pub fn many(values: impl IntoIterator<Item = ValueKey>) -> Self {
        AttrValue::Many(values.into_iter().collect())
    }

    /// True for `Empty` and for a collection with no elements.
    pub fn is_empty(&self) -> bool {
        match self {
            AttrValue::Empty => true,
            AttrValue::One(_) => false,
            AttrValue::Many(values) => values.is_empty(),
        }
    }

    /// Calls `f` for each key held; an empty value yields `NO_VALUE` once.
    /// Stops as soon as `f` returns true and reports whether it did.
    pub fn any_key(&self, mut f: impl FnMut(ValueKey) -> bool) -> bool {
        match self {
            AttrValue::Empty => f(NO_VALUE),
            AttrValue::One(key) => f(*key),
            AttrValue::Many(values) if values.is_empty() => f(NO_VALUE),
            AttrValue::Many(values) => values.iter().any(|&key| f(key)),
        }
    }
}

impl From<ValueKey> for AttrValue {
    fn from(key: ValueKey) -> Self {
        AttrValue::One(key)
    }
}
