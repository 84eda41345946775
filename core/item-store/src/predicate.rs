//! FILENAME: core/item-store/src/predicate.rs
//! PURPOSE: Compiled boolean predicates over a single item.
//! CONTEXT: Predicates are built in code by configuration layers; there is
//! no textual query language here. Evaluation reads attributes through an
//! `ItemReader`, so it is only valid inside a store read unit.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::store::{ItemReader, StoreError};
use crate::value::{AttributeId, ItemId, ValueKey};

type CustomFn = dyn Fn(ItemId, &dyn ItemReader) -> Result<bool, StoreError> + Send + Sync;

/// An arbitrary predicate supplied as code. It may touch any part of the
/// item's data through the reader and may be arbitrarily expensive.
#[derive(Clone)]
pub struct CustomPredicate {
    label: String,
    func: Arc<CustomFn>,
}

impl CustomPredicate {
    pub fn new<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(ItemId, &dyn ItemReader) -> Result<bool, StoreError> + Send + Sync + 'static,
    {
        CustomPredicate {
            label: label.into(),
            func: Arc::new(func),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn call(&self, item: ItemId, reader: &dyn ItemReader) -> Result<bool, StoreError> {
        (self.func)(item, reader)
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomPredicate").field(&self.label).finish()
    }
}

/// A boolean expression evaluated against one item.
#[derive(Debug, Clone)]
pub enum Predicate {
    True,
    False,
    /// Attribute value (or any element of a collection) is in `values`.
    /// Empty values test the `NO_VALUE` sentinel.
    In {
        attribute: AttributeId,
        values: FxHashSet<ValueKey>,
    },
    /// Attribute is present and not an empty collection.
    HasValue(AttributeId),
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Custom(CustomPredicate),
}

impl Predicate {
    pub fn any_of(attribute: AttributeId, values: impl IntoIterator<Item = ValueKey>) -> Self {
        Predicate::In {
            attribute,
            values: values.into_iter().collect(),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    pub fn custom<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(ItemId, &dyn ItemReader) -> Result<bool, StoreError> + Send + Sync + 'static,
    {
        Predicate::Custom(CustomPredicate::new(label, func))
    }

    /// Evaluates the expression. `And` / `Or` short-circuit left to right,
    /// so an erroring operand after a decisive one is never reached.
    pub fn evaluate(&self, item: ItemId, reader: &dyn ItemReader) -> Result<bool, StoreError> {
        match self {
            Predicate::True => Ok(true),
            Predicate::False => Ok(false),
            Predicate::In { attribute, values } => {
                let value = reader.read_attribute(item, *attribute)?;
                Ok(value.any_key(|key| values.contains(&key)))
            }
            Predicate::HasValue(attribute) => {
                Ok(!reader.read_attribute(item, *attribute)?.is_empty())
            }
            Predicate::Not(inner) => Ok(!inner.evaluate(item, reader)?),
            Predicate::And(parts) => {
                for part in parts {
                    if !part.evaluate(item, reader)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(parts) => {
                for part in parts {
                    if part.evaluate(item, reader)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Custom(custom) => custom.call(item, reader),
        }
    }
}
