//! FILENAME: core/item-store/src/lib.rs
//! PURPOSE: Main library entry point for the item store boundary.
//! CONTEXT: Re-exports the identifier, value and predicate types shared by
//! the counting engine and any store implementation that feeds it.

pub mod memory;
pub mod predicate;
pub mod store;
pub mod value;

// Re-export commonly used types at the crate root
pub use memory::MemoryStore;
pub use predicate::{CustomPredicate, Predicate};
pub use store::{evaluate_predicate, BaseView, ConcreteView, ItemReader, ItemStore, StoreError};
pub use value::{AttrValue, AttributeId, ItemId, ValueKey, NO_VALUE};
