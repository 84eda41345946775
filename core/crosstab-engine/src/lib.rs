//! FILENAME: core/crosstab-engine/src/lib.rs
//! PURPOSE: Cross-tabulation counting engine.
//! CONTEXT: Counts, for every (counter, row, column) filter triple, how many
//! items of a base view match all three. Counting runs in the background in
//! bounded read units, prunes empty rows and columns, and hands the owner an
//! immutable CrossTab that can be viewed sorted without recomputation.

pub mod logging;
pub mod axis;
pub mod bitvec;
pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod matrix;
pub mod prune;
pub mod result;
pub mod sort;
pub mod table;
pub mod view;

// Re-export commonly used types at the crate root
pub use axis::{Axis, AxisList};
pub use bitvec::BitVector;
pub use config::EngineConfig;
pub use engine::{run_computation, CancelFlag, CountRequest, Outcome, Phase, PhaseCell};
pub use error::{CrossTabError, CrossTabResult};
pub use filter::{AttributeCache, Filter, Matcher, TOTAL_ID};
pub use matrix::CountMatrix;
pub use result::{CountStats, CrossTab};
pub use sort::{sorting_permutation, SortDirection};
pub use table::{CountingHandle, CountingTable};
pub use view::{AxisEntry, GridSnapshot, SortedCrossTab, TableView};

// Store boundary types callers need alongside the engine.
pub use item_store::{BaseView, ItemId, ItemStore};
