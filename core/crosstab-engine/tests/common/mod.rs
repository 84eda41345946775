//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for crosstab-engine integration tests.

use std::sync::Arc;
use std::time::Duration;

use crosstab_engine::{CountingTable, CrossTab, EngineConfig, Filter, Outcome};
use item_store::{AttrValue, AttributeId, BaseView, ItemId, MemoryStore, ValueKey};
use tokio::runtime::Handle;

pub const STATUS: AttributeId = 1;
pub const PRIORITY: AttributeId = 2;
pub const COMPONENTS: AttributeId = 3;

pub const OPEN: ValueKey = 10;
pub const IN_PROGRESS: ValueKey = 11;
pub const CLOSED: ValueKey = 12;

pub const HIGH: ValueKey = 20;
pub const LOW: ValueKey = 21;

pub const UI: ValueKey = 30;
pub const CORE: ValueKey = 31;

/// Test harness owning a store and a counting table bound to the current
/// tokio runtime.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub table: CountingTable<MemoryStore>,
}

impl TestHarness {
    pub fn new(store: MemoryStore) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: MemoryStore, config: EngineConfig) -> Self {
        let store = Arc::new(store);
        let table = CountingTable::new(Arc::clone(&store), Handle::current(), config);
        TestHarness { store, table }
    }

    /// Harness over the tracker fixture.
    pub fn with_tracker_data() -> Self {
        Self::new(TrackerFixture::store())
    }

    /// Starts a computation and waits for its outcome.
    pub async fn count(
        &mut self,
        rows: Vec<Filter>,
        columns: Vec<Filter>,
        counters: Vec<Filter>,
        base_view: BaseView,
    ) -> Outcome {
        self.table.start(rows, columns, counters, base_view);
        self.next().await
    }

    /// Waits for the next accepted outcome, failing the test after 10s.
    pub async fn next(&mut self) -> Outcome {
        let (_, outcome) = tokio::time::timeout(Duration::from_secs(10), self.table.next_outcome())
            .await
            .expect("computation timed out")
            .expect("nothing was running");
        outcome
    }

    /// `count` that expects a counted result.
    pub async fn counted(
        &mut self,
        rows: Vec<Filter>,
        columns: Vec<Filter>,
        counters: Vec<Filter>,
        base_view: BaseView,
    ) -> Arc<CrossTab> {
        match self.count(rows, columns, counters, base_view).await {
            Outcome::Counted(table) => table,
            other => panic!("expected counted result, got {:?}", other),
        }
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Five items matching the counting walkthrough: R = {1, 3}, K = {1, 2, 3}.
pub struct ScenarioFixture;

impl ScenarioFixture {
    pub const TAG: AttributeId = 9;

    pub fn store() -> MemoryStore {
        let store = MemoryStore::new();
        let tags: [(ItemId, &[ValueKey]); 5] =
            [(1, &[1, 2]), (2, &[2]), (3, &[1, 2]), (4, &[]), (5, &[])];
        for (id, tags) in tags {
            store.insert_item(id, [(Self::TAG, AttrValue::many(tags.iter().copied()))]);
        }
        store
    }

    pub fn row() -> Filter {
        Filter::attribute("r", "R", Self::TAG, [1])
    }

    pub fn column() -> Filter {
        Filter::attribute("k", "K", Self::TAG, [2])
    }

    pub fn counter() -> Filter {
        Filter::general("c", "C", item_store::Predicate::True)
    }
}

const ISSUES: &[(ItemId, ValueKey, Option<ValueKey>, &[ValueKey])] = &[
    (1, OPEN, Some(HIGH), &[UI]),
    (2, OPEN, Some(LOW), &[CORE]),
    (3, OPEN, None, &[UI, CORE]),
    (4, IN_PROGRESS, Some(HIGH), &[CORE]),
    (5, IN_PROGRESS, Some(HIGH), &[]),
    (6, CLOSED, Some(LOW), &[UI]),
    (7, CLOSED, Some(LOW), &[CORE]),
    (8, CLOSED, None, &[]),
];

/// A small issue tracker.
pub struct TrackerFixture;

impl TrackerFixture {
    /// `(id, status, priority, components)`
    pub fn issues() -> Vec<(ItemId, ValueKey, Option<ValueKey>, &'static [ValueKey])> {
        ISSUES.to_vec()
    }

    pub fn store() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, status, priority, components) in Self::issues() {
            let mut attributes = vec![
                (STATUS, AttrValue::One(status)),
                (COMPONENTS, AttrValue::many(components.iter().copied())),
            ];
            if let Some(priority) = priority {
                attributes.push((PRIORITY, AttrValue::One(priority)));
            }
            store.insert_item(id, attributes);
        }
        store
    }

    pub fn status(id: &str, value: ValueKey) -> Filter {
        Filter::attribute(id, id, STATUS, [value])
    }

    pub fn statuses() -> Vec<Filter> {
        vec![
            Self::status("open", OPEN),
            Self::status("in-progress", IN_PROGRESS),
            Self::status("closed", CLOSED),
        ]
    }

    pub fn priorities() -> Vec<Filter> {
        vec![
            Filter::attribute("high", "High", PRIORITY, [HIGH]),
            Filter::attribute("low", "Low", PRIORITY, [LOW]),
            Filter::attribute("no-priority", "No priority", PRIORITY, [item_store::NO_VALUE]),
        ]
    }

    pub fn components() -> Vec<Filter> {
        vec![
            Filter::attribute("ui", "UI", COMPONENTS, [UI]),
            Filter::attribute("core", "Core", COMPONENTS, [CORE]),
        ]
    }
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

pub fn ids<'a>(filters: impl IntoIterator<Item = &'a Filter>) -> Vec<&'a str> {
    filters.into_iter().map(Filter::id).collect()
}

/// Assert a cell by axis ids rather than positions.
pub fn assert_cell(table: &CrossTab, counter: &str, row: &str, column: &str, expected: u32) {
    let c = table.counters().iter().position(|f| f.id() == counter).expect("counter id");
    let r = table.rows().iter().position(|f| f.id() == row).expect("row id");
    let k = table.columns().iter().position(|f| f.id() == column).expect("column id");
    assert_eq!(
        table.get_cell(c, r, k),
        Some(expected),
        "cell (counter={}, row={}, column={})",
        counter,
        row,
        column
    );
}
