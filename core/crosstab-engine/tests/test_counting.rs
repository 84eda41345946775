//! FILENAME: tests/test_counting.rs
//! Integration tests for counting, pruning and retry.

mod common;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use common::{
    assert_cell, ids, ScenarioFixture, TestHarness, TrackerFixture, COMPONENTS, STATUS,
};
use crosstab_engine::bitvec::intersection_cardinality3;
use crosstab_engine::{
    BitVector, CountMatrix, CountingTable, EngineConfig, Filter, Outcome, TOTAL_ID,
};
use item_store::{
    AttrValue, BaseView, ConcreteView, ItemReader, ItemStore, MemoryStore, Predicate, StoreError,
    NO_VALUE,
};
use tokio::runtime::Handle;

// ============================================================================
// COUNTING
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_scenario_counts() {
    let mut harness = TestHarness::new(ScenarioFixture::store());
    let table = harness
        .counted(
            vec![ScenarioFixture::row()],
            vec![ScenarioFixture::column()],
            vec![ScenarioFixture::counter()],
            BaseView::All,
        )
        .await;

    assert!(table.is_data_available());
    assert_eq!(ids(table.rows()), vec!["r", TOTAL_ID]);
    assert_eq!(ids(table.columns()), vec!["k", TOTAL_ID]);
    assert_eq!(ids(table.counters()), vec!["c", TOTAL_ID]);

    assert_cell(&table, TOTAL_ID, "r", TOTAL_ID, 2);
    assert_cell(&table, TOTAL_ID, TOTAL_ID, "k", 3);
    assert_cell(&table, TOTAL_ID, "r", "k", 2);
    assert_cell(&table, "c", TOTAL_ID, TOTAL_ID, 5);
    assert_eq!(table.stats().item_count, 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tracker_cross_tab() {
    let mut harness = TestHarness::with_tracker_data();
    let table = harness
        .counted(
            TrackerFixture::statuses(),
            TrackerFixture::priorities(),
            TrackerFixture::components(),
            BaseView::All,
        )
        .await;

    assert_cell(&table, "ui", "open", "high", 1);
    assert_cell(&table, "core", "open", TOTAL_ID, 2);
    assert_cell(&table, "core", "open", "no-priority", 1);
    assert_cell(&table, TOTAL_ID, "closed", "low", 2);
    assert_cell(&table, TOTAL_ID, "closed", "no-priority", 1);
    assert_cell(&table, "ui", "in-progress", TOTAL_ID, 0);
    assert_cell(&table, TOTAL_ID, TOTAL_ID, TOTAL_ID, 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_base_view_restricts_items() {
    let mut harness = TestHarness::with_tracker_data();
    harness
        .store
        .define_view("unresolved", Predicate::any_of(STATUS, [common::OPEN, common::IN_PROGRESS]));
    let table = harness
        .counted(
            TrackerFixture::statuses(),
            TrackerFixture::priorities(),
            TrackerFixture::components(),
            BaseView::Named("unresolved".into()),
        )
        .await;

    assert_eq!(table.stats().item_count, 5);
    // closed issues are outside the view, so the closed row is pruned
    assert_eq!(ids(table.rows()), vec!["open", "in-progress", TOTAL_ID]);
    assert_eq!(table.stats().pruned_rows, 1);
    assert_cell(&table, TOTAL_ID, TOTAL_ID, TOTAL_ID, 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_matrix_is_triple_intersection() {
    // Oracle check: recompute every cell from the engine's own inputs.
    let store = TrackerFixture::store();
    let view = store.resolve_base_view(&BaseView::All).unwrap();
    let items = store.read_unit(|r| r.snapshot_sorted_ids(&view));
    let bits_for = |filters: Vec<Filter>| -> Vec<BitVector> {
        let mut cache = crosstab_engine::AttributeCache::new();
        filters
            .iter()
            .chain(std::iter::once(&Filter::total()))
            .map(|f| {
                store.read_unit(|r| {
                    BitVector::from_indices(
                        items.len(),
                        items.iter().enumerate().filter_map(|(i, item)| {
                            cache.clear();
                            f.accepts(*item, r, &mut cache).then_some(i)
                        }),
                    )
                })
            })
            .collect()
    };
    let rows = bits_for(TrackerFixture::statuses());
    let columns = bits_for(TrackerFixture::priorities());
    let counters = bits_for(TrackerFixture::components());

    let mut harness = TestHarness::new(TrackerFixture::store());
    let table = harness
        .counted(
            TrackerFixture::statuses(),
            TrackerFixture::priorities(),
            TrackerFixture::components(),
            BaseView::All,
        )
        .await;

    let (nc, nr, nk) = table.matrix().unwrap().dims();
    assert_eq!((nc, nr, nk), (counters.len(), rows.len(), columns.len()));
    for c in 0..nc {
        for r in 0..nr {
            for k in 0..nk {
                let expected =
                    intersection_cardinality3(&counters[c], &rows[r], &columns[k]) as u32;
                assert_eq!(table.get_cell(c, r, k), Some(expected));
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_counters_means_no_data() {
    let mut harness = TestHarness::with_tracker_data();
    let table = harness
        .counted(
            TrackerFixture::statuses(),
            TrackerFixture::priorities(),
            Vec::new(),
            BaseView::All,
        )
        .await;

    assert!(!table.is_data_available());
    assert_eq!(table.rows().len(), 4);
    assert_eq!(table.get_cell(0, 0, 0), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tiny_time_slice_gives_same_counts() {
    let config = EngineConfig::from_json(r#"{ "time_slice_ms": 1 }"#).unwrap();
    let mut sliced = TestHarness::with_config(TrackerFixture::store(), config);
    let mut whole = TestHarness::with_tracker_data();

    let a = sliced
        .counted(
            TrackerFixture::statuses(),
            TrackerFixture::priorities(),
            TrackerFixture::components(),
            BaseView::All,
        )
        .await;
    let b = whole
        .counted(
            TrackerFixture::statuses(),
            TrackerFixture::priorities(),
            TrackerFixture::components(),
            BaseView::All,
        )
        .await;
    assert_eq!(a.matrix(), b.matrix());
    assert!(a.stats().read_units >= 3);
}

// ============================================================================
// PRUNING
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_filters_matching_nothing_are_pruned() {
    let mut harness = TestHarness::with_tracker_data();
    let mut rows = TrackerFixture::statuses();
    rows.insert(1, TrackerFixture::status("wontfix", 99));
    rows.push(Filter::unresolved("broken", "Broken"));
    let mut columns = TrackerFixture::priorities();
    columns.insert(0, Filter::general("nothing", "Nothing", Predicate::False));

    let table = harness
        .counted(rows, columns, TrackerFixture::components(), BaseView::All)
        .await;

    // survivors keep their configured order, Total stays last
    assert_eq!(ids(table.rows()), vec!["open", "in-progress", "closed", TOTAL_ID]);
    assert_eq!(ids(table.columns()), vec!["high", "low", "no-priority", TOTAL_ID]);
    assert_eq!(table.stats().pruned_rows, 2);
    assert_eq!(table.stats().pruned_columns, 1);
    // counters are never pruned
    assert_eq!(ids(table.counters()), vec!["ui", "core", TOTAL_ID]);
    assert_cell(&table, "ui", "open", "high", 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_view_keeps_zeroed_total() {
    let mut harness = TestHarness::with_tracker_data();
    let table = harness
        .counted(
            TrackerFixture::statuses(),
            TrackerFixture::priorities(),
            TrackerFixture::components(),
            BaseView::Matching(Predicate::False),
        )
        .await;

    assert!(table.is_data_available());
    assert_eq!(ids(table.rows()), vec![TOTAL_ID]);
    assert_eq!(ids(table.columns()), vec![TOTAL_ID]);
    for c in 0..table.counters().len() {
        assert_eq!(table.get_cell(c, 0, 0), Some(0));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_counters_matching_nothing_leave_only_zeroed_totals() {
    let mut harness = TestHarness::with_tracker_data();
    let table = harness
        .counted(
            TrackerFixture::statuses(),
            TrackerFixture::priorities(),
            vec![Filter::attribute("none", "None", COMPONENTS, [999])],
            BaseView::All,
        )
        .await;

    assert_eq!(ids(table.rows()), vec![TOTAL_ID]);
    assert_eq!(ids(table.columns()), vec![TOTAL_ID]);
    assert_eq!(ids(table.counters()), vec!["none", TOTAL_ID]);
    assert_eq!(table.stats().pruned_rows, 3);
    assert_eq!(table.stats().pruned_columns, 3);
    assert_cell(&table, "none", TOTAL_ID, TOTAL_ID, 0);
    // the Total row is reset to empty, so even the Total counter sees nothing
    assert_cell(&table, TOTAL_ID, TOTAL_ID, TOTAL_ID, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_row_outside_every_counter_is_pruned() {
    let mut harness = TestHarness::with_tracker_data();
    let mut rows = TrackerFixture::statuses();
    // items 5 and 8 have no component, so neither counter matches them
    rows.push(Filter::attribute("no-component", "No component", COMPONENTS, [NO_VALUE]));

    let table = harness
        .counted(rows, TrackerFixture::priorities(), TrackerFixture::components(), BaseView::All)
        .await;

    assert_eq!(ids(table.rows()), vec!["open", "in-progress", "closed", TOTAL_ID]);
    assert_eq!(table.stats().pruned_rows, 1);
    assert_eq!(ids(table.columns()), vec!["high", "low", "no-priority", TOTAL_ID]);
    assert_cell(&table, "core", "in-progress", "high", 1);
    // the Total row still counts every item of the view
    assert_cell(&table, TOTAL_ID, TOTAL_ID, TOTAL_ID, 8);
}

#[test]
fn test_matrix_shape_follows_pruned_axes() {
    let m = CountMatrix::compute(&[None], &[None, None], &[None]);
    assert_eq!(m.dims(), (1, 2, 1));
    assert_eq!(m.cells(), &[0, 0]);
}

// ============================================================================
// RETRY
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_unresolved_view_retries_then_counts() {
    let mut harness = TestHarness::with_tracker_data();
    let outcome = harness
        .count(
            TrackerFixture::statuses(),
            Vec::new(),
            TrackerFixture::components(),
            BaseView::Named("later".into()),
        )
        .await;
    assert!(outcome.is_retry());
    assert!(harness.table.latest().is_none());

    harness.store.define_view("later", Predicate::True);
    let handle = harness.table.reschedule(std::time::Duration::from_millis(5)).unwrap();
    let outcome = harness.next().await;
    assert_eq!(harness.table.current(), None);
    let table = outcome.table().unwrap();
    assert_eq!(table.stats().item_count, 8);
    assert!(handle.id() > 1);
}

/// Store wrapper whose view epoch can be bumped from inside a read unit.
struct EpochStore {
    inner: MemoryStore,
    epoch: Arc<AtomicU64>,
}

impl ItemStore for EpochStore {
    fn resolve_base_view(&self, view: &BaseView) -> Option<ConcreteView> {
        self.inner.resolve_base_view(view)
    }

    fn read_unit<R>(&self, unit: impl FnOnce(&dyn ItemReader) -> R) -> R {
        self.inner.read_unit(unit)
    }

    fn view_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_view_change_during_count_retries() {
    let epoch = Arc::new(AtomicU64::new(0));
    let store = EpochStore {
        inner: TrackerFixture::store(),
        epoch: Arc::clone(&epoch),
    };
    let bump = Arc::clone(&epoch);
    let invalidating = Filter::general(
        "invalidating",
        "Invalidating",
        Predicate::custom("bump-epoch", move |_, _| {
            bump.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }),
    );

    let mut table = CountingTable::new(Arc::new(store), Handle::current(), EngineConfig::default());
    table.start(vec![invalidating], Vec::new(), TrackerFixture::components(), BaseView::All);
    let (_, outcome) = table.next_outcome().await.unwrap();
    assert!(matches!(outcome, Outcome::Retry));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_evaluation_errors_only_skip_the_item() {
    let mut harness = TestHarness::with_tracker_data();
    let flaky = Filter::general(
        "flaky",
        "Flaky",
        Predicate::custom("odd-ids-fail", |item, reader: &dyn ItemReader| {
            if item % 2 == 1 {
                return Err(StoreError::Evaluation(format!("item {} is stale", item)));
            }
            Ok(reader.read_attribute(item, STATUS)? != AttrValue::Empty)
        }),
    );
    let table = harness
        .counted(vec![flaky], Vec::new(), TrackerFixture::components(), BaseView::All)
        .await;
    assert_cell(&table, TOTAL_ID, "flaky", TOTAL_ID, 4);
}
