//! FILENAME: core/crosstab-engine/src/engine.rs
//! Counting computation - snapshot, build, prune, compute.
//!
//! A computation is an async task. Store access happens in bounded read units
//! on tokio's blocking pool, so the owner is never blocked and the store's
//! read lock is released between units. Cancellation is cooperative: the
//! flag is checked before each axis, before each read unit, and before each
//! later phase. A cancelled computation produces no outcome at all.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use item_store::{BaseView, ItemId, ItemStore};
use serde::Serialize;

use crate::axis::{Axis, AxisList};
use crate::bitvec::BitVector;
use crate::builder::BitVectorBuilder;
use crate::config::EngineConfig;
use crate::error::{CrossTabError, CrossTabResult};
use crate::filter::Filter;
use crate::logging::{log_debug, log_enter, log_error, log_exit, log_info, log_perf};
use crate::matrix::CountMatrix;
use crate::prune::{configured_counter_union, prune_empty};
use crate::result::{CountStats, CrossTab};

// ============================================================================
// CANCELLATION & PHASE
// ============================================================================

/// Shared stop request. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Where a computation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Building = 1,
    Pruning = 2,
    Computing = 3,
    Done = 4,
    Cancelled = 5,
    Retry = 6,
    Failed = 7,
}

impl Phase {
    fn from_u8(raw: u8) -> Phase {
        match raw {
            1 => Phase::Building,
            2 => Phase::Pruning,
            3 => Phase::Computing,
            4 => Phase::Done,
            5 => Phase::Cancelled,
            6 => Phase::Retry,
            7 => Phase::Failed,
            _ => Phase::Idle,
        }
    }

    /// True for phases a computation never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Cancelled | Phase::Retry | Phase::Failed)
    }
}

/// Phase shared between a running computation and its owner.
#[derive(Debug, Clone, Default)]
pub struct PhaseCell(Arc<AtomicU8>);

impl PhaseCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::Release);
    }
}

// ============================================================================
// REQUEST & OUTCOME
// ============================================================================

/// The three axes plus the base view one computation counts over.
#[derive(Debug, Clone)]
pub struct CountRequest {
    pub rows: AxisList,
    pub columns: AxisList,
    pub counters: AxisList,
    pub base_view: BaseView,
}

impl CountRequest {
    pub fn new(
        rows: impl IntoIterator<Item = Filter>,
        columns: impl IntoIterator<Item = Filter>,
        counters: impl IntoIterator<Item = Filter>,
        base_view: BaseView,
    ) -> Self {
        CountRequest {
            rows: AxisList::new(Axis::Rows, rows),
            columns: AxisList::new(Axis::Columns, columns),
            counters: AxisList::new(Axis::Counters, counters),
            base_view,
        }
    }

    pub fn axis(&self, axis: Axis) -> &AxisList {
        match axis {
            Axis::Rows => &self.rows,
            Axis::Columns => &self.columns,
            Axis::Counters => &self.counters,
        }
    }
}

/// What a finished, non-cancelled computation reports.
#[derive(Debug, Clone)]
pub enum Outcome {
    Counted(Arc<CrossTab>),
    /// The base view could not be resolved, or view definitions changed
    /// while counting. Nothing was produced; try again later.
    Retry,
    Failed(Arc<CrossTabError>),
}

impl Outcome {
    pub fn table(&self) -> Option<&Arc<CrossTab>> {
        match self {
            Outcome::Counted(table) => Some(table),
            _ => None,
        }
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, Outcome::Retry)
    }
}

// ============================================================================
// COMPUTATION
// ============================================================================

/// Runs one computation to completion.
///
/// Returns `None` if `cancel` was raised at any point before the outcome was
/// ready. `phase` is kept up to date for observers.
pub async fn run_computation<S: ItemStore>(
    store: Arc<S>,
    request: Arc<CountRequest>,
    config: EngineConfig,
    cancel: CancelFlag,
    phase: PhaseCell,
) -> Option<Outcome> {
    let job = Computation {
        store,
        request,
        config,
        cancel,
        phase: phase.clone(),
    };

    let outcome = match job.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            log_error!("COUNT", "computation failed: {}", e);
            Some(Outcome::Failed(Arc::new(e)))
        }
    };

    phase.set(match &outcome {
        None => Phase::Cancelled,
        Some(Outcome::Counted(_)) => Phase::Done,
        Some(Outcome::Retry) => Phase::Retry,
        Some(Outcome::Failed(_)) => Phase::Failed,
    });
    outcome
}

struct Computation<S> {
    store: Arc<S>,
    request: Arc<CountRequest>,
    config: EngineConfig,
    cancel: CancelFlag,
    phase: PhaseCell,
}

/// Runs `f` on the blocking pool. A panic inside `f` becomes a worker error.
async fn blocking<T, F>(f: F) -> CrossTabResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CrossTabError::Worker(e.to_string()))
}

impl<S: ItemStore> Computation<S> {
    fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn run(&self) -> CrossTabResult<Option<Outcome>> {
        let request = &self.request;
        log_enter!(
            "COUNT",
            "run",
            "rows={} columns={} counters={}",
            request.rows.configured_len(),
            request.columns.configured_len(),
            request.counters.configured_len()
        );

        if request.counters.configured_len() == 0 {
            log_exit!("COUNT", "run", "no counters configured");
            let table = CrossTab::unavailable(&request.rows, &request.columns, &request.counters);
            return Ok(Some(Outcome::Counted(Arc::new(table))));
        }
        if self.cancelled() {
            return Ok(None);
        }

        let epoch = self.store.view_epoch();
        let Some(view) = self.store.resolve_base_view(&request.base_view) else {
            log_info!("COUNT", "base view {:?} not resolvable yet", request.base_view);
            return Ok(Some(Outcome::Retry));
        };

        // Building
        self.phase.set(Phase::Building);
        let build_start = Instant::now();
        let store = Arc::clone(&self.store);
        let snapshot = move || store.read_unit(|reader| reader.snapshot_sorted_ids(&view));
        let items: Arc<[ItemId]> = blocking(snapshot)
            .await?
            .into();
        log_debug!("COUNT", "snapshot has {} items", items.len());

        let mut read_units = 0;
        let mut built = Vec::with_capacity(3);
        for axis in [Axis::Rows, Axis::Columns, Axis::Counters] {
            if self.cancelled() {
                return Ok(None);
            }
            let Some((bits, units)) = self.build_axis(axis, Arc::clone(&items)).await? else {
                return Ok(None);
            };
            read_units += units;
            built.push(bits);
        }
        let build_ms = build_start.elapsed().as_secs_f64() * 1000.0;

        if self.store.view_epoch() != epoch {
            log_info!("COUNT", "view definitions changed while counting, retrying");
            return Ok(Some(Outcome::Retry));
        }
        if self.cancelled() {
            return Ok(None);
        }

        // Pruning
        self.phase.set(Phase::Pruning);
        let counter_bits = built.pop().unwrap_or_default();
        let mut column_bits = built.pop().unwrap_or_default();
        let mut row_bits = built.pop().unwrap_or_default();

        let counters = request.counters.filters().to_vec();
        let all_counters = configured_counter_union(&counters, &counter_bits, items.len());
        let mut rows = request.rows.filters().to_vec();
        let mut columns = request.columns.filters().to_vec();
        let pruned_rows = prune_empty(Axis::Rows, &mut rows, &mut row_bits, &all_counters)?;
        let pruned_columns =
            prune_empty(Axis::Columns, &mut columns, &mut column_bits, &all_counters)?;

        if self.cancelled() {
            return Ok(None);
        }

        // Computing
        self.phase.set(Phase::Computing);
        let compute_start = Instant::now();
        let matrix = if self.config.matrix_on_blocking_pool {
            blocking(move || CountMatrix::compute(&counter_bits, &row_bits, &column_bits)).await?
        } else {
            CountMatrix::compute(&counter_bits, &row_bits, &column_bits)
        };
        let compute_ms = compute_start.elapsed().as_secs_f64() * 1000.0;

        if self.cancelled() {
            return Ok(None);
        }

        let stats = CountStats {
            item_count: items.len(),
            pruned_rows,
            pruned_columns,
            read_units,
            build_ms,
            compute_ms,
        };
        log_perf!(
            "COUNT",
            "items={} matrix={}x{}x{} pruned={}/{} units={} build={:.1}ms compute={:.1}ms",
            stats.item_count,
            counters.len(),
            rows.len(),
            columns.len(),
            pruned_rows,
            pruned_columns,
            read_units,
            build_ms,
            compute_ms
        );
        log_exit!("COUNT", "run", "counted");

        let table = CrossTab::counted(rows, columns, counters, matrix, stats);
        Ok(Some(Outcome::Counted(Arc::new(table))))
    }

    /// Builds one axis's bit vectors in bounded read units. Returns the
    /// vectors and the number of units used, or `None` on cancellation.
    async fn build_axis(
        &self,
        axis: Axis,
        items: Arc<[ItemId]>,
    ) -> CrossTabResult<Option<(Vec<Option<BitVector>>, usize)>> {
        let filters: Arc<[Filter]> = self.request.axis(axis).filters().into();
        let mut builder = BitVectorBuilder::new(axis, items, filters);
        let budget = self.config.time_slice();

        while builder.should_perform(&self.cancel) {
            let store = Arc::clone(&self.store);
            let cancel = self.cancel.clone();
            builder = blocking(move || {
                store.read_unit(|reader| builder.run_unit(reader, budget, &cancel));
                builder
            })
            .await?;
        }

        if self.cancelled() {
            log_debug!("COUNT", "{} axis cancelled after {} items", axis, builder.progress());
            return Ok(None);
        }
        let units = builder.units();
        Ok(Some((builder.into_bits(), units)))
    }
}
