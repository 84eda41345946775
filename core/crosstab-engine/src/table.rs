//! FILENAME: core/crosstab-engine/src/table.rs
//! CountingTable - owner-side lifecycle of background computations.
//!
//! The owner starts computations, registers result callbacks, and pumps
//! finished outcomes with `dispatch_pending` or `next_outcome`. Only the
//! most recently started computation may deliver: starting a new one cancels
//! the previous, and any outcome that still arrives from a superseded or
//! cancelled computation is discarded on the owner side.

use std::sync::Arc;
use std::time::Duration;

use item_store::{BaseView, ItemStore};
use rustc_hash::FxHashMap;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::config::EngineConfig;
use crate::engine::{run_computation, CancelFlag, CountRequest, Outcome, Phase, PhaseCell};
use crate::filter::Filter;
use crate::logging::{log_debug, log_info};
use crate::result::CrossTab;

/// Identifies one started computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountingHandle(u64);

impl CountingHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

type ResultCallback = Box<dyn FnOnce(CountingHandle, Outcome) + Send>;

struct InFlight {
    handle: CountingHandle,
    cancel: CancelFlag,
    phase: PhaseCell,
}

struct Delivery {
    handle: CountingHandle,
    outcome: Outcome,
}

pub struct CountingTable<S: ItemStore> {
    store: Arc<S>,
    runtime: Handle,
    config: EngineConfig,
    next_id: u64,
    current: Option<InFlight>,
    last_request: Option<Arc<CountRequest>>,
    callbacks: FxHashMap<CountingHandle, ResultCallback>,
    latest: Option<Arc<CrossTab>>,
    sender: UnboundedSender<Delivery>,
    receiver: UnboundedReceiver<Delivery>,
}

impl<S: ItemStore> CountingTable<S> {
    pub fn new(store: Arc<S>, runtime: Handle, config: EngineConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        CountingTable {
            store,
            runtime,
            config,
            next_id: 0,
            current: None,
            last_request: None,
            callbacks: FxHashMap::default(),
            latest: None,
            sender,
            receiver,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ========================================================================
    // STARTING & CANCELLING
    // ========================================================================

    /// Starts counting `counters` over `rows` x `columns` within `base_view`,
    /// superseding any computation still running.
    pub fn start(
        &mut self,
        rows: impl IntoIterator<Item = Filter>,
        columns: impl IntoIterator<Item = Filter>,
        counters: impl IntoIterator<Item = Filter>,
        base_view: BaseView,
    ) -> CountingHandle {
        self.start_request(CountRequest::new(rows, columns, counters, base_view))
    }

    pub fn start_request(&mut self, request: CountRequest) -> CountingHandle {
        self.launch(Arc::new(request), Duration::ZERO)
    }

    /// Starts the last request again after `delay`. Returns `None` if nothing
    /// was ever started. Cancelling the returned handle also cancels the
    /// pending delay.
    pub fn reschedule(&mut self, delay: Duration) -> Option<CountingHandle> {
        let request = Arc::clone(self.last_request.as_ref()?);
        Some(self.launch(request, delay))
    }

    /// `reschedule` with the configured retry delay.
    pub fn reschedule_default(&mut self) -> Option<CountingHandle> {
        self.reschedule(self.config.retry_delay())
    }

    fn launch(&mut self, request: Arc<CountRequest>, delay: Duration) -> CountingHandle {
        if let Some(previous) = self.current.take() {
            log_debug!("TABLE", "superseding computation {}", previous.handle.0);
            previous.cancel.cancel();
            self.callbacks.remove(&previous.handle);
        }

        self.next_id += 1;
        let handle = CountingHandle(self.next_id);
        let cancel = CancelFlag::new();
        let phase = PhaseCell::new();
        self.current = Some(InFlight {
            handle,
            cancel: cancel.clone(),
            phase: phase.clone(),
        });
        self.last_request = Some(Arc::clone(&request));
        log_info!("TABLE", "starting computation {} delay={}ms", handle.0, delay.as_millis());

        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if cancel.is_cancelled() {
                phase.set(Phase::Cancelled);
                return;
            }
            let outcome = run_computation(store, request, config, cancel.clone(), phase).await;
            if let Some(outcome) = outcome {
                if !cancel.is_cancelled() {
                    // The owner may be gone; nothing to deliver to then.
                    let _ = sender.send(Delivery { handle, outcome });
                }
            }
        });
        handle
    }

    /// Cancels `handle` if it is the running computation. Its callback is
    /// dropped either way. Returns whether anything was running.
    pub fn cancel(&mut self, handle: CountingHandle) -> bool {
        self.callbacks.remove(&handle);
        match &self.current {
            Some(current) if current.handle == handle => {
                current.cancel.cancel();
                self.current = None;
                log_debug!("TABLE", "cancelled computation {}", handle.0);
                true
            }
            _ => false,
        }
    }

    /// Registers the callback invoked when `handle` delivers. Replaces any
    /// earlier callback for the same handle.
    pub fn on_result(
        &mut self,
        handle: CountingHandle,
        callback: impl FnOnce(CountingHandle, Outcome) + Send + 'static,
    ) {
        self.callbacks.insert(handle, Box::new(callback));
    }

    // ========================================================================
    // DELIVERY
    // ========================================================================

    /// Delivers every outcome that has already arrived. Returns how many were
    /// accepted.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut accepted = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(delivery) => {
                    if self.accept(delivery).is_some() {
                        accepted += 1;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return accepted,
            }
        }
    }

    /// Waits for the running computation to deliver and returns its outcome
    /// after invoking its callback. Returns `None` when nothing is running
    /// and nothing is queued.
    pub async fn next_outcome(&mut self) -> Option<(CountingHandle, Outcome)> {
        loop {
            let delivery = match self.receiver.try_recv() {
                Ok(delivery) => delivery,
                Err(_) if self.current.is_none() => return None,
                Err(_) => self.receiver.recv().await?,
            };
            if let Some(accepted) = self.accept(delivery) {
                return Some(accepted);
            }
        }
    }

    fn accept(&mut self, delivery: Delivery) -> Option<(CountingHandle, Outcome)> {
        let Delivery { handle, outcome } = delivery;
        let is_current = matches!(
            &self.current,
            Some(c) if c.handle == handle && !c.cancel.is_cancelled()
        );
        if !is_current {
            log_debug!("TABLE", "discarding outcome of superseded computation {}", handle.0);
            return None;
        }

        self.current = None;
        if let Outcome::Counted(table) = &outcome {
            self.latest = Some(Arc::clone(table));
        }
        if let Some(callback) = self.callbacks.remove(&handle) {
            callback(handle, outcome.clone());
        }
        Some((handle, outcome))
    }

    // ========================================================================
    // STATE
    // ========================================================================

    /// The most recent counted result, if any.
    pub fn latest(&self) -> Option<&Arc<CrossTab>> {
        self.latest.as_ref()
    }

    pub fn current(&self) -> Option<CountingHandle> {
        self.current.as_ref().map(|c| c.handle)
    }

    /// Phase of the running computation, or `Idle`.
    pub fn phase(&self) -> Phase {
        self.current.as_ref().map_or(Phase::Idle, |c| c.phase.get())
    }

    pub fn is_computing(&self) -> bool {
        self.current.is_some()
    }
}

impl<S: ItemStore> Drop for CountingTable<S> {
    fn drop(&mut self) {
        if let Some(current) = self.current.take() {
            current.cancel.cancel();
        }
    }
}
