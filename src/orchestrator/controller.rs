use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak,
    },
};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::{
    analysis::{BatchAnalyzer, Progress},
    batching::form_batches,
    cadence::CadencePreset,
    settings::SettingsStore,
    store::BatchStore,
};

use super::{
    events::{BatchStatusChanged, StatusEvents},
    ticker::Ticker,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Only captures newer than this are considered for new batches
    pub unprocessed_lookback: chrono::Duration,

    /// Batches spanning less than this are classified `skipped_short`
    pub min_batch_duration_secs: i64,

    /// Buffer size of the status event channel
    pub event_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            unprocessed_lookback: chrono::Duration::hours(24),
            min_batch_duration_secs: 5 * 60,
            event_capacity: 64,
        }
    }
}

/// Result of one processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub cadence: CadencePreset,
    pub captures_considered: usize,
    pub batches_created: Vec<i64>,
    /// Batches found `pending` from an earlier pass or run and dispatched again
    pub batches_resumed: Vec<i64>,
}

pub(crate) struct OrchestratorInner {
    pub(crate) store: Arc<dyn BatchStore>,
    pub(crate) analyzer: Arc<dyn BatchAnalyzer>,
    pub(crate) config: OrchestratorConfig,
    pub(crate) events: StatusEvents,
    /// Held for the whole of every pass and every reprocessing workflow.
    pub(crate) work_lane: tokio::sync::Mutex<()>,
    settings: Arc<SettingsStore>,
    active_cadence: RwLock<CadencePreset>,
    ticker: Mutex<Ticker>,
    pass_in_flight: AtomicBool,
    dispatching: Mutex<HashSet<i64>>,
}

/// Owns the periodic trigger and dispatches batches to the analysis service.
///
/// Construct one per process and hand clones (or [`OrchestratorHandle`]s) to callers.
#[derive(Clone)]
pub struct BatchOrchestrator {
    pub(crate) inner: Arc<OrchestratorInner>,
}

/// Weak reference for UI/CLI callers that must not keep the orchestrator alive.
#[derive(Clone)]
pub struct OrchestratorHandle {
    inner: Weak<OrchestratorInner>,
}

impl OrchestratorHandle {
    pub fn upgrade(&self) -> Option<BatchOrchestrator> {
        self.inner
            .upgrade()
            .map(|inner| BatchOrchestrator { inner })
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Removes a batch from the dispatching set when its dispatch task ends.
struct DispatchGuard {
    orchestrator: BatchOrchestrator,
    batch_id: i64,
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        self.orchestrator.lock_dispatching().remove(&self.batch_id);
    }
}

impl BatchOrchestrator {
    pub fn new(
        store: Arc<dyn BatchStore>,
        analyzer: Arc<dyn BatchAnalyzer>,
        settings: Arc<SettingsStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let cadence = settings.cadence_preset();
        let events = StatusEvents::new(config.event_capacity);

        Self {
            inner: Arc::new(OrchestratorInner {
                store,
                analyzer,
                config,
                events,
                work_lane: tokio::sync::Mutex::new(()),
                settings,
                active_cadence: RwLock::new(cadence),
                ticker: Mutex::new(Ticker::new()),
                pass_in_flight: AtomicBool::new(false),
                dispatching: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn downgrade(&self) -> OrchestratorHandle {
        OrchestratorHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Begin ticking at the persisted cadence and fire one pass right away.
    /// Starting again replaces the running ticker and re-reads the cadence.
    pub fn start(&self) {
        let cadence = self.inner.settings.cadence_preset();
        *self
            .inner
            .active_cadence
            .write()
            .unwrap_or_else(PoisonError::into_inner) = cadence;

        let period = cadence.check_interval();
        let handle = self.downgrade();
        self.lock_ticker().start(period, move || {
            if let Some(orchestrator) = handle.upgrade() {
                orchestrator.trigger_now();
            }
        });

        log_info!(
            "batch orchestrator started: {} cadence, checking every {}s",
            cadence,
            period.as_secs()
        );
    }

    /// Stop future ticks. In-flight passes and dispatches run to completion.
    pub fn stop(&self) {
        let mut ticker = self.lock_ticker();
        if ticker.is_running() {
            log_info!("batch orchestrator stopped");
        }
        ticker.stop();
    }

    pub fn is_running(&self) -> bool {
        self.lock_ticker().is_running()
    }

    /// Cadence captured at the last `start()` (or construction).
    pub fn active_cadence(&self) -> CadencePreset {
        *self
            .inner
            .active_cadence
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchStatusChanged> {
        self.inner.events.subscribe()
    }

    /// Request a processing pass. Returns `None` when one is already in
    /// flight; the request is then folded into that pass.
    pub fn trigger_now(&self) -> Option<JoinHandle<()>> {
        if self
            .inner
            .pass_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log_info!("processing pass already in flight; trigger coalesced");
            return None;
        }

        let this = self.clone();
        Some(tokio::spawn(async move {
            let _in_flight = InFlightGuard(&this.inner.pass_in_flight);
            match this.run_pass().await {
                Ok(report) => log_info!(
                    "processing pass done: {} unprocessed captures, {} new batches",
                    report.captures_considered,
                    report.batches_created.len()
                ),
                Err(err) => log_error!("processing pass failed: {err:?}"),
            }
        }))
    }

    /// One pass: form batches from unconsumed captures, persist them as
    /// `pending`, and dispatch each without waiting for the previous one.
    ///
    /// Batches left `pending` by an earlier pass (a crash between persisting and
    /// dispatching) are dispatched again first.
    pub async fn run_pass(&self) -> Result<PassReport> {
        let _lane = self.inner.work_lane.lock().await;

        let stranded = self
            .inner
            .store
            .fetch_pending_batches()
            .await
            .context("failed to fetch pending batches")?;
        let mut resumed = Vec::new();
        for batch in stranded {
            if self.spawn_dispatch(batch.id) {
                log_info!("resuming pending batch {}", batch.id);
                resumed.push(batch.id);
            }
        }

        let cadence = self.active_cadence();
        let batching = self.inner.analyzer.batching_config(cadence);
        let since = Utc::now() - self.inner.config.unprocessed_lookback;

        let captures = self
            .inner
            .store
            .fetch_unprocessed_captures(since)
            .await
            .context("failed to fetch unprocessed captures")?;
        let batches = form_batches(&captures, &batching);

        let mut created = Vec::with_capacity(batches.len());
        let mut persist_error = None;
        for batch in &batches {
            match self
                .inner
                .store
                .persist_batch(batch.start_time(), batch.end_time(), &batch.capture_ids())
                .await
            {
                Ok(Some(batch_id)) => {
                    log_info!(
                        "created batch {} ({} captures, {}s)",
                        batch_id,
                        batch.len(),
                        batch.duration_secs()
                    );
                    created.push(batch_id);
                }
                Ok(None) => log_warn!(
                    "batch {} - {} not persisted: captures already belong to another batch",
                    batch.start_time(),
                    batch.end_time()
                ),
                Err(err) => {
                    persist_error = Some(err);
                    break;
                }
            }
        }

        for batch_id in &created {
            self.spawn_dispatch(*batch_id);
        }

        if let Some(err) = persist_error {
            return Err(err.context("failed to persist batch"));
        }

        Ok(PassReport {
            cadence,
            captures_considered: captures.len(),
            batches_created: created,
            batches_resumed: resumed,
        })
    }

    /// `false` when the batch is already being dispatched.
    fn spawn_dispatch(&self, batch_id: i64) -> bool {
        if !self.lock_dispatching().insert(batch_id) {
            return false;
        }

        let this = self.clone();
        tokio::spawn(async move {
            let _dispatching = DispatchGuard {
                orchestrator: this.clone(),
                batch_id,
            };
            if let Err(err) = this.process_batch(batch_id, &Progress::silent()).await {
                log_error!("dispatch of batch {batch_id} failed: {err:?}");
                this.settle_after_error(batch_id, &format!("{err:#}")).await;
            }
        });
        true
    }

    fn lock_dispatching(&self) -> MutexGuard<'_, HashSet<i64>> {
        self.inner
            .dispatching
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_ticker(&self) -> MutexGuard<'_, Ticker> {
        self.inner
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
