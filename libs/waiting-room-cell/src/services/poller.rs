// libs/waiting-room-cell/src/services/poller.rs
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::time::{timeout, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use shared_utils::Clock;

use crate::models::QueueSnapshot;
use crate::services::coordinator::TransitionCoordinator;
use crate::services::grouping::QueueGrouperService;
use crate::store::AppointmentStore;

#[derive(Debug, Clone, PartialEq)]
pub enum PollerState {
    Idle,
    Polling,
}

/// How many poll intervals an unconfirmed transition record may outlive
/// before reconciliation stops trusting it.
const RECORD_MAX_AGE_INTERVALS: i64 = 5;

/// Periodically re-reads the clinic-day's appointments, reconciles them with
/// in-flight transitions, and publishes a fresh snapshot. One poller per open
/// queue view; polls within one poller never overlap.
pub struct QueuePoller {
    store: Arc<dyn AppointmentStore>,
    coordinator: Arc<TransitionCoordinator>,
    grouper: QueueGrouperService,
    clock: Arc<dyn Clock>,
    clinic_id: String,
    poll_interval: Duration,
    storage_timeout: Duration,
    state: RwLock<PollerState>,
    snapshot_tx: watch::Sender<QueueSnapshot>,
    refresh_tx: mpsc::Sender<()>,
    refresh_rx: Mutex<Option<mpsc::Receiver<()>>>,
    is_shutdown: RwLock<bool>,
}

impl QueuePoller {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        coordinator: Arc<TransitionCoordinator>,
        clock: Arc<dyn Clock>,
        clinic_id: String,
        poll_interval_seconds: u64,
        storage_timeout_seconds: u64,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(QueueSnapshot::empty(clock.now()));
        // Capacity 1: a second refresh while one is pending coalesces.
        let (refresh_tx, refresh_rx) = mpsc::channel(1);

        Self {
            store,
            coordinator,
            grouper: QueueGrouperService::new(),
            clock,
            clinic_id,
            poll_interval: Duration::from_secs(poll_interval_seconds),
            storage_timeout: Duration::from_secs(storage_timeout_seconds),
            state: RwLock::new(PollerState::Idle),
            snapshot_tx,
            refresh_tx,
            refresh_rx: Mutex::new(Some(refresh_rx)),
            is_shutdown: RwLock::new(false),
        }
    }

    /// Drive the poll loop until shutdown. The first tick fires immediately,
    /// so subscribers get a real snapshot right after startup.
    pub async fn run(&self) {
        let Some(mut refresh_rx) = self.refresh_rx.lock().await.take() else {
            warn!("Queue poller for clinic {} is already running", self.clinic_id);
            return;
        };

        info!(
            "Starting queue poller for clinic {} (interval {:?})",
            self.clinic_id, self.poll_interval
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                received = refresh_rx.recv() => {
                    if received.is_none() {
                        break;
                    }
                    debug!("Manual refresh requested for clinic {}", self.clinic_id);
                }
            }

            if *self.is_shutdown.read().await {
                break;
            }

            // Anything that queued up while we were waiting rides this poll.
            while refresh_rx.try_recv().is_ok() {}

            self.poll_once().await;
        }

        info!("Queue poller for clinic {} stopped", self.clinic_id);
    }

    /// Ask for an immediate poll. Requests made while one is already pending
    /// or in flight collapse into a single read; at most one read is ever
    /// outstanding.
    pub fn refresh_now(&self) {
        if self.refresh_tx.try_send(()).is_err() {
            debug!("Refresh already pending for clinic {}; coalesced", self.clinic_id);
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn state(&self) -> PollerState {
        self.state.read().await.clone()
    }

    pub async fn shutdown(&self) {
        info!("Shutting down queue poller for clinic {}", self.clinic_id);
        *self.is_shutdown.write().await = true;
        // Wake the loop so it notices promptly.
        let _ = self.refresh_tx.try_send(());
    }

    async fn poll_once(&self) {
        *self.state.write().await = PollerState::Polling;

        let now = self.clock.now();
        let read = self.store.list_for_day(&self.clinic_id, now.date_naive());

        match timeout(self.storage_timeout, read).await {
            Ok(Ok(mut appointments)) => {
                self.coordinator
                    .reconcile(&mut appointments, now, self.record_max_age())
                    .await;
                let snapshot = self.grouper.group(appointments, now);
                debug!(
                    "Published snapshot for clinic {}: {} active, {} done",
                    self.clinic_id,
                    snapshot.active_count(),
                    snapshot.completed.len()
                );
                // send_replace: the stored value updates even with no
                // subscribers, so snapshot() always sees the latest poll.
                self.snapshot_tx.send_replace(snapshot);
            }
            Ok(Err(error)) => {
                warn!("Poll failed for clinic {}: {}", self.clinic_id, error);
                self.publish_stale(error.to_string());
            }
            Err(_) => {
                warn!(
                    "Poll timed out after {:?} for clinic {}",
                    self.storage_timeout, self.clinic_id
                );
                self.publish_stale(format!(
                    "poll timed out after {} seconds",
                    self.storage_timeout.as_secs()
                ));
            }
        }

        *self.state.write().await = PollerState::Idle;
    }

    /// A failed poll never clears the queue: the last-known-good snapshot is
    /// republished with the stale flag raised.
    fn publish_stale(&self, error: String) {
        let stale = self.snapshot_tx.borrow().as_stale(error);
        self.snapshot_tx.send_replace(stale);
    }

    fn record_max_age(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.poll_interval.as_secs() as i64 * RECORD_MAX_AGE_INTERVALS)
    }
}
