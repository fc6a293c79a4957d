// libs/waiting-room-cell/src/services/waiting_room.rs
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::{Clock, SystemClock};

use crate::models::{
    AppliedTransition, AppointmentStatus, QueueSnapshot, StatusChangedEvent, WaitingRoomError,
};
use crate::services::coordinator::TransitionCoordinator;
use crate::services::poller::QueuePoller;
use crate::store::{AppointmentStore, SupabaseAppointmentStore};

/// Entry point for one open queue view: wires the coordinator and poller to
/// a shared store and exposes the caller-facing operations.
pub struct WaitingRoomService {
    coordinator: Arc<TransitionCoordinator>,
    poller: Arc<QueuePoller>,
}

impl WaitingRoomService {
    pub fn from_config(config: &AppConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let store: Arc<dyn AppointmentStore> =
            Arc::new(SupabaseAppointmentStore::new(config, Arc::clone(&clock)));

        Self::new(
            store,
            clock,
            config.clinic_id.clone(),
            config.poll_interval_seconds,
            config.storage_timeout_seconds,
        )
    }

    pub fn new(
        store: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
        clinic_id: String,
        poll_interval_seconds: u64,
        storage_timeout_seconds: u64,
    ) -> Self {
        let coordinator = Arc::new(TransitionCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            storage_timeout_seconds,
        ));
        let poller = Arc::new(QueuePoller::new(
            store,
            Arc::clone(&coordinator),
            clock,
            clinic_id,
            poll_interval_seconds,
            storage_timeout_seconds,
        ));

        Self { coordinator, poller }
    }

    /// Spawn the poll loop. Call once per service instance.
    pub fn start(&self) -> JoinHandle<()> {
        let poller = Arc::clone(&self.poller);
        tokio::spawn(async move { poller.run().await })
    }

    pub async fn request_transition(
        &self,
        appointment_id: Uuid,
        target: AppointmentStatus,
        actor_id: Uuid,
    ) -> Result<AppliedTransition, WaitingRoomError> {
        self.coordinator
            .request_transition(appointment_id, target, actor_id)
            .await
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.poller.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.poller.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StatusChangedEvent> {
        self.coordinator.subscribe_events()
    }

    pub fn refresh_now(&self) {
        self.poller.refresh_now()
    }

    pub async fn shutdown(&self) {
        self.poller.shutdown().await;
    }
}
