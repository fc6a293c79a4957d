// libs/waiting-room-cell/src/services/coordinator.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{broadcast, RwLock};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_utils::Clock;

use crate::models::{
    AppliedTransition, Appointment, AppointmentStatus, StatusChangedEvent, TransitionRecord,
    WaitingRoomError,
};
use crate::services::transitions::StatusTransitionTable;
use crate::store::{AppointmentStore, StoreError};

/// Applies validated status transitions through the store's conditional
/// update and remembers what it applied so the poller can reconcile a racing
/// read. Retry policy stays with the caller: a ConcurrentModification may
/// mean the desired end state was already reached by someone else.
pub struct TransitionCoordinator {
    store: Arc<dyn AppointmentStore>,
    table: StatusTransitionTable,
    clock: Arc<dyn Clock>,
    storage_timeout: Duration,
    applied: RwLock<HashMap<Uuid, TransitionRecord>>,
    events: broadcast::Sender<StatusChangedEvent>,
}

impl TransitionCoordinator {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
        storage_timeout_seconds: u64,
    ) -> Self {
        let (events, _) = broadcast::channel(256);

        Self {
            store,
            table: StatusTransitionTable,
            clock,
            storage_timeout: Duration::from_secs(storage_timeout_seconds),
            applied: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Validate and persist one status change. Exactly one conditional write
    /// on success, zero writes on any failure path.
    pub async fn request_transition(
        &self,
        appointment_id: Uuid,
        target: AppointmentStatus,
        actor_id: Uuid,
    ) -> Result<AppliedTransition, WaitingRoomError> {
        debug!(
            "Transition requested: appointment {} -> {} by {}",
            appointment_id, target, actor_id
        );

        let appointment = self
            .read_appointment(appointment_id)
            .await?
            .ok_or(WaitingRoomError::NotFound)?;

        self.table.validate(&appointment.status, &target)?;

        let persisted = self
            .write_status(&appointment, &target, actor_id)
            .await?;

        // Recorded only after the persist succeeded; a cancelled call can
        // never leave a record for a write that didn't happen.
        let record = TransitionRecord {
            correlation_id: Uuid::new_v4(),
            appointment_id,
            from: appointment.status.clone(),
            to: target.clone(),
            actor_id,
            applied_at: self.clock.now(),
        };
        self.applied
            .write()
            .await
            .insert(appointment_id, record.clone());

        let event = StatusChangedEvent {
            correlation_id: record.correlation_id,
            appointment_id,
            from: record.from.clone(),
            to: record.to.clone(),
            actor_id,
            occurred_at: record.applied_at,
        };
        if self.events.send(event).is_err() {
            debug!("No status-changed subscribers; event dropped");
        }

        info!(
            "Appointment {} transitioned {} -> {}",
            appointment_id, record.from, record.to
        );

        Ok(AppliedTransition {
            appointment: persisted,
            record,
        })
    }

    /// Overlay applied-but-unconfirmed transitions onto freshly polled rows,
    /// so a just-applied change never visually reverts for one tick.
    ///
    /// Per record: polled status == `to` means the poll confirmed it, drop
    /// the record; polled status == `from` means the poll raced the write
    /// and lost, overlay `to`; anything else means a newer write happened
    /// elsewhere, the poll wins and the record is dropped. Records past
    /// `max_age` are dropped regardless.
    pub async fn reconcile(
        &self,
        polled: &mut [Appointment],
        now: DateTime<Utc>,
        max_age: ChronoDuration,
    ) {
        let mut applied = self.applied.write().await;
        if applied.is_empty() {
            return;
        }

        applied.retain(|appointment_id, record| {
            if now - record.applied_at > max_age {
                warn!(
                    "Dropping unconfirmed transition record for appointment {} ({} -> {})",
                    appointment_id, record.from, record.to
                );
                return false;
            }

            let Some(appointment) = polled.iter_mut().find(|a| a.id == *appointment_id) else {
                // Not in this poll's window; keep until it ages out.
                return true;
            };

            if appointment.status == record.to {
                debug!(
                    "Poll confirmed transition for appointment {} ({})",
                    appointment_id, record.to
                );
                false
            } else if appointment.status == record.from {
                debug!(
                    "Poll returned stale status for appointment {}; overlaying {}",
                    appointment_id, record.to
                );
                appointment.status = record.to.clone();
                true
            } else {
                debug!(
                    "Appointment {} moved to {} by another actor; discarding record",
                    appointment_id, appointment.status
                );
                false
            }
        });
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StatusChangedEvent> {
        self.events.subscribe()
    }

    pub async fn pending_record_count(&self) -> usize {
        self.applied.read().await.len()
    }

    async fn read_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Appointment>, WaitingRoomError> {
        match timeout(self.storage_timeout, self.store.fetch(appointment_id)).await {
            Ok(result) => result.map_err(map_store_error),
            Err(_) => Err(WaitingRoomError::Timeout {
                seconds: self.storage_timeout.as_secs(),
            }),
        }
    }

    async fn write_status(
        &self,
        appointment: &Appointment,
        target: &AppointmentStatus,
        actor_id: Uuid,
    ) -> Result<Appointment, WaitingRoomError> {
        let write = self.store.update_status_checked(
            appointment.id,
            &appointment.status,
            target,
            actor_id,
        );

        match timeout(self.storage_timeout, write).await {
            Ok(result) => result.map_err(map_store_error),
            Err(_) => Err(WaitingRoomError::Timeout {
                seconds: self.storage_timeout.as_secs(),
            }),
        }
    }
}

fn map_store_error(error: StoreError) -> WaitingRoomError {
    match error {
        StoreError::NotFound => WaitingRoomError::NotFound,
        StoreError::PreconditionFailed => WaitingRoomError::ConcurrentModification,
        StoreError::Unavailable(message) => WaitingRoomError::StorageUnavailable(message),
    }
}
