// libs/waiting-room-cell/src/services/grouping.rs
use chrono::{DateTime, Utc};

use crate::models::{Appointment, AppointmentStatus, QueueSnapshot};

/// Buckets one clinic-day's appointments by declared status. No business-rule
/// inference happens here: a pending appointment whose start time has passed
/// stays in `upcoming` until someone explicitly transitions it.
pub struct QueueGrouperService;

impl QueueGrouperService {
    pub fn new() -> Self {
        Self
    }

    pub fn group(
        &self,
        appointments: Vec<Appointment>,
        generated_at: DateTime<Utc>,
    ) -> QueueSnapshot {
        let mut snapshot = QueueSnapshot::empty(generated_at);

        for appointment in appointments {
            match appointment.status {
                AppointmentStatus::CheckedIn => snapshot.waiting.push(appointment),
                AppointmentStatus::InProgress => snapshot.in_progress.push(appointment),
                AppointmentStatus::Pending | AppointmentStatus::Confirmed => {
                    snapshot.upcoming.push(appointment)
                }
                AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
                | AppointmentStatus::NoShow => snapshot.completed.push(appointment),
            }
        }

        // Stable sort: same-minute appointments keep their insertion order.
        snapshot.upcoming.sort_by_key(|a| a.start_time);

        snapshot
    }
}

impl Default for QueueGrouperService {
    fn default() -> Self {
        Self::new()
    }
}
