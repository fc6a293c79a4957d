// libs/waiting-room-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::services::transitions::StatusTransitionTable;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub pet: PatientRef,
    pub owner: OwnerRef,
    pub vet: Option<VetRef>,
}

impl Appointment {
    pub fn current_status(&self) -> &AppointmentStatus {
        &self.status
    }

    /// Whether the transition table allows moving this appointment to `target`.
    pub fn can_transition_to(&self, target: &AppointmentStatus) -> bool {
        StatusTransitionTable.is_allowed(&self.status, target)
    }

    /// Produce a new aggregate value with the status replaced. The receiver is
    /// never mutated; concurrent readers holding the old value keep seeing it.
    pub fn with_status(&self, target: AppointmentStatus) -> Result<Appointment, WaitingRoomError> {
        if !self.can_transition_to(&target) {
            return Err(WaitingRoomError::InvalidTransition {
                from: self.status.clone(),
                to: target,
            });
        }

        Ok(Appointment {
            status: target,
            ..self.clone()
        })
    }

    /// `end_time >= start_time` must hold for every stored appointment.
    pub fn is_well_formed(&self) -> bool {
        self.end_time >= self.start_time
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRef {
    pub id: Uuid,
    pub name: String,
    pub species: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VetRef {
    pub id: Uuid,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 7] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::CheckedIn,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    /// Terminal statuses have no outgoing transitions in the table.
    pub fn is_terminal(&self) -> bool {
        StatusTransitionTable.allowed_transitions(self).is_empty()
    }

    /// Presentation metadata for this status. A single lookup keyed by the
    /// enum; the transition table stays the only behavioral authority.
    pub fn display(&self) -> StatusDisplay {
        match self {
            AppointmentStatus::Pending => StatusDisplay {
                label: "Pending",
                color: "yellow",
                icon: "clock",
            },
            AppointmentStatus::Confirmed => StatusDisplay {
                label: "Confirmed",
                color: "blue",
                icon: "check-circle",
            },
            AppointmentStatus::CheckedIn => StatusDisplay {
                label: "Waiting",
                color: "purple",
                icon: "log-in",
            },
            AppointmentStatus::InProgress => StatusDisplay {
                label: "In Consultation",
                color: "green",
                icon: "stethoscope",
            },
            AppointmentStatus::Completed => StatusDisplay {
                label: "Completed",
                color: "gray",
                icon: "check-circle",
            },
            AppointmentStatus::Cancelled => StatusDisplay {
                label: "Cancelled",
                color: "red",
                icon: "x-circle",
            },
            AppointmentStatus::NoShow => StatusDisplay {
                label: "No Show",
                color: "orange",
                icon: "alert-circle",
            },
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::CheckedIn => write!(f, "checked_in"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusDisplay {
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

// ==============================================================================
// QUEUE SNAPSHOT MODELS
// ==============================================================================

/// Point-in-time grouping of one clinic-day's appointments. Snapshots are
/// replaced wholesale on every poll; they are never edited in place.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub waiting: Vec<Appointment>,
    pub in_progress: Vec<Appointment>,
    pub upcoming: Vec<Appointment>,
    pub completed: Vec<Appointment>,
    pub generated_at: DateTime<Utc>,
    pub stale: bool,
    pub last_error: Option<String>,
}

impl QueueSnapshot {
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            waiting: Vec::new(),
            in_progress: Vec::new(),
            upcoming: Vec::new(),
            completed: Vec::new(),
            generated_at,
            stale: false,
            last_error: None,
        }
    }

    /// Patients still moving through the day, i.e. everything not yet done.
    pub fn active_count(&self) -> usize {
        self.waiting.len() + self.in_progress.len() + self.upcoming.len()
    }

    pub fn total(&self) -> usize {
        self.active_count() + self.completed.len()
    }

    /// Same snapshot, flagged stale after a failed poll.
    pub fn as_stale(&self, error: String) -> Self {
        Self {
            stale: true,
            last_error: Some(error),
            ..self.clone()
        }
    }
}

// ==============================================================================
// TRANSITION MODELS
// ==============================================================================

/// One applied status change, kept in memory until a poll independently
/// confirms it. `correlation_id` lets a caller track its own in-flight
/// requests without any shared "currently updating" flag.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    pub correlation_id: Uuid,
    pub appointment_id: Uuid,
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    pub actor_id: Uuid,
    pub applied_at: DateTime<Utc>,
}

/// Fire-and-forget event published after a successful transition. Delivery,
/// retry, and channel selection belong to whoever subscribes.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChangedEvent {
    pub correlation_id: Uuid,
    pub appointment_id: Uuid,
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    pub actor_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

/// Successful outcome of a transition request: the fresh aggregate plus the
/// record the poller reconciles against.
#[derive(Debug, Clone)]
pub struct AppliedTransition {
    pub appointment: Appointment,
    pub record: TransitionRecord,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum WaitingRoomError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment was modified by another actor")]
    ConcurrentModification,

    #[error("Storage operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}
