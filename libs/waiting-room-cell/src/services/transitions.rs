// libs/waiting-room-cell/src/services/transitions.rs
use tracing::{debug, warn};

use crate::models::{AppointmentStatus, WaitingRoomError};

/// The one place that knows which status moves are legal. Every other
/// component asks this table; none may hard-code a transition rule.
pub struct StatusTransitionTable;

impl StatusTransitionTable {
    /// Total over the full status cross-product; any pair absent from the
    /// table is false, self-transitions included.
    pub fn is_allowed(&self, from: &AppointmentStatus, to: &AppointmentStatus) -> bool {
        self.allowed_transitions(from).contains(to)
    }

    /// All valid next statuses for a given current status.
    pub fn allowed_transitions(&self, from: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match from {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::CheckedIn,
                AppointmentStatus::NoShow,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::CheckedIn => vec![
                AppointmentStatus::InProgress,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::InProgress => vec![
                AppointmentStatus::Completed,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::NoShow => vec![],
        }
    }

    /// Validate that a status transition is allowed
    pub fn validate(
        &self,
        from: &AppointmentStatus,
        to: &AppointmentStatus,
    ) -> Result<(), WaitingRoomError> {
        debug!("Validating status transition from {} to {}", from, to);

        if !self.is_allowed(from, to) {
            warn!("Invalid status transition attempted: {} -> {}", from, to);
            return Err(WaitingRoomError::InvalidTransition {
                from: from.clone(),
                to: to.clone(),
            });
        }

        Ok(())
    }
}
