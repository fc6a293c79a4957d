// libs/waiting-room-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{AppointmentStatus, QueueSnapshot, WaitingRoomError};
use crate::services::wait_time::WaitTimeEstimator;
use crate::services::waiting_room::WaitingRoomService;

// ==============================================================================
// REQUEST STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub target_status: AppointmentStatus,
    pub actor_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct StaffActionRequest {
    pub actor_id: Uuid,
}

// ==============================================================================
// QUEUE HANDLERS
// ==============================================================================

/// Current waiting-room snapshot plus the status display lookup the
/// dashboard styles every row with.
#[axum::debug_handler]
pub async fn get_waiting_room(
    State(service): State<Arc<WaitingRoomService>>,
) -> Result<Json<Value>, AppError> {
    let snapshot = service.snapshot();

    Ok(Json(json!({
        "success": true,
        "snapshot": snapshot,
        "active_count": snapshot.active_count(),
        "wait_times": wait_time_table(&snapshot),
        "status_display": status_display_table(),
    })))
}

/// Kick off an immediate re-read; coalesces with any poll in flight.
#[axum::debug_handler]
pub async fn refresh_waiting_room(
    State(service): State<Arc<WaitingRoomService>>,
) -> Result<Json<Value>, AppError> {
    service.refresh_now();

    Ok(Json(json!({
        "success": true,
        "message": "Refresh requested"
    })))
}

// ==============================================================================
// TRANSITION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(service): State<Arc<WaitingRoomService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    apply_transition(&service, appointment_id, request.target_status, request.actor_id).await
}

/// Mark a patient as arrived.
#[axum::debug_handler]
pub async fn check_in_appointment(
    State(service): State<Arc<WaitingRoomService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StaffActionRequest>,
) -> Result<Json<Value>, AppError> {
    apply_transition(&service, appointment_id, AppointmentStatus::CheckedIn, request.actor_id).await
}

/// Pull the patient from the waiting room into consultation.
#[axum::debug_handler]
pub async fn start_appointment(
    State(service): State<Arc<WaitingRoomService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StaffActionRequest>,
) -> Result<Json<Value>, AppError> {
    apply_transition(&service, appointment_id, AppointmentStatus::InProgress, request.actor_id).await
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(service): State<Arc<WaitingRoomService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StaffActionRequest>,
) -> Result<Json<Value>, AppError> {
    apply_transition(&service, appointment_id, AppointmentStatus::Completed, request.actor_id).await
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(service): State<Arc<WaitingRoomService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StaffActionRequest>,
) -> Result<Json<Value>, AppError> {
    apply_transition(&service, appointment_id, AppointmentStatus::Confirmed, request.actor_id).await
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(service): State<Arc<WaitingRoomService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StaffActionRequest>,
) -> Result<Json<Value>, AppError> {
    apply_transition(&service, appointment_id, AppointmentStatus::Cancelled, request.actor_id).await
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(service): State<Arc<WaitingRoomService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StaffActionRequest>,
) -> Result<Json<Value>, AppError> {
    apply_transition(&service, appointment_id, AppointmentStatus::NoShow, request.actor_id).await
}

// ==============================================================================
// HELPERS
// ==============================================================================

async fn apply_transition(
    service: &WaitingRoomService,
    appointment_id: Uuid,
    target: AppointmentStatus,
    actor_id: Uuid,
) -> Result<Json<Value>, AppError> {
    let applied = service
        .request_transition(appointment_id, target, actor_id)
        .await
        .map_err(map_waiting_room_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": applied.appointment,
        "correlation_id": applied.record.correlation_id,
        "message": format!("Appointment is now {}", applied.appointment.status)
    })))
}

fn map_waiting_room_error(error: WaitingRoomError) -> AppError {
    match error {
        WaitingRoomError::NotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        WaitingRoomError::InvalidTransition { ref from, ref to } => {
            AppError::Unprocessable(format!("Cannot move appointment from {} to {}", from, to))
        }
        WaitingRoomError::ConcurrentModification => {
            AppError::Conflict("Appointment was changed by someone else; refresh and retry".to_string())
        }
        WaitingRoomError::Timeout { seconds } => {
            AppError::Timeout(format!("Storage did not answer within {} seconds", seconds))
        }
        WaitingRoomError::StorageUnavailable(message) => AppError::ExternalService(message),
    }
}

/// "waiting N min" strings for everyone physically in the clinic, keyed by
/// appointment id and measured against the snapshot's own timestamp.
fn wait_time_table(snapshot: &QueueSnapshot) -> Value {
    let mut table = Map::new();
    for appointment in snapshot.waiting.iter().chain(snapshot.in_progress.iter()) {
        let estimate =
            WaitTimeEstimator.elapsed_or_until(appointment.start_time, snapshot.generated_at);
        table.insert(
            appointment.id.to_string(),
            Value::String(estimate.to_display_string()),
        );
    }
    Value::Object(table)
}

fn status_display_table() -> Value {
    let mut table = Map::new();
    for status in &AppointmentStatus::ALL {
        let display = status.display();
        table.insert(
            status.to_string(),
            json!({
                "label": display.label,
                "color": display.color,
                "icon": display.icon,
            }),
        );
    }
    Value::Object(table)
}
