// libs/waiting-room-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::services::waiting_room::WaitingRoomService;

pub fn waiting_room_routes(service: Arc<WaitingRoomService>) -> Router {
    Router::new()
        // Queue view
        .route("/waiting-room", get(handlers::get_waiting_room))
        .route("/waiting-room/refresh", post(handlers::refresh_waiting_room))

        // Generic transition endpoint
        .route("/appointments/{appointment_id}/status", post(handlers::update_appointment_status))

        // Staff workflow actions
        .route("/appointments/{appointment_id}/confirm", post(handlers::confirm_appointment))
        .route("/appointments/{appointment_id}/check-in", post(handlers::check_in_appointment))
        .route("/appointments/{appointment_id}/start", post(handlers::start_appointment))
        .route("/appointments/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/appointments/{appointment_id}/no-show", post(handlers::mark_no_show))
        .route("/appointments/{appointment_id}/cancel", post(handlers::cancel_appointment))

        .with_state(service)
}
