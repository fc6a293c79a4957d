use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use waiting_room_cell::{waiting_room_routes, WaitingRoomService};

pub fn create_router(waiting_room: Arc<WaitingRoomService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic waiting-room API is running!" }))
        .nest("/dashboard", waiting_room_routes(waiting_room))
}
