pub mod models;
pub mod services;
pub mod store;
pub mod handlers;
pub mod router;

pub use models::*;
pub use router::waiting_room_routes;
pub use services::waiting_room::WaitingRoomService;
pub use store::{AppointmentStore, StoreError, SupabaseAppointmentStore};
