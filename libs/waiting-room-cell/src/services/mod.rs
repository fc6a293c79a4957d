pub mod coordinator;
pub mod grouping;
pub mod poller;
pub mod transitions;
pub mod wait_time;
pub mod waiting_room;
