mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Duration as ChronoDuration;
use uuid::Uuid;

use shared_utils::clock::FixedClock;
use shared_utils::Clock;
use waiting_room_cell::models::{AppointmentStatus, WaitingRoomError};
use waiting_room_cell::services::coordinator::TransitionCoordinator;

use common::{appointment, clinic_day, MemoryAppointmentStore};

fn coordinator_with(
    store: &Arc<MemoryAppointmentStore>,
    timeout_seconds: u64,
) -> (TransitionCoordinator, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::at(clinic_day()));
    let coordinator = TransitionCoordinator::new(
        Arc::clone(store) as Arc<dyn waiting_room_cell::store::AppointmentStore>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        timeout_seconds,
    );
    (coordinator, clock)
}

#[tokio::test]
async fn invalid_target_is_rejected_with_zero_writes() {
    let store = Arc::new(MemoryAppointmentStore::new());
    let pending = appointment(AppointmentStatus::Pending, clinic_day());
    store.insert(pending.clone());
    let (coordinator, _clock) = coordinator_with(&store, 5);

    let result = coordinator
        .request_transition(pending.id, AppointmentStatus::InProgress, Uuid::new_v4())
        .await;

    assert_matches!(
        result,
        Err(WaitingRoomError::InvalidTransition {
            from: AppointmentStatus::Pending,
            to: AppointmentStatus::InProgress,
        })
    );
    assert_eq!(store.writes(), 0, "rejection must not touch storage");
    assert_eq!(store.get(pending.id).unwrap().status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn unknown_appointment_reports_not_found() {
    let store = Arc::new(MemoryAppointmentStore::new());
    let (coordinator, _clock) = coordinator_with(&store, 5);

    let result = coordinator
        .request_transition(Uuid::new_v4(), AppointmentStatus::Confirmed, Uuid::new_v4())
        .await;

    assert_matches!(result, Err(WaitingRoomError::NotFound));
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn successful_transition_persists_records_and_notifies() {
    let store = Arc::new(MemoryAppointmentStore::new());
    let confirmed = appointment(AppointmentStatus::Confirmed, clinic_day());
    store.insert(confirmed.clone());
    let (coordinator, _clock) = coordinator_with(&store, 5);
    let mut events = coordinator.subscribe_events();
    let actor = Uuid::new_v4();

    let applied = coordinator
        .request_transition(confirmed.id, AppointmentStatus::CheckedIn, actor)
        .await
        .expect("confirmed -> checked_in should succeed");

    assert_eq!(applied.appointment.status, AppointmentStatus::CheckedIn);
    assert_eq!(applied.record.from, AppointmentStatus::Confirmed);
    assert_eq!(applied.record.to, AppointmentStatus::CheckedIn);
    assert_eq!(store.writes(), 1, "exactly one conditional write");
    assert_eq!(
        store.get(confirmed.id).unwrap().status,
        AppointmentStatus::CheckedIn
    );
    assert_eq!(coordinator.pending_record_count().await, 1);

    let event = events.recv().await.expect("status-changed event expected");
    assert_eq!(event.appointment_id, confirmed.id);
    assert_eq!(event.correlation_id, applied.record.correlation_id);
    assert_eq!(event.actor_id, actor);
    assert_eq!(event.to, AppointmentStatus::CheckedIn);
}

#[tokio::test(start_paused = true)]
async fn racing_transitions_produce_one_success_and_one_conflict() {
    let store = Arc::new(MemoryAppointmentStore::new());
    let pending = appointment(AppointmentStatus::Pending, clinic_day());
    store.insert(pending.clone());
    // Slow the read so both requests observe the same expected status.
    store.set_fetch_delay(std::time::Duration::from_millis(10));
    let (coordinator, _clock) = coordinator_with(&store, 5);

    let (first, second) = tokio::join!(
        coordinator.request_transition(pending.id, AppointmentStatus::Confirmed, Uuid::new_v4()),
        coordinator.request_transition(pending.id, AppointmentStatus::Confirmed, Uuid::new_v4()),
    );

    let outcomes = [first, second];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(WaitingRoomError::ConcurrentModification)))
        .count();

    assert_eq!(successes, 1, "exactly one writer may win");
    assert_eq!(conflicts, 1, "the loser must see the conflict, not a silent overwrite");
    assert_eq!(store.writes(), 2, "no retries happen inside the coordinator");
    assert_eq!(store.get(pending.id).unwrap().status, AppointmentStatus::Confirmed);
}

#[tokio::test(start_paused = true)]
async fn slow_storage_surfaces_a_timeout() {
    let store = Arc::new(MemoryAppointmentStore::new());
    let pending = appointment(AppointmentStatus::Pending, clinic_day());
    store.insert(pending.clone());
    store.set_fetch_delay(std::time::Duration::from_secs(60));
    let (coordinator, _clock) = coordinator_with(&store, 1);

    let result = coordinator
        .request_transition(pending.id, AppointmentStatus::Confirmed, Uuid::new_v4())
        .await;

    assert_matches!(result, Err(WaitingRoomError::Timeout { seconds: 1 }));
    assert_eq!(store.writes(), 0, "unknown outcome must not come from a fired write");
}

#[tokio::test]
async fn reconcile_overlays_stale_polls_and_drops_confirmed_records() {
    let store = Arc::new(MemoryAppointmentStore::new());
    let confirmed = appointment(AppointmentStatus::Confirmed, clinic_day());
    store.insert(confirmed.clone());
    let (coordinator, clock) = coordinator_with(&store, 5);

    coordinator
        .request_transition(confirmed.id, AppointmentStatus::CheckedIn, Uuid::new_v4())
        .await
        .expect("transition should succeed");

    // Poll raced the write and returned the pre-transition status.
    let mut stale_poll = vec![confirmed.clone()];
    coordinator
        .reconcile(&mut stale_poll, clock.now(), ChronoDuration::minutes(5))
        .await;
    assert_eq!(stale_poll[0].status, AppointmentStatus::CheckedIn);
    assert_eq!(coordinator.pending_record_count().await, 1);

    // A later poll sees the persisted status; the record has done its job.
    let mut fresh_poll = vec![store.get(confirmed.id).unwrap()];
    coordinator
        .reconcile(&mut fresh_poll, clock.now(), ChronoDuration::minutes(5))
        .await;
    assert_eq!(fresh_poll[0].status, AppointmentStatus::CheckedIn);
    assert_eq!(coordinator.pending_record_count().await, 0);
}

#[tokio::test]
async fn reconcile_lets_a_newer_third_party_status_win() {
    let store = Arc::new(MemoryAppointmentStore::new());
    let confirmed = appointment(AppointmentStatus::Confirmed, clinic_day());
    store.insert(confirmed.clone());
    let (coordinator, clock) = coordinator_with(&store, 5);

    coordinator
        .request_transition(confirmed.id, AppointmentStatus::CheckedIn, Uuid::new_v4())
        .await
        .expect("transition should succeed");

    // Another actor moved it further before our next poll.
    let mut cancelled = store.get(confirmed.id).unwrap();
    cancelled.status = AppointmentStatus::Cancelled;
    let mut poll = vec![cancelled];
    coordinator
        .reconcile(&mut poll, clock.now(), ChronoDuration::minutes(5))
        .await;

    assert_eq!(poll[0].status, AppointmentStatus::Cancelled);
    assert_eq!(coordinator.pending_record_count().await, 0);
}

#[tokio::test]
async fn reconcile_ages_out_records_for_vanished_appointments() {
    let store = Arc::new(MemoryAppointmentStore::new());
    let confirmed = appointment(AppointmentStatus::Confirmed, clinic_day());
    store.insert(confirmed.clone());
    let (coordinator, clock) = coordinator_with(&store, 5);

    coordinator
        .request_transition(confirmed.id, AppointmentStatus::CheckedIn, Uuid::new_v4())
        .await
        .expect("transition should succeed");

    // The appointment never shows up in later polls; the record survives
    // until it ages out.
    let mut empty_poll: Vec<waiting_room_cell::models::Appointment> = Vec::new();
    coordinator
        .reconcile(&mut empty_poll, clock.now(), ChronoDuration::minutes(5))
        .await;
    assert_eq!(coordinator.pending_record_count().await, 1);

    clock.advance(ChronoDuration::minutes(10));
    coordinator
        .reconcile(&mut empty_poll, clock.now(), ChronoDuration::minutes(5))
        .await;
    assert_eq!(coordinator.pending_record_count().await, 0);
}
