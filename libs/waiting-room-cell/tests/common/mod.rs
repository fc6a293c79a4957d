#![allow(dead_code)]

//! Fixtures shared across the waiting-room test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use waiting_room_cell::models::{Appointment, AppointmentStatus, OwnerRef, PatientRef, VetRef};
use waiting_room_cell::store::{AppointmentStore, StoreError};

pub fn clinic_day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
}

pub fn appointment(status: AppointmentStatus, start: DateTime<Utc>) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        start_time: start,
        end_time: start + chrono::Duration::minutes(30),
        status,
        reason: Some("Annual vaccination".to_string()),
        pet: PatientRef {
            id: Uuid::new_v4(),
            name: "Luna".to_string(),
            species: "dog".to_string(),
        },
        owner: OwnerRef {
            id: Uuid::new_v4(),
            full_name: "Maria Benitez".to_string(),
            phone: Some("+595981234567".to_string()),
        },
        vet: Some(VetRef {
            id: Uuid::new_v4(),
            full_name: "Dr. Ana Rojas".to_string(),
        }),
    }
}

/// In-memory store doubling as a spy: counts calls, injects failures,
/// delays, and canned stale list responses.
pub struct MemoryAppointmentStore {
    rows: Mutex<HashMap<Uuid, Appointment>>,
    canned_list: Mutex<Option<Vec<Appointment>>>,
    list_failures_remaining: AtomicUsize,
    fetch_delay: Mutex<Option<std::time::Duration>>,
    pub list_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
}

impl MemoryAppointmentStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            canned_list: Mutex::new(None),
            list_failures_remaining: AtomicUsize::new(0),
            fetch_delay: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, appointment: Appointment) {
        self.rows
            .lock()
            .unwrap()
            .insert(appointment.id, appointment);
    }

    pub fn get(&self, id: Uuid) -> Option<Appointment> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    /// Until cleared, `list_for_day` returns this frozen response instead of
    /// the live rows. Lets a test hand the poller deliberately stale data.
    pub fn set_canned_list(&self, appointments: Vec<Appointment>) {
        *self.canned_list.lock().unwrap() = Some(appointments);
    }

    pub fn clear_canned_list(&self) {
        *self.canned_list.lock().unwrap() = None;
    }

    pub fn fail_next_lists(&self, count: usize) {
        self.list_failures_remaining.store(count, Ordering::SeqCst);
    }

    pub fn set_fetch_delay(&self, delay: std::time::Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    pub fn writes(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn list_for_day(
        &self,
        _clinic_id: &str,
        _date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.list_failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.list_failures_remaining
                .store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }

        if let Some(canned) = self.canned_list.lock().unwrap().clone() {
            return Ok(canned);
        }

        let mut appointments: Vec<Appointment> =
            self.rows.lock().unwrap().values().cloned().collect();
        appointments.sort_by_key(|a| a.start_time);
        Ok(appointments)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        // The row is read when the request goes out; the delay models the
        // response still being in flight.
        let row = self.rows.lock().unwrap().get(&id).cloned();

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(row)
    }

    async fn update_status_checked(
        &self,
        id: Uuid,
        expected_current: &AppointmentStatus,
        new_status: &AppointmentStatus,
        _actor_id: Uuid,
    ) -> Result<Appointment, StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).ok_or(StoreError::NotFound)?;

        if row.status != *expected_current {
            return Err(StoreError::PreconditionFailed);
        }

        row.status = new_status.clone();
        Ok(row.clone())
    }
}
