// libs/waiting-room-cell/src/store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::Clock;

use crate::models::{Appointment, AppointmentStatus};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("appointment not found")]
    NotFound,

    #[error("status precondition did not match")]
    PreconditionFailed,

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence collaborator. The persisted status is the only shared mutable
/// resource; every write goes through `update_status_checked`, which carries
/// the expected current status as its optimistic concurrency token.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn list_for_day(
        &self,
        clinic_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn fetch(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Persist `new_status` only if the row still holds `expected_current`.
    async fn update_status_checked(
        &self,
        id: Uuid,
        expected_current: &AppointmentStatus,
        new_status: &AppointmentStatus,
        actor_id: Uuid,
    ) -> Result<Appointment, StoreError>;
}

const APPOINTMENT_SELECT: &str = "id,start_time,end_time,status,reason,\
pet:pets(id,name,species),owner:owners(id,full_name,phone),vet:profiles(id,full_name)";

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
    clock: Arc<dyn Clock>,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            clock,
        }
    }

    /// Status column plus the bookkeeping stamps the dashboard shows for each
    /// stage (arrival, consultation start, completion, cancellation).
    fn status_patch(&self, new_status: &AppointmentStatus, actor_id: Uuid) -> Value {
        let now = self.clock.now().to_rfc3339();
        match new_status {
            AppointmentStatus::CheckedIn => json!({
                "status": new_status,
                "checked_in_at": now,
                "checked_in_by": actor_id,
            }),
            AppointmentStatus::InProgress => json!({
                "status": new_status,
                "started_at": now,
            }),
            AppointmentStatus::Completed => json!({
                "status": new_status,
                "completed_at": now,
            }),
            AppointmentStatus::Cancelled => json!({
                "status": new_status,
                "cancelled_at": now,
            }),
            _ => json!({ "status": new_status }),
        }
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn list_for_day(
        &self,
        clinic_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        let next_day = date + Duration::days(1);
        let path = format!(
            "/rest/v1/appointments?clinic_id=eq.{}&start_time=gte.{}T00:00:00Z&start_time=lt.{}T00:00:00Z&select={}&order=start_time.asc",
            clinic_id, date, next_day, APPOINTMENT_SELECT
        );

        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let (well_formed, malformed): (Vec<_>, Vec<_>) =
            rows.into_iter().partition(|a| a.is_well_formed());
        for appointment in &malformed {
            warn!(
                "Skipping appointment {} with end before start",
                appointment.id
            );
        }

        Ok(well_formed)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&select={}",
            id, APPOINTMENT_SELECT
        );

        let mut rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    async fn update_status_checked(
        &self,
        id: Uuid,
        expected_current: &AppointmentStatus,
        new_status: &AppointmentStatus,
        actor_id: Uuid,
    ) -> Result<Appointment, StoreError> {
        // The status filter makes the PATCH conditional: PostgREST updates
        // nothing when the row no longer holds the expected status.
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}&select={}",
            id, expected_current, APPOINTMENT_SELECT
        );
        let body = self.status_patch(new_status, actor_id);

        let mut rows: Vec<Appointment> = self
            .supabase
            .patch_returning(&path, body)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if rows.is_empty() {
            debug!(
                "Conditional update matched nothing for appointment {} (expected {})",
                id, expected_current
            );
            return Err(StoreError::PreconditionFailed);
        }

        Ok(rows.remove(0))
    }
}
