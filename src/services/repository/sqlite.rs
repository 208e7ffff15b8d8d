use std::sync::MutexGuard;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;

use super::{AppointmentRepository, RepoResult, ScheduleRepository};
use crate::db::{queries, Db};
use crate::errors::BookingError;
use crate::models::{
    AdvisorSchedule, Appointment, AppointmentRequest, BookedSlot, CandidateSlot, ContactChoice,
    PipelineChoice,
};
use crate::services::scheduling::{find_overlap, neighbouring_days};

// Local collaborator backed by the service's own sqlite database.
#[derive(Clone)]
pub struct SqliteRepository {
    db: Db,
}

fn storage_err(e: anyhow::Error) -> BookingError {
    tracing::error!(error = %e, "sqlite repository failure");
    BookingError::Network(e.to_string())
}

impl SqliteRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn conn(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| BookingError::Network("database lock poisoned".to_string()))
    }

    fn resolve_contact(conn: &Connection, contact: &ContactChoice) -> anyhow::Result<String> {
        match contact {
            ContactChoice::Existing { customer_id } => Ok(customer_id.clone()),
            ContactChoice::New { email, name, phone } => {
                queries::find_or_create_customer(conn, email, name.as_deref(), phone.as_deref())
            }
        }
    }

    fn resolve_pipeline(conn: &Connection, pipeline: &PipelineChoice) -> anyhow::Result<(String, String)> {
        match pipeline {
            PipelineChoice::Existing {
                pipeline_id,
                stage_id,
            } => Ok((pipeline_id.clone(), stage_id.clone())),
            PipelineChoice::New { name } => queries::create_pipeline(conn, name),
        }
    }

    fn ensure_free(conn: &Connection, request: &AppointmentRequest, exclude_id: Option<&str>) -> RepoResult<()> {
        let schedule = queries::get_schedule(conn, &request.advisor_id)
            .map_err(storage_err)?
            .unwrap_or_else(AdvisorSchedule::missing);
        let (from, to) = neighbouring_days(request.date);
        let nearby = queries::list_appointments(conn, &request.advisor_id, from, to).map_err(storage_err)?;
        let slot = CandidateSlot {
            start_time: request.start_time,
            end_time: request.end_time,
        };
        if let Some(existing) = find_overlap(&nearby, &schedule, request.date, &slot, exclude_id) {
            tracing::warn!(
                advisor_id = %request.advisor_id,
                date = %request.date,
                slot = %slot.label(),
                existing_id = %existing.id,
                "appointment overlaps an existing booking"
            );
            return Err(BookingError::Conflict);
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleRepository for SqliteRepository {
    async fn get_schedule(&self, advisor_id: &str) -> RepoResult<Option<AdvisorSchedule>> {
        let conn = self.conn()?;
        queries::get_schedule(&conn, advisor_id).map_err(storage_err)
    }

    async fn update_schedule(&self, advisor_id: &str, schedule: &AdvisorSchedule) -> RepoResult<()> {
        let conn = self.conn()?;
        queries::save_schedule(&conn, advisor_id, schedule).map_err(storage_err)
    }
}

#[async_trait]
impl AppointmentRepository for SqliteRepository {
    async fn list(&self, advisor_id: &str, from: NaiveDate, to: NaiveDate) -> RepoResult<Vec<Appointment>> {
        let conn = self.conn()?;
        queries::list_appointments(&conn, advisor_id, from, to).map_err(storage_err)
    }

    async fn booked_slots(&self, advisor_id: &str, date: NaiveDate) -> RepoResult<Vec<BookedSlot>> {
        let conn = self.conn()?;
        queries::get_booked_slots(&conn, advisor_id, date).map_err(storage_err)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Appointment>> {
        let conn = self.conn()?;
        queries::get_appointment(&conn, id).map_err(storage_err)
    }

    async fn create(&self, request: &AppointmentRequest) -> RepoResult<Appointment> {
        let conn = self.conn()?;
        // Customer, pipeline and appointment are written together or not at all.
        let tx = conn.unchecked_transaction().map_err(|e| storage_err(e.into()))?;
        Self::ensure_free(&tx, request, None)?;

        let customer_id = Self::resolve_contact(&tx, &request.contact).map_err(storage_err)?;
        let (pipeline_id, stage_id) =
            Self::resolve_pipeline(&tx, &request.pipeline).map_err(storage_err)?;

        let now = Utc::now().naive_utc();
        let appointment = Appointment {
            id: uuid::Uuid::new_v4().to_string(),
            advisor_id: request.advisor_id.clone(),
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            status: request.status,
            customer_id: Some(customer_id),
            pipeline_id: Some(pipeline_id),
            stage_id: Some(stage_id),
            description: request.description.clone(),
            color: request.color.clone(),
            created_at: now,
            updated_at: now,
        };
        queries::create_appointment(&tx, &appointment).map_err(storage_err)?;
        tx.commit().map_err(|e| storage_err(e.into()))?;

        tracing::info!(id = %appointment.id, advisor_id = %appointment.advisor_id, "appointment created");
        Ok(appointment)
    }

    async fn update(&self, id: &str, request: &AppointmentRequest) -> RepoResult<Appointment> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction().map_err(|e| storage_err(e.into()))?;
        let Some(existing) = queries::get_appointment(&tx, id).map_err(storage_err)? else {
            return Err(BookingError::Invalid(format!("appointment {id} does not exist")));
        };
        Self::ensure_free(&tx, request, Some(id))?;

        let customer_id = Self::resolve_contact(&tx, &request.contact).map_err(storage_err)?;
        let (pipeline_id, stage_id) =
            Self::resolve_pipeline(&tx, &request.pipeline).map_err(storage_err)?;

        let appointment = Appointment {
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            status: request.status,
            customer_id: Some(customer_id),
            pipeline_id: Some(pipeline_id),
            stage_id: Some(stage_id),
            description: request.description.clone(),
            color: request.color.clone(),
            updated_at: Utc::now().naive_utc(),
            ..existing
        };
        queries::update_appointment(&tx, &appointment).map_err(storage_err)?;
        tx.commit().map_err(|e| storage_err(e.into()))?;

        tracing::info!(id = %appointment.id, "appointment updated");
        Ok(appointment)
    }

    async fn delete(&self, id: &str) -> RepoResult<bool> {
        let conn = self.conn()?;
        queries::delete_appointment(&conn, id).map_err(storage_err)
    }
}
