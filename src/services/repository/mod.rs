pub mod remote;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::BookingError;
use crate::models::{AdvisorSchedule, Appointment, AppointmentRequest, BookedSlot};

pub type RepoResult<T> = Result<T, BookingError>;

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    // `Ok(None)` when the advisor has never saved a schedule.
    async fn get_schedule(&self, advisor_id: &str) -> RepoResult<Option<AdvisorSchedule>>;

    async fn update_schedule(&self, advisor_id: &str, schedule: &AdvisorSchedule) -> RepoResult<()>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    // Inclusive date range.
    async fn list(&self, advisor_id: &str, from: NaiveDate, to: NaiveDate) -> RepoResult<Vec<Appointment>>;

    async fn booked_slots(&self, advisor_id: &str, date: NaiveDate) -> RepoResult<Vec<BookedSlot>>;

    async fn get(&self, id: &str) -> RepoResult<Option<Appointment>>;

    async fn create(&self, request: &AppointmentRequest) -> RepoResult<Appointment>;

    async fn update(&self, id: &str, request: &AppointmentRequest) -> RepoResult<Appointment>;

    async fn delete(&self, id: &str) -> RepoResult<bool>;
}
