use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::booking::{day_slots, now, query_date, query_duration, SlotsResponse};
use crate::models::{
    AdvisorSchedule, Appointment, AppointmentRequest, AppointmentStatus, CandidateSlot,
    ContactChoice, PipelineChoice, ScheduleMode, SlotDuration, WallTime, YearMonth,
};
use crate::services::scheduling::check_request;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/advisors/:advisor_id/appointments
#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(advisor_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let month = YearMonth::of(now().date());
    let from = match query.from.as_deref() {
        Some(raw) => query_date(raw)?,
        None => month.first_day(),
    };
    let to = match query.to.as_deref() {
        Some(raw) => query_date(raw)?,
        None => month.last_day(),
    };
    if to < from {
        return Err(AppError::BadRequest("`to` is before `from`".to_string()));
    }

    let appointments = state.appointments.list(&advisor_id, from, to).await?;
    Ok(Json(appointments))
}

#[derive(Deserialize)]
pub struct AppointmentBody {
    pub date: NaiveDate,
    pub start_time: WallTime,
    #[serde(default)]
    pub duration: SlotDuration,
    pub status: Option<AppointmentStatus>,
    pub contact: ContactChoice,
    pub pipeline: PipelineChoice,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl AppointmentBody {
    fn into_request(self, advisor_id: String, fallback_status: AppointmentStatus) -> AppointmentRequest {
        let slot = CandidateSlot::starting_at(self.start_time, self.duration);
        AppointmentRequest {
            advisor_id,
            date: self.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: self.status.unwrap_or(fallback_status),
            contact: self.contact,
            pipeline: self.pipeline,
            description: self.description.filter(|d| !d.trim().is_empty()),
            color: self.color,
        }
    }
}

// POST /api/admin/advisors/:advisor_id/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(advisor_id): Path<String>,
    Json(body): Json<AppointmentBody>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let request = body.into_request(advisor_id, AppointmentStatus::Pending);
    check_request(
        state.schedules.as_ref(),
        state.appointments.as_ref(),
        &request,
        state.admin_policy().overnight,
        None,
        now(),
    )
    .await?;

    let appointment = state.appointments.create(&request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

// PUT /api/admin/appointments/:id
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AppointmentBody>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let existing = state
        .appointments
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))?;
    let request = body.into_request(existing.advisor_id.clone(), existing.status);

    // Status and detail edits keep the slot the appointment already holds.
    let moved = request.date != existing.date
        || request.start_time != existing.start_time
        || request.end_time != existing.end_time;
    let reactivated = !existing.status.is_active() && request.status.is_active();
    if request.status.is_active() && (moved || reactivated) {
        check_request(
            state.schedules.as_ref(),
            state.appointments.as_ref(),
            &request,
            state.admin_policy().overnight,
            Some(&id),
            now(),
        )
        .await?;
    }

    let appointment = state.appointments.update(&id, &request).await?;
    Ok(Json(appointment))
}

// DELETE /api/admin/appointments/:id
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if !state.appointments.delete(&id).await? {
        return Err(AppError::NotFound(format!("appointment {id}")));
    }
    tracing::info!(%id, "appointment deleted");
    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/admin/advisors/:advisor_id/schedule
pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(advisor_id): Path<String>,
    Json(schedule): Json<AdvisorSchedule>,
) -> Result<Json<AdvisorSchedule>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if schedule.mode == ScheduleMode::Custom && schedule.weekly.is_none() {
        return Err(AppError::BadRequest(
            "custom mode requires a weekly schedule".to_string(),
        ));
    }
    state.schedules.update_schedule(&advisor_id, &schedule).await?;
    tracing::info!(%advisor_id, mode = schedule.mode.as_str(), "schedule updated");
    Ok(Json(schedule))
}

// GET /api/admin/advisors/:advisor_id/slots
#[derive(Deserialize)]
pub struct AdminSlotsQuery {
    pub date: String,
    pub duration: Option<u16>,
    // Appointment being edited; its own booking does not block.
    pub exclude: Option<String>,
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(advisor_id): Path<String>,
    Query(query): Query<AdminSlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = query_date(&query.date)?;
    let duration = query_duration(query.duration)?;
    let res = day_slots(
        &state,
        &advisor_id,
        date,
        duration,
        query.exclude.as_deref(),
        state.admin_policy().overnight,
    )
    .await?;
    Ok(Json(res))
}
