use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, BookingError};
use crate::models::time::parse_date;
use crate::models::{
    AdvisorSchedule, Appointment, ContactChoice, FormEdit, MonthGrid, ScheduleMode, SlotDuration,
    SlotView, WallTime, WeeklySchedule, YearMonth,
};
use crate::services::availability::{slots_for_day, DayBookings};
use crate::services::calendar::{appointment_dates, build_month_grid};
use crate::services::coordinator::Notice;
use crate::services::slots::OvernightPolicy;
use crate::state::AppState;

pub(crate) fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub(crate) fn query_date(raw: &str) -> Result<NaiveDate, AppError> {
    parse_date(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

pub(crate) fn query_duration(raw: Option<u16>) -> Result<SlotDuration, AppError> {
    match raw {
        None => Ok(SlotDuration::default()),
        Some(m) => SlotDuration::from_minutes(m)
            .ok_or_else(|| AppError::BadRequest(format!("unsupported duration: {m} minutes"))),
    }
}

// GET /api/advisors/:advisor_id/schedule
#[derive(Serialize)]
pub struct ScheduleResponse {
    mode: ScheduleMode,
    weekly: Option<WeeklySchedule>,
    summary: Option<String>,
}

pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(advisor_id): Path<String>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let schedule = state
        .schedules
        .get_schedule(&advisor_id)
        .await?
        .ok_or(BookingError::MissingSchedule(advisor_id))?;

    Ok(Json(ScheduleResponse {
        mode: schedule.mode,
        summary: schedule.weekly.as_ref().map(WeeklySchedule::to_human_readable),
        weekly: schedule.weekly,
    }))
}

// GET /api/advisors/:advisor_id/slots
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
    pub duration: Option<u16>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub duration: SlotDuration,
    pub slots: Vec<SlotView>,
    pub notice: Option<String>,
}

pub(crate) async fn day_slots(
    state: &AppState,
    advisor_id: &str,
    date: NaiveDate,
    duration: SlotDuration,
    exclude: Option<&str>,
    policy: OvernightPolicy,
) -> Result<SlotsResponse, AppError> {
    let (schedule, notice) = match state.schedules.get_schedule(advisor_id).await? {
        Some(schedule) => (schedule, None),
        None => {
            tracing::warn!(advisor_id, "no schedule found, returning no slots");
            let err = BookingError::MissingSchedule(advisor_id.to_string());
            (AdvisorSchedule::missing(), Some(err.to_string()))
        }
    };

    let booked = state.appointments.booked_slots(advisor_id, date).await?;
    let appointments = state.appointments.list(advisor_id, date, date).await?;
    let day = DayBookings::new(date, &booked, &appointments).excluding(exclude);

    Ok(SlotsResponse {
        date,
        duration,
        slots: slots_for_day(&schedule, duration, policy, &day, now()),
        notice,
    })
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(advisor_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let date = query_date(&query.date)?;
    let duration = query_duration(query.duration)?;
    let policy = state.public_policy().overnight;
    let res = day_slots(&state, &advisor_id, date, duration, None, policy).await?;
    Ok(Json(res))
}

// GET /api/advisors/:advisor_id/calendar
#[derive(Deserialize)]
pub struct CalendarQuery {
    pub month: Option<String>,
    pub selected: Option<String>,
}

pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Path(advisor_id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<MonthGrid>, AppError> {
    let today = now().date();
    let month = match query.month.as_deref() {
        Some(raw) => YearMonth::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))?,
        None => YearMonth::of(today),
    };
    let selected = query.selected.as_deref().map(query_date).transpose()?;

    let schedule = state
        .schedules
        .get_schedule(&advisor_id)
        .await?
        .unwrap_or_else(AdvisorSchedule::missing);
    let appointments = state
        .appointments
        .list(&advisor_id, month.first_day(), month.last_day())
        .await?;

    Ok(Json(build_month_grid(
        month,
        selected,
        &appointment_dates(&appointments),
        &schedule,
        today,
    )))
}

// POST /api/advisors/:advisor_id/bookings
#[derive(Deserialize)]
pub struct PublicBookingBody {
    pub date: NaiveDate,
    pub start_time: WallTime,
    #[serde(default)]
    pub duration: SlotDuration,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
}

// Drives a public-surface coordinator through one booking.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Path(advisor_id): Path<String>,
    Json(body): Json<PublicBookingBody>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let mut coordinator = state.coordinator(&advisor_id, state.public_policy());
    coordinator.open(Some(body.date)).await;

    if coordinator.state().date != Some(body.date) {
        if let Some(Notice::Error(err)) = &coordinator.state().notice {
            return Err(err.clone().into());
        }
        return Err(BookingError::Conflict.into());
    }

    coordinator.change_duration(body.duration);
    let slot = coordinator
        .state()
        .slots
        .iter()
        .find(|v| v.start_time == body.start_time)
        .map(SlotView::slot);
    if !slot.is_some_and(|s| coordinator.select_slot(s)) {
        return Err(BookingError::Conflict.into());
    }

    coordinator.edit_form(FormEdit::Contact(Some(ContactChoice::New {
        email: body.email.trim().to_lowercase(),
        name: body.name,
        phone: body.phone,
    })));
    coordinator.edit_form(FormEdit::Description(body.description));

    let appointment = coordinator.submit().await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}
