use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::errors::AppError;
use crate::models::AdvisorSchedule;
use crate::services::ics::generate_ics;
use crate::state::AppState;

// GET /calendar/:appointment_id(.ics)
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let appointment_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let appointment = state
        .appointments
        .get(appointment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("appointment {appointment_id}")))?;

    let schedule = state
        .schedules
        .get_schedule(&appointment.advisor_id)
        .await?
        .unwrap_or_else(AdvisorSchedule::missing);
    let ics = generate_ics(&appointment, &schedule, &state.config.business_name);
    let filename = format!("appointment-{appointment_id}.ics");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
