use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingField {
    Date,
    Slot,
    Contact,
    Pipeline,
}

impl fmt::Display for BookingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingField::Date => "date",
            BookingField::Slot => "time slot",
            BookingField::Contact => "contact",
            BookingField::Pipeline => "pipeline",
        };
        f.write_str(name)
    }
}

fn join_fields(fields: &[BookingField]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookingError {
    #[error("please provide: {}", join_fields(.missing))]
    Validation { missing: Vec<BookingField> },

    #[error("invalid booking: {0}")]
    Invalid(String),

    #[error("that time slot is no longer available, please pick another")]
    Conflict,

    #[error("network error: {0}")]
    Network(String),

    #[error("no schedule found for advisor {0}")]
    MissingSchedule(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Booking(BookingError::Validation { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Booking(BookingError::Invalid(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Booking(BookingError::Conflict) => StatusCode::CONFLICT,
            AppError::Booking(BookingError::Network(_)) => StatusCode::BAD_GATEWAY,
            AppError::Booking(BookingError::MissingSchedule(_)) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
