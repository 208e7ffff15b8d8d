pub mod admin;
pub mod booking;
pub mod calendar;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/advisors/:advisor_id/schedule",
            get(booking::get_schedule),
        )
        .route("/api/advisors/:advisor_id/slots", get(booking::get_slots))
        .route(
            "/api/advisors/:advisor_id/calendar",
            get(booking::get_calendar),
        )
        .route(
            "/api/advisors/:advisor_id/bookings",
            post(booking::create_booking),
        )
        .route("/calendar/:appointment_id", get(calendar::download_ics))
        .route(
            "/api/admin/advisors/:advisor_id/appointments",
            get(admin::list_appointments).post(admin::create_appointment),
        )
        .route(
            "/api/admin/appointments/:id",
            put(admin::update_appointment).delete(admin::delete_appointment),
        )
        .route(
            "/api/admin/advisors/:advisor_id/schedule",
            put(admin::update_schedule),
        )
        .route(
            "/api/admin/advisors/:advisor_id/slots",
            get(admin::get_slots),
        )
        .with_state(state)
}
