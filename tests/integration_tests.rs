use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde_json::{json, Value};
use tower::ServiceExt;

use advisorbook::config::AppConfig;
use advisorbook::db;
use advisorbook::handlers;
use advisorbook::state::AppState;

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        remote_api_url: String::new(),
        remote_api_token: String::new(),
        seed_horizon_days: 30,
        public_overnight_slots: false,
        public_pipeline_id: "web".to_string(),
        public_stage_id: "lead".to_string(),
        business_name: "Acme Advisory".to_string(),
    }
}

fn test_state_with(config: AppConfig) -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState::with_sqlite(config, conn))
}

fn test_state() -> Arc<AppState> {
    test_state_with(test_config())
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

// Strictly after today, so it is never "past" regardless of the hour.
fn next_weekday(day: Weekday) -> NaiveDate {
    let today = chrono::Local::now().date_naive();
    (1..=7)
        .map(|offset| today + Duration::days(offset))
        .find(|d| d.weekday() == day)
        .unwrap()
}

fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", "Bearer test-token");
    match body {
        Some(v) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn public_get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn public_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, Value) {
    let res = test_app(Arc::clone(state)).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

// Monday 09:00-12:00 and Thursday 22:00-02:00; every other day closed.
fn mon_thu_schedule() -> Value {
    let day = |name: &str, start: Option<&str>, end: Option<&str>, open: bool| {
        json!({"weekday": name, "start": start, "end": end, "is_available": open})
    };
    json!({
        "mode": "custom",
        "weekly": [
            day("mon", Some("09:00"), Some("12:00"), true),
            day("tue", None, None, false),
            day("wed", None, None, false),
            day("thu", Some("22:00"), Some("02:00"), true),
            day("fri", None, None, false),
            day("sat", None, None, false),
            day("sun", None, None, false),
        ]
    })
}

async fn seed_schedule(state: &Arc<AppState>) {
    let (status, _) = send(
        state,
        admin("PUT", "/api/admin/advisors/adv-1/schedule", Some(mon_thu_schedule())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn admin_create(state: &Arc<AppState>, date: NaiveDate, start: &str, duration: u16) -> (StatusCode, Value) {
    send(
        state,
        admin(
            "POST",
            "/api/admin/advisors/adv-1/appointments",
            Some(json!({
                "date": date.to_string(),
                "start_time": start,
                "duration": duration,
                "status": "confirmed",
                "contact": {"kind": "existing", "customer_id": "cust-1"},
                "pipeline": {"kind": "new", "name": "Retirement planning"},
                "description": "Portfolio review"
            })),
        ),
    )
    .await
}

fn slot_labels(slots: &Value, available: bool) -> Vec<String> {
    slots["slots"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["available"] == available)
        .map(|s| format!("{}-{}", s["start_time"].as_str().unwrap(), s["end_time"].as_str().unwrap()))
        .collect()
}

fn find_cell(grid: &Value, date: NaiveDate) -> Value {
    grid["weeks"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|w| w.as_array().unwrap().iter())
        .find(|c| c["date"] == date.to_string())
        .cloned()
        .unwrap()
}

// ── Health & Auth ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let (status, body) = send(&state, public_get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_admin_requires_auth() {
    let state = test_state();
    let (status, _) = send(&state, public_get("/api/admin/advisors/adv-1/appointments")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_wrong_token() {
    let state = test_state();
    let req = Request::builder()
        .uri("/api/admin/advisors/adv-1/appointments")
        .header("Authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

// ── Schedule ──

#[tokio::test]
async fn test_missing_schedule_degrades_to_no_slots() {
    let state = test_state();
    let monday = next_weekday(Weekday::Mon);

    let (status, _) = send(&state, public_get("/api/advisors/adv-1/schedule")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &state,
        public_get(&format!("/api/advisors/adv-1/slots?date={monday}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["slots"].as_array().unwrap().is_empty());
    assert!(body["notice"].as_str().unwrap().contains("no schedule"));
}

#[tokio::test]
async fn test_schedule_roundtrip_and_summary() {
    let state = test_state();
    seed_schedule(&state).await;

    let (status, body) = send(&state, public_get("/api/advisors/adv-1/schedule")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "custom");
    assert_eq!(body["weekly"].as_array().unwrap().len(), 7);
    assert_eq!(body["summary"], "Mon: 09:00-12:00, Thu: 22:00-02:00");
}

#[tokio::test]
async fn test_schedule_rejects_incomplete_week() {
    let state = test_state();
    let (status, _) = send(
        &state,
        admin(
            "PUT",
            "/api/admin/advisors/adv-1/schedule",
            Some(json!({"mode": "custom", "weekly": null})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let short = json!({
        "mode": "custom",
        "weekly": [{"weekday": "mon", "start": "09:00", "end": "12:00", "is_available": true}]
    });
    let (status, _) = send(&state, admin("PUT", "/api/admin/advisors/adv-1/schedule", Some(short))).await;
    assert!(status.is_client_error());
}

// ── Slots ──

#[tokio::test]
async fn test_monday_slots_with_existing_appointment() {
    let state = test_state();
    seed_schedule(&state).await;
    let monday = next_weekday(Weekday::Mon);

    let (status, created) = admin_create(&state, monday, "10:00", 30).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["end_time"], "10:30");

    let (status, body) = send(
        &state,
        public_get(&format!("/api/advisors/adv-1/slots?date={monday}&duration=30")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots"].as_array().unwrap().len(), 6);
    assert_eq!(slot_labels(&body, false), vec!["10:00-10:30"]);
    assert_eq!(slot_labels(&body, true).len(), 5);
}

#[tokio::test]
async fn test_slots_reject_unsupported_duration() {
    let state = test_state();
    seed_schedule(&state).await;
    let monday = next_weekday(Weekday::Mon);
    let (status, _) = send(
        &state,
        public_get(&format!("/api/advisors/adv-1/slots?date={monday}&duration=50")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overnight_window_admin_wraps_public_does_not() {
    let state = test_state();
    seed_schedule(&state).await;
    let thursday = next_weekday(Weekday::Thu);

    let (_, public) = send(
        &state,
        public_get(&format!("/api/advisors/adv-1/slots?date={thursday}&duration=60")),
    )
    .await;
    assert!(public["slots"].as_array().unwrap().is_empty());

    let (status, admin_slots) = send(
        &state,
        admin("GET", &format!("/api/admin/advisors/adv-1/slots?date={thursday}&duration=60"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        slot_labels(&admin_slots, true),
        vec!["22:00-23:00", "23:00-00:00", "00:00-01:00", "01:00-02:00"]
    );
}

#[tokio::test]
async fn test_public_overnight_slots_when_enabled() {
    let mut config = test_config();
    config.public_overnight_slots = true;
    let state = test_state_with(config);
    seed_schedule(&state).await;
    let thursday = next_weekday(Weekday::Thu);

    let (_, body) = send(
        &state,
        public_get(&format!("/api/advisors/adv-1/slots?date={thursday}&duration=120")),
    )
    .await;
    assert_eq!(slot_labels(&body, true), vec!["22:00-00:00", "00:00-02:00"]);
}

// ── Calendar ──

#[tokio::test]
async fn test_calendar_month_flags() {
    let state = test_state();
    seed_schedule(&state).await;
    let monday = next_weekday(Weekday::Mon);
    admin_create(&state, monday, "09:00", 60).await;

    let month = format!("{:04}-{:02}", monday.year(), monday.month());
    let (status, grid) = send(
        &state,
        public_get(&format!("/api/advisors/adv-1/calendar?month={month}&selected={monday}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let cell = find_cell(&grid, monday);
    assert_eq!(cell["in_month"], true);
    assert_eq!(cell["has_appointments"], true);
    assert_eq!(cell["has_available_slots"], true);
    assert_eq!(cell["is_selected"], true);

    // The first week starts on a Sunday.
    let first = grid["weeks"][0][0]["date"].as_str().unwrap();
    let first = NaiveDate::parse_from_str(first, "%Y-%m-%d").unwrap();
    assert_eq!(first.weekday(), Weekday::Sun);
}

#[tokio::test]
async fn test_calendar_rejects_bad_month() {
    let state = test_state();
    let (status, _) = send(&state, public_get("/api/advisors/adv-1/calendar?month=2025-13")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_calendar_rejects_month_outside_date_range() {
    let state = test_state();
    for month in ["300000-01", "2147483647-12", "-300000-06"] {
        let (status, _) = send(
            &state,
            public_get(&format!("/api/advisors/adv-1/calendar?month={month}")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{month}");
    }
}

// ── Admin appointments ──

#[tokio::test]
async fn test_admin_overlapping_create_rejected() {
    let state = test_state();
    seed_schedule(&state).await;
    let monday = next_weekday(Weekday::Mon);

    let (status, _) = admin_create(&state, monday, "10:00", 30).await;
    assert_eq!(status, StatusCode::CREATED);

    // Starts on the 60-minute grid and runs through the booked half hour.
    let (status, body) = admin_create(&state, monday, "10:00", 60).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("no longer available"));

    let (status, _) = admin_create(&state, monday, "09:15", 30).await;
    assert_eq!(status, StatusCode::CONFLICT, "not on the 30-minute grid");
}

#[tokio::test]
async fn test_admin_create_on_closed_day_rejected() {
    let state = test_state();
    seed_schedule(&state).await;
    let tuesday = next_weekday(Weekday::Tue);
    let (status, _) = admin_create(&state, tuesday, "10:00", 30).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_update_moves_appointment_and_frees_slot() {
    let state = test_state();
    seed_schedule(&state).await;
    let monday = next_weekday(Weekday::Mon);

    let (_, created) = admin_create(&state, monday, "10:00", 30).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &state,
        admin(
            "PUT",
            &format!("/api/admin/appointments/{id}"),
            Some(json!({
                "date": monday.to_string(),
                "start_time": "11:00",
                "duration": 60,
                "contact": {"kind": "existing", "customer_id": "cust-1"},
                "pipeline": {"kind": "existing", "pipeline_id": created["pipeline_id"], "stage_id": created["stage_id"]},
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], id.as_str());
    assert_eq!(updated["start_time"], "11:00");
    assert_eq!(updated["end_time"], "12:00");
    assert_eq!(updated["status"], "confirmed");

    let (_, body) = send(
        &state,
        public_get(&format!("/api/advisors/adv-1/slots?date={monday}")),
    )
    .await;
    assert_eq!(slot_labels(&body, false), vec!["11:00-11:30", "11:30-12:00"]);

    // Editing view: its own booking does not block.
    let (_, body) = send(
        &state,
        admin(
            "GET",
            &format!("/api/admin/advisors/adv-1/slots?date={monday}&exclude={id}"),
            None,
        ),
    )
    .await;
    assert!(slot_labels(&body, false).is_empty());
}

#[tokio::test]
async fn test_admin_list_and_delete() {
    let state = test_state();
    seed_schedule(&state).await;
    let monday = next_weekday(Weekday::Mon);
    let (_, created) = admin_create(&state, monday, "09:00", 30).await;
    let id = created["id"].as_str().unwrap();

    let (status, list) = send(
        &state,
        admin(
            "GET",
            &format!("/api/admin/advisors/adv-1/appointments?from={monday}&to={monday}"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["description"], "Portfolio review");

    let (status, _) = send(&state, admin("DELETE", &format!("/api/admin/appointments/{id}"), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&state, admin("DELETE", &format!("/api/admin/appointments/{id}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Public booking ──

#[tokio::test]
async fn test_public_booking_succeeds_then_conflicts() {
    let state = test_state();
    seed_schedule(&state).await;
    let monday = next_weekday(Weekday::Mon);
    let body = json!({
        "date": monday.to_string(),
        "start_time": "09:30",
        "duration": 30,
        "email": "Ann@Example.com",
        "name": "Ann",
        "description": "First call"
    });

    let (status, created) = send(&state, public_post("/api/advisors/adv-1/bookings", body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["pipeline_id"], "web");
    assert_eq!(created["stage_id"], "lead");
    assert_eq!(created["end_time"], "10:00");

    let (status, _) = send(&state, public_post("/api/advisors/adv-1/bookings", body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_public_booking_rejects_past_and_closed_days() {
    let state = test_state();
    seed_schedule(&state).await;
    let past_monday = next_weekday(Weekday::Mon) - Duration::days(14);
    let tuesday = next_weekday(Weekday::Tue);

    for date in [past_monday, tuesday] {
        let (status, _) = send(
            &state,
            public_post(
                "/api/advisors/adv-1/bookings",
                json!({"date": date.to_string(), "start_time": "09:00", "email": "bob@example.com"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "{date}");
    }
}

#[tokio::test]
async fn test_public_booking_cannot_take_overnight_slot() {
    let state = test_state();
    seed_schedule(&state).await;
    let thursday = next_weekday(Weekday::Thu);
    let (status, _) = send(
        &state,
        public_post(
            "/api/advisors/adv-1/bookings",
            json!({"date": thursday.to_string(), "start_time": "22:00", "email": "bob@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_public_booking_reports_missing_fields() {
    let mut config = test_config();
    config.public_pipeline_id = String::new();
    let state = test_state_with(config);
    seed_schedule(&state).await;
    let monday = next_weekday(Weekday::Mon);

    let (status, body) = send(
        &state,
        public_post(
            "/api/advisors/adv-1/bookings",
            json!({"date": monday.to_string(), "start_time": "09:00", "email": "  "}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "please provide: contact, pipeline");
}

#[tokio::test]
async fn test_public_booking_without_schedule() {
    let state = test_state();
    let monday = next_weekday(Weekday::Mon);
    let (status, _) = send(
        &state,
        public_post(
            "/api/advisors/adv-1/bookings",
            json!({"date": monday.to_string(), "start_time": "09:00", "email": "bob@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Calendar export ──

#[tokio::test]
async fn test_calendar_not_found() {
    let state = test_state();
    let (status, _) = send(&state, public_get("/calendar/nonexistent.ics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calendar_download() {
    let state = test_state();
    seed_schedule(&state).await;
    let monday = next_weekday(Weekday::Mon);
    let (_, created) = admin_create(&state, monday, "10:00", 60).await;
    let id = created["id"].as_str().unwrap();

    let res = test_app(Arc::clone(&state))
        .oneshot(public_get(&format!("/calendar/{id}.ics")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/calendar; charset=utf-8"
    );

    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("BEGIN:VCALENDAR"));
    assert!(text.contains(&format!("DTSTART:{}T100000", monday.format("%Y%m%d"))));
    assert!(text.contains(&format!("DTEND:{}T110000", monday.format("%Y%m%d"))));
    assert!(text.contains("SUMMARY:Consultation with Acme Advisory"));
    assert!(text.contains("DESCRIPTION:Portfolio review"));
}

#[tokio::test]
async fn test_calendar_download_places_wrapped_slot_next_morning() {
    let state = test_state();
    seed_schedule(&state).await;
    let thursday = next_weekday(Weekday::Thu);
    let (status, created) = admin_create(&state, thursday, "00:30", 30).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap();

    let res = test_app(Arc::clone(&state))
        .oneshot(public_get(&format!("/calendar/{id}.ics")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    let friday = (thursday + Duration::days(1)).format("%Y%m%d");
    assert!(text.contains(&format!("DTSTART:{friday}T003000")));
    assert!(text.contains(&format!("DTEND:{friday}T010000")));
}
