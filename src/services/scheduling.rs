use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::errors::BookingError;
use crate::models::time::MINUTES_PER_DAY;
use crate::models::{
    AdvisorSchedule, Appointment, AppointmentRequest, CandidateSlot, SlotDuration, WallTime,
};
use crate::services::availability::is_past_date;
use crate::services::repository::{AppointmentRepository, ScheduleRepository};
use crate::services::slots::{generate_slots, OvernightPolicy};

fn length_minutes(start: WallTime, end: WallTime) -> u16 {
    let start = start.minutes() % MINUTES_PER_DAY;
    let end = end.minutes();
    if end > start {
        end - start
    } else {
        end + MINUTES_PER_DAY - start
    }
}

// Wall-clock interval of a booking held under `date`. On a weekday whose
// window runs past midnight, a start before the window opens belongs to the
// small hours of the following day.
pub fn booking_interval(
    schedule: &AdvisorSchedule,
    date: NaiveDate,
    start: WallTime,
    end: WallTime,
) -> (NaiveDateTime, NaiveDateTime) {
    let entry = schedule.entry(date.weekday());
    let day = match entry.window() {
        Some((open, _)) if entry.is_overnight() && start < open => date.succ_opt().unwrap_or(date),
        _ => date,
    };
    let begins = day.and_time(start.to_naive_time());
    let ends = begins
        .checked_add_signed(Duration::minutes(i64::from(length_minutes(start, end))))
        .unwrap_or(NaiveDateTime::MAX);
    (begins, ends)
}

// The day before through the day after, which is every date whose bookings
// can reach into `date`.
pub fn neighbouring_days(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    (date.pred_opt().unwrap_or(date), date.succ_opt().unwrap_or(date))
}

// Full interval intersection, unlike the advisory start-point rule.
pub fn find_overlap<'a>(
    appointments: &'a [Appointment],
    schedule: &AdvisorSchedule,
    date: NaiveDate,
    slot: &CandidateSlot,
    exclude_id: Option<&str>,
) -> Option<&'a Appointment> {
    let (start, end) = booking_interval(schedule, date, slot.start_time, slot.end_time);
    appointments.iter().find(|a| {
        if !a.status.is_active() || Some(a.id.as_str()) == exclude_id {
            return false;
        }
        let (a_start, a_end) = booking_interval(schedule, a.date, a.start_time, a.end_time);
        a_start < end && a_end > start
    })
}

// Server-side check that a requested slot is one the advisor actually offers.
pub fn validate_requested_slot(
    schedule: &AdvisorSchedule,
    date: NaiveDate,
    slot: &CandidateSlot,
    policy: OvernightPolicy,
    now: NaiveDateTime,
) -> Result<SlotDuration, BookingError> {
    if is_past_date(date, now) {
        return Err(BookingError::Conflict);
    }

    let length = length_minutes(slot.start_time, slot.end_time);
    let duration = SlotDuration::from_minutes(length).ok_or_else(|| {
        BookingError::Invalid(format!("unsupported slot length: {}", slot.label()))
    })?;

    let entry = schedule.entry(date.weekday());
    // Compared by start: the duration already matches, and a midnight end
    // may arrive as either 00:00 or 24:00.
    let offered = generate_slots(&entry, duration, policy)
        .iter()
        .any(|s| s.start_time == slot.start_time);
    if !offered {
        return Err(BookingError::Conflict);
    }
    Ok(duration)
}

// Re-validates a write against the advisor's current schedule and bookings.
pub async fn check_request(
    schedules: &dyn ScheduleRepository,
    appointments: &dyn AppointmentRepository,
    request: &AppointmentRequest,
    policy: OvernightPolicy,
    exclude_id: Option<&str>,
    now: NaiveDateTime,
) -> Result<SlotDuration, BookingError> {
    let schedule = schedules
        .get_schedule(&request.advisor_id)
        .await?
        .ok_or_else(|| BookingError::MissingSchedule(request.advisor_id.clone()))?;

    let slot = CandidateSlot {
        start_time: request.start_time,
        end_time: request.end_time,
    };
    let duration = validate_requested_slot(&schedule, request.date, &slot, policy, now)?;

    let (from, to) = neighbouring_days(request.date);
    let nearby = appointments.list(&request.advisor_id, from, to).await?;
    if let Some(existing) = find_overlap(&nearby, &schedule, request.date, &slot, exclude_id) {
        tracing::warn!(
            advisor_id = %request.advisor_id,
            date = %request.date,
            slot = %slot.label(),
            existing_id = %existing.id,
            "requested slot overlaps an existing appointment"
        );
        return Err(BookingError::Conflict);
    }
    Ok(duration)
}
