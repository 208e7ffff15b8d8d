use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::models::time::MINUTES_PER_DAY;
use crate::models::{AdvisorSchedule, Appointment, BookedSlot, CandidateSlot, SlotDuration, SlotView};
use crate::services::slots::{generate_slots, OvernightPolicy};

// Everything already booked on one date.
#[derive(Debug, Clone, Copy)]
pub struct DayBookings<'a> {
    pub date: NaiveDate,
    pub booked: &'a [BookedSlot],
    pub appointments: &'a [Appointment],
    // The appointment being edited never blocks its own slot.
    pub exclude_appointment: Option<&'a str>,
}

impl<'a> DayBookings<'a> {
    pub fn new(date: NaiveDate, booked: &'a [BookedSlot], appointments: &'a [Appointment]) -> Self {
        Self {
            date,
            booked,
            appointments,
            exclude_appointment: None,
        }
    }

    pub fn excluding(mut self, appointment_id: Option<&'a str>) -> Self {
        self.exclude_appointment = appointment_id;
        self
    }

    fn counts(&self, id: &str) -> bool {
        self.exclude_appointment != Some(id)
    }

    pub fn is_free(&self, slot: &CandidateSlot) -> bool {
        let start = slot.start_time;

        let taken_by_booking = self
            .booked
            .iter()
            .filter(|b| b.status.is_active() && self.counts(&b.appointment_id))
            .any(|b| b.start_time == start);
        if taken_by_booking {
            return false;
        }

        // Only the slot's start point is tested against each appointment.
        !self
            .appointments
            .iter()
            .filter(|a| a.date == self.date && a.status.is_active() && self.counts(&a.id))
            .any(|a| {
                let from = a.start_time.minutes();
                let mut to = a.end_time.minutes();
                if to <= from {
                    to = MINUTES_PER_DAY;
                }
                (from..to).contains(&start.minutes())
            })
    }
}

pub fn is_past_date(date: NaiveDate, now: NaiveDateTime) -> bool {
    date < now.date()
}

pub fn filter_available(
    candidates: &[CandidateSlot],
    day: &DayBookings<'_>,
    now: NaiveDateTime,
) -> Vec<CandidateSlot> {
    if is_past_date(day.date, now) {
        return vec![];
    }
    candidates
        .iter()
        .filter(|s| day.is_free(s))
        .copied()
        .collect()
}

// Same rules as `filter_available`, but keeps rejected candidates flagged.
pub fn annotate_slots(
    candidates: &[CandidateSlot],
    day: &DayBookings<'_>,
    now: NaiveDateTime,
) -> Vec<SlotView> {
    let past = is_past_date(day.date, now);
    candidates
        .iter()
        .map(|s| SlotView {
            start_time: s.start_time,
            end_time: s.end_time,
            available: !past && day.is_free(s),
        })
        .collect()
}

pub fn slots_for_day(
    schedule: &AdvisorSchedule,
    duration: SlotDuration,
    policy: OvernightPolicy,
    day: &DayBookings<'_>,
    now: NaiveDateTime,
) -> Vec<SlotView> {
    let entry = schedule.entry(day.date.weekday());
    let candidates = generate_slots(&entry, duration, policy);
    annotate_slots(&candidates, day, now)
}
