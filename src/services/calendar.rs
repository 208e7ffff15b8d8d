use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{AdvisorSchedule, Appointment, DayCell, MonthGrid, SlotDuration, YearMonth};
use crate::services::slots::{generate_slots, OvernightPolicy};

pub fn appointment_dates(appointments: &[Appointment]) -> HashSet<NaiveDate> {
    appointments
        .iter()
        .filter(|a| a.status.is_active())
        .map(|a| a.date)
        .collect()
}

pub fn build_month_grid(
    month: YearMonth,
    selected: Option<NaiveDate>,
    appointment_dates: &HashSet<NaiveDate>,
    schedule: &AdvisorSchedule,
    today: NaiveDate,
) -> MonthGrid {
    let first = month.first_day();
    let last = month.last_day();
    let leading = i64::from(first.weekday().num_days_from_sunday());
    let trailing = 6 - i64::from(last.weekday().num_days_from_sunday());
    let total = leading + i64::from(last.day()) + trailing;
    let Some(grid_start) = first.checked_sub_signed(Duration::days(leading)) else {
        return MonthGrid {
            month,
            weeks: vec![],
        };
    };

    let cells: Vec<DayCell> = (0..total)
        .filter_map(|offset| grid_start.checked_add_signed(Duration::days(offset)))
        .map(|date| {
            if !month.contains(date) {
                // Adjacent-month placeholder.
                return DayCell {
                    date,
                    in_month: false,
                    is_past: date < today,
                    has_appointments: false,
                    has_available_slots: false,
                    is_selected: false,
                };
            }
            DayCell {
                date,
                in_month: true,
                is_past: date < today,
                has_appointments: appointment_dates.contains(&date),
                has_available_slots: schedule.is_day_available(date.weekday()),
                is_selected: selected == Some(date),
            }
        })
        .collect();

    MonthGrid {
        month,
        weeks: cells.chunks(7).map(|w| w.to_vec()).collect(),
    }
}

// Which month is on screen and which date is picked. Navigating months never
// touches the picked date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCursor {
    pub displayed: YearMonth,
    pub selected: Option<NaiveDate>,
}

impl CalendarCursor {
    pub fn new(displayed: YearMonth) -> Self {
        Self {
            displayed,
            selected: None,
        }
    }

    pub fn next_month(&mut self) {
        self.displayed = self.displayed.next();
    }

    pub fn prev_month(&mut self) {
        self.displayed = self.displayed.prev();
    }

    // Returns whether the click changed the selection.
    pub fn click(&mut self, cell: &DayCell) -> bool {
        if !cell.is_selectable() {
            return false;
        }
        self.selected = Some(cell.date);
        true
    }
}

// Whether the day yields at least one slot on a surface with this policy.
pub fn offers_slots(
    schedule: &AdvisorSchedule,
    date: NaiveDate,
    duration: SlotDuration,
    overnight: OvernightPolicy,
) -> bool {
    !generate_slots(&schedule.entry(date.weekday()), duration, overnight).is_empty()
}

// First date in [from, from + horizon) that offers slots.
pub fn first_available_day(
    schedule: &AdvisorSchedule,
    from: NaiveDate,
    horizon_days: u32,
    duration: SlotDuration,
    overnight: OvernightPolicy,
) -> Option<NaiveDate> {
    (0..i64::from(horizon_days))
        .filter_map(|offset| from.checked_add_signed(Duration::days(offset)))
        .find(|d| offers_slots(schedule, *d, duration, overnight))
}
