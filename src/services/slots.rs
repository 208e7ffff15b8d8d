use crate::models::time::MINUTES_PER_DAY;
use crate::models::{CandidateSlot, SlotDuration, WallTime, WeekdaySchedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvernightPolicy {
    // A window whose end is at or before its start runs past midnight.
    Wrap,
    // Such a window produces nothing.
    SameDayOnly,
}

pub fn generate_slots(
    entry: &WeekdaySchedule,
    duration: SlotDuration,
    policy: OvernightPolicy,
) -> Vec<CandidateSlot> {
    let Some((start, end)) = entry.window() else {
        return vec![];
    };
    let (start, end) = (start.minutes(), end.minutes());
    let step = duration.minutes();

    let mut slots = vec![];
    if end > start {
        push_fitting(&mut slots, start, end, step);
    } else if policy == OvernightPolicy::Wrap {
        push_fitting(&mut slots, start, MINUTES_PER_DAY, step);
        push_fitting(&mut slots, 0, end, step);
    }
    slots
}

// Emits [t, t+step) for every t from `from` while the slot still ends by `to`.
fn push_fitting(out: &mut Vec<CandidateSlot>, from: u16, to: u16, step: u16) {
    let mut t = from;
    while t + step <= to {
        if let (Some(start_time), Some(end_time)) =
            (WallTime::from_minutes(t), WallTime::from_minutes(t + step))
        {
            out.push(CandidateSlot {
                start_time,
                end_time,
            });
        }
        t += step;
    }
}
