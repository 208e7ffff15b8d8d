use serde::{Deserialize, Serialize};

use super::time::{WallTime, MINUTES_PER_DAY};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum SlotDuration {
    #[default]
    Min30,
    Min45,
    Min60,
    Min90,
    Min120,
}

impl SlotDuration {
    pub const ALL: [SlotDuration; 5] = [
        SlotDuration::Min30,
        SlotDuration::Min45,
        SlotDuration::Min60,
        SlotDuration::Min90,
        SlotDuration::Min120,
    ];

    pub fn minutes(self) -> u16 {
        match self {
            SlotDuration::Min30 => 30,
            SlotDuration::Min45 => 45,
            SlotDuration::Min60 => 60,
            SlotDuration::Min90 => 90,
            SlotDuration::Min120 => 120,
        }
    }

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.minutes() == minutes)
    }
}

impl TryFrom<u16> for SlotDuration {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        SlotDuration::from_minutes(value)
            .ok_or_else(|| format!("unsupported duration: {value} minutes"))
    }
}

impl From<SlotDuration> for u16 {
    fn from(value: SlotDuration) -> Self {
        value.minutes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub start_time: WallTime,
    pub end_time: WallTime,
}

impl CandidateSlot {
    // An end past midnight rolls onto the next day's clock.
    pub fn starting_at(start: WallTime, duration: SlotDuration) -> Self {
        let end = start.minutes() % MINUTES_PER_DAY + duration.minutes();
        let end = if end > MINUTES_PER_DAY {
            end - MINUTES_PER_DAY
        } else {
            end
        };
        Self {
            start_time: start,
            end_time: WallTime::from_minutes(end).unwrap_or(WallTime::END_OF_DAY),
        }
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.start_time, self.end_time)
    }
}

// A candidate as rendered: selectable or greyed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub start_time: WallTime,
    pub end_time: WallTime,
    pub available: bool,
}

impl SlotView {
    pub fn slot(&self) -> CandidateSlot {
        CandidateSlot {
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}
