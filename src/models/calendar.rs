use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    // The year on either side must also be representable, so navigating
    // one month away and building the surrounding grid stay in range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(1..=12).contains(&month) {
            return None;
        }
        NaiveDate::from_ymd_opt(year.checked_sub(1)?, 1, 1)?;
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 12, 31)?;
        Some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("invalid month (expected YYYY-MM): {s}"))?;
        let year: i32 = y
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid year in: {s}"))?;
        let month: u32 = m
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid month in: {s}"))?;
        Self::new(year, month).ok_or_else(|| anyhow::anyhow!("month out of range: {s}"))
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    // Stays put at the edge of the representable range.
    pub fn next(self) -> Self {
        let (year, month) = if self.month == 12 {
            (self.year.saturating_add(1), 1)
        } else {
            (self.year, self.month + 1)
        };
        Self::new(year, month).unwrap_or(self)
    }

    pub fn prev(self) -> Self {
        let (year, month) = if self.month == 1 {
            (self.year.saturating_sub(1), 12)
        } else {
            (self.year, self.month - 1)
        };
        Self::new(year, month).unwrap_or(self)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        Self::of(date) == self
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_past: bool,
    pub has_appointments: bool,
    pub has_available_slots: bool,
    pub is_selected: bool,
}

impl DayCell {
    pub fn is_selectable(&self) -> bool {
        self.in_month && !self.is_past
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthGrid {
    pub month: YearMonth,
    // Rows of 7, Sunday first.
    pub weeks: Vec<Vec<DayCell>>,
}

impl MonthGrid {
    pub fn cell(&self, date: NaiveDate) -> Option<&DayCell> {
        self.weeks
            .iter()
            .flatten()
            .find(|c| c.in_month && c.date == date)
    }

    pub fn cells(&self) -> impl Iterator<Item = &DayCell> {
        self.weeks.iter().flatten()
    }
}
