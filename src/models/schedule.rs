use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::time::WallTime;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdaySchedule {
    #[serde(with = "weekday_short")]
    pub weekday: Weekday,
    pub start: Option<WallTime>,
    pub end: Option<WallTime>,
    pub is_available: bool,
}

impl WeekdaySchedule {
    pub fn all_day(weekday: Weekday) -> Self {
        Self {
            weekday,
            start: Some(WallTime::MIDNIGHT),
            end: Some(WallTime::END_OF_DAY),
            is_available: true,
        }
    }

    pub fn closed(weekday: Weekday) -> Self {
        Self {
            weekday,
            start: None,
            end: None,
            is_available: false,
        }
    }

    // An entry missing either bound can never produce slots.
    pub fn window(&self) -> Option<(WallTime, WallTime)> {
        if !self.is_available {
            return None;
        }
        Some((self.start?, self.end?))
    }

    pub fn is_overnight(&self) -> bool {
        matches!(self.window(), Some((start, end)) if end <= start)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<WeekdaySchedule>", into = "Vec<WeekdaySchedule>")]
pub struct WeeklySchedule {
    // Indexed by days-from-Monday.
    days: Vec<WeekdaySchedule>,
}

impl WeeklySchedule {
    pub fn new(entries: Vec<WeekdaySchedule>) -> anyhow::Result<Self> {
        if entries.len() != 7 {
            return Err(anyhow::anyhow!(
                "weekly schedule needs exactly 7 entries, got {}",
                entries.len()
            ));
        }
        let mut days: Vec<Option<WeekdaySchedule>> = vec![None; 7];
        for entry in entries {
            let idx = entry.weekday.num_days_from_monday() as usize;
            if days[idx].is_some() {
                return Err(anyhow::anyhow!("duplicate weekday: {}", entry.weekday));
            }
            days[idx] = Some(entry);
        }
        Ok(Self {
            days: days.into_iter().flatten().collect(),
        })
    }

    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let schedule: WeeklySchedule = serde_json::from_str(s)?;
        Ok(schedule)
    }

    pub fn entry(&self, weekday: Weekday) -> &WeekdaySchedule {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn entries(&self) -> &[WeekdaySchedule] {
        &self.days
    }

    pub fn to_human_readable(&self) -> String {
        self.days
            .iter()
            .filter_map(|d| {
                let (start, end) = d.window()?;
                Some(format!("{}: {start}-{end}", d.weekday))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self {
            days: WEEK.iter().map(|d| WeekdaySchedule::closed(*d)).collect(),
        }
    }
}

impl TryFrom<Vec<WeekdaySchedule>> for WeeklySchedule {
    type Error = String;

    fn try_from(value: Vec<WeekdaySchedule>) -> Result<Self, Self::Error> {
        WeeklySchedule::new(value).map_err(|e| e.to_string())
    }
}

impl From<WeeklySchedule> for Vec<WeekdaySchedule> {
    fn from(value: WeeklySchedule) -> Self {
        value.days
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    Default,
    Custom,
}

impl ScheduleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleMode::Default => "default",
            ScheduleMode::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "custom" => ScheduleMode::Custom,
            _ => ScheduleMode::Default,
        }
    }
}

// The active schedule of one advisor, as read from the schedule collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorSchedule {
    pub mode: ScheduleMode,
    pub weekly: Option<WeeklySchedule>,
}

impl AdvisorSchedule {
    pub fn default_mode() -> Self {
        Self {
            mode: ScheduleMode::Default,
            weekly: None,
        }
    }

    pub fn custom(weekly: WeeklySchedule) -> Self {
        Self {
            mode: ScheduleMode::Custom,
            weekly: Some(weekly),
        }
    }

    // Stands in when the collaborator has no schedule for the advisor.
    pub fn missing() -> Self {
        Self {
            mode: ScheduleMode::Custom,
            weekly: None,
        }
    }

    pub fn entry(&self, weekday: Weekday) -> WeekdaySchedule {
        match (self.mode, &self.weekly) {
            (ScheduleMode::Default, _) => WeekdaySchedule::all_day(weekday),
            (ScheduleMode::Custom, Some(weekly)) => weekly.entry(weekday).clone(),
            (ScheduleMode::Custom, None) => WeekdaySchedule::closed(weekday),
        }
    }

    pub fn is_day_available(&self, weekday: Weekday) -> bool {
        self.entry(weekday).window().is_some()
    }
}

mod weekday_short {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&day.to_string().to_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Weekday, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse::<Weekday>()
            .map_err(|_| serde::de::Error::custom(format!("invalid weekday: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week_json(entries: &str) -> String {
        format!("[{entries}]")
    }

    const FULL_WEEK: &str = r#"{"weekday":"mon","start":"09:00","end":"17:00","is_available":true},
        {"weekday":"tue","start":"09:00","end":"17:00","is_available":true},
        {"weekday":"wed","start":null,"end":null,"is_available":false},
        {"weekday":"thu","start":"22:00","end":"02:00","is_available":true},
        {"weekday":"fri","start":"10:00:00","end":"16:00:00","is_available":true},
        {"weekday":"sat","start":"10:00","end":"12:00","is_available":false},
        {"weekday":"sun","start":"10:00","end":null,"is_available":true}"#;

    #[test]
    fn test_parse_valid_week() {
        let week = WeeklySchedule::from_json(&week_json(FULL_WEEK)).unwrap();
        assert_eq!(week.entries().len(), 7);
        assert_eq!(week.entry(Weekday::Fri).start, WallTime::from_hm(10, 0));
        assert!(week.entry(Weekday::Thu).is_overnight());
    }

    #[test]
    fn test_parse_rejects_short_week() {
        let json = week_json(
            r#"{"weekday":"mon","start":"09:00","end":"17:00","is_available":true}"#,
        );
        assert!(WeeklySchedule::from_json(&json).is_err());
    }

    #[test]
    fn test_parse_rejects_duplicate_weekday() {
        let json = FULL_WEEK.replace(r#""weekday":"tue""#, r#""weekday":"mon""#);
        assert!(WeeklySchedule::from_json(&week_json(&json)).is_err());
    }

    #[test]
    fn test_parse_invalid_day() {
        let json = FULL_WEEK.replace(r#""weekday":"tue""#, r#""weekday":"xyz""#);
        assert!(WeeklySchedule::from_json(&week_json(&json)).is_err());
    }

    #[test]
    fn test_entries_are_ordered_from_monday() {
        let mut entries: Vec<WeekdaySchedule> =
            WEEK.iter().rev().map(|d| WeekdaySchedule::all_day(*d)).collect();
        entries[0].is_available = false;
        let week = WeeklySchedule::new(entries).unwrap();
        assert_eq!(week.entries()[0].weekday, Weekday::Mon);
        assert!(!week.entry(Weekday::Sun).is_available);
    }

    #[test]
    fn test_incomplete_entry_is_unavailable() {
        let week = WeeklySchedule::from_json(&week_json(FULL_WEEK)).unwrap();
        assert!(week.entry(Weekday::Sun).window().is_none());
        assert!(week.entry(Weekday::Sat).window().is_none());
    }

    #[test]
    fn test_default_mode_is_all_day() {
        let schedule = AdvisorSchedule::default_mode();
        for day in WEEK {
            let entry = schedule.entry(day);
            assert_eq!(entry.window(), Some((WallTime::MIDNIGHT, WallTime::END_OF_DAY)));
            assert!(!entry.is_overnight());
        }
    }

    #[test]
    fn test_missing_schedule_closes_every_day() {
        let schedule = AdvisorSchedule::missing();
        assert!(WEEK.iter().all(|d| !schedule.is_day_available(*d)));
    }

    #[test]
    fn test_to_human_readable() {
        let week = WeeklySchedule::from_json(&week_json(FULL_WEEK)).unwrap();
        assert_eq!(
            week.to_human_readable(),
            "Mon: 09:00-17:00, Tue: 09:00-17:00, Thu: 22:00-02:00, Fri: 10:00-16:00"
        );
        assert_eq!(WeeklySchedule::default().to_human_readable(), "");
    }

    #[test]
    fn test_weekday_serializes_lowercase() {
        let json = serde_json::to_string(&WeekdaySchedule::closed(Weekday::Wed)).unwrap();
        assert!(json.contains(r#""weekday":"wed""#));
    }
}
