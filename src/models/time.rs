use std::fmt;

use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u16 = 1440;

// Minutes since midnight. 1440 is only meaningful as an end-of-day bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WallTime(u16);

impl WallTime {
    pub const MIDNIGHT: WallTime = WallTime(0);
    pub const END_OF_DAY: WallTime = WallTime(MINUTES_PER_DAY);

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes <= MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if minute > 59 {
            return None;
        }
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    // Accepts `HH:MM` and `HH:MM:SS`; seconds are dropped.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(anyhow::anyhow!("invalid time format: {s}"));
        }
        let hour: u16 = parts[0]
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
        let minute: u16 = parts[1]
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
        if let Some(sec) = parts.get(2) {
            let second: u16 = sec
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid second in: {s}"))?;
            if second > 59 {
                return Err(anyhow::anyhow!("time out of range: {s}"));
            }
        }
        if hour == 24 && minute == 0 {
            return Ok(Self::END_OF_DAY);
        }
        if hour > 23 || minute > 59 {
            return Err(anyhow::anyhow!("time out of range: {s}"));
        }
        Ok(Self(hour * 60 + minute))
    }

    pub fn to_naive_time(self) -> chrono::NaiveTime {
        let m = u32::from(self.0 % MINUTES_PER_DAY);
        chrono::NaiveTime::from_hms_opt(m / 60, m % 60, 0).unwrap_or(chrono::NaiveTime::MIN)
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0 % MINUTES_PER_DAY;
        write!(f, "{:02}:{:02}", m / 60, m % 60)
    }
}

impl TryFrom<String> for WallTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        WallTime::parse(&value).map_err(|e| e.to_string())
    }
}

impl From<WallTime> for String {
    fn from(value: WallTime) -> Self {
        value.to_string()
    }
}

pub fn parse_date(s: &str) -> anyhow::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("invalid date (expected YYYY-MM-DD): {s}"))
}
