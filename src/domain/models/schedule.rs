use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::FromRow;

/// Recurring weekly working hours for one weekday. `day` follows the
/// Sunday = 0 convention; clock times are `HH:MM` in the owner's timezone.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ScheduleWindow {
    pub id: String,
    pub user_id: String,
    pub day: i32,
    pub start_time: String,
    pub end_time: String,
    pub created_at: DateTime<Utc>,
}

impl ScheduleWindow {
    pub fn new(user_id: String, day: i32, start_time: String, end_time: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            day,
            start_time,
            end_time,
            created_at: Utc::now(),
        }
    }

    pub fn clock_range(&self) -> Option<ClockRange> {
        ClockRange::parse(&self.start_time, &self.end_time)
    }
}

/// Parsed start/end of a window, independent of storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ClockRange {
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let start = NaiveTime::parse_from_str(start, "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(end, "%H:%M").ok()?;
        Some(Self { start, end })
    }
}

/// Used when a weekday has no window of its own.
pub fn default_clock_range() -> ClockRange {
    ClockRange {
        start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
        end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
    }
}
