use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use crate::domain::models::booking::Booking;
use crate::domain::models::schedule::{default_clock_range, ClockRange, ScheduleWindow};

/// Granularity of candidate start times.
pub const SLOT_STEP_MINUTES: i64 = 30;

/// A host's working window on one concrete date, as UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Anchors a wall-clock range to `date` in `tz`. An edge inside a DST gap
    /// moves to the first instant after the gap; an ambiguous edge takes the
    /// earlier reading.
    pub fn resolve(date: NaiveDate, range: ClockRange, tz: Tz) -> Option<Self> {
        let start = local_instant(date, range.start, tz)?;
        let end = local_instant(date, range.end, tz)?;
        Some(Self { start, end })
    }
}

/// Longest DST gap in the tz database is well under a day.
const MAX_GAP_MINUTES: i64 = 24 * 60;

fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    let wall = date.and_time(time);
    (0..=MAX_GAP_MINUTES).find_map(|shift| {
        tz.from_local_datetime(&(wall + Duration::minutes(shift)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Everything needed to compute one host's availability.
#[derive(Debug, Clone)]
pub struct HostAvailability<'a> {
    pub host_id: &'a str,
    pub timezone: Tz,
    pub windows: &'a [ScheduleWindow],
    pub bookings: &'a [Booking],
}

impl<'a> HostAvailability<'a> {
    pub fn new(host_id: &'a str, timezone: &str, windows: &'a [ScheduleWindow], bookings: &'a [Booking]) -> Self {
        Self {
            host_id,
            timezone: timezone.parse().unwrap_or(chrono_tz::UTC),
            windows,
            bookings,
        }
    }

    /// The weekday's own window. Unparseable rows count as missing.
    pub fn own_range(&self, date: NaiveDate) -> Option<ClockRange> {
        let day = date.weekday().num_days_from_sunday() as i32;
        self.windows
            .iter()
            .filter(|w| w.user_id == self.host_id)
            .find(|w| w.day == day)
            .and_then(ScheduleWindow::clock_range)
    }

    /// Window used by the day view and by booking validation.
    pub fn window_with_fallback(&self, date: NaiveDate) -> Option<DayWindow> {
        let range = self.own_range(date).unwrap_or_else(default_clock_range);
        DayWindow::resolve(date, range, self.timezone)
    }

    fn blocking_bookings(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.iter().filter(move |b| b.host_id == self.host_id)
    }

    /// Bookable starts for this host on `date`.
    pub fn day_slots(&self, date: NaiveDate, duration: Duration, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let Some(window) = self.window_with_fallback(date) else {
            return Vec::new();
        };
        let candidates = generate_slots(&window, duration);
        let bookings: Vec<&Booking> = self.blocking_bookings().collect();
        filter_slots(&candidates, duration, now, window.end, &bookings)
    }

    /// True when the weekday has a window of its own and at least one slot
    /// survives the conflict filter. Stops at the first accepted slot.
    pub fn has_slot_on(&self, date: NaiveDate, duration: Duration, now: DateTime<Utc>) -> bool {
        let Some(range) = self.own_range(date) else {
            return false;
        };
        let Some(window) = DayWindow::resolve(date, range, self.timezone) else {
            return false;
        };
        let bookings: Vec<&Booking> = self.blocking_bookings().collect();
        generate_slots(&window, duration)
            .into_iter()
            .any(|s| slot_is_free(s, duration, now, window.end, &bookings))
    }
}

/// Ascending candidate starts, one every `SLOT_STEP_MINUTES`, whose end stays
/// within the window. Empty when the window is degenerate.
pub fn generate_slots(window: &DayWindow, duration: Duration) -> Vec<DateTime<Utc>> {
    let mut slots = Vec::new();
    if window.start >= window.end || duration <= Duration::zero() {
        return slots;
    }

    let step = Duration::minutes(SLOT_STEP_MINUTES);
    let mut cursor = window.start;
    while cursor + duration <= window.end {
        slots.push(cursor);
        cursor += step;
    }
    slots
}

/// Keeps the candidates that are not in the past, fit before `window_end` and
/// do not intersect a blocking booking. Input order is preserved.
pub fn filter_slots(
    candidates: &[DateTime<Utc>],
    duration: Duration,
    now: DateTime<Utc>,
    window_end: DateTime<Utc>,
    bookings: &[&Booking],
) -> Vec<DateTime<Utc>> {
    candidates
        .iter()
        .copied()
        .filter(|s| slot_is_free(*s, duration, now, window_end, bookings))
        .collect()
}

fn slot_is_free(
    start: DateTime<Utc>,
    duration: Duration,
    now: DateTime<Utc>,
    window_end: DateTime<Utc>,
    bookings: &[&Booking],
) -> bool {
    let end = start + duration;
    if start < now || end > window_end {
        return false;
    }
    !bookings.iter().any(|b| b.blocks_time() && b.overlaps(start, end))
}

/// Union of every host's slots for the day, ascending and deduplicated.
pub fn day_slots(hosts: &[HostAvailability<'_>], date: NaiveDate, duration: Duration, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut slots: Vec<DateTime<Utc>> = hosts
        .iter()
        .flat_map(|h| h.day_slots(date, duration, now))
        .collect();
    slots.sort();
    slots.dedup();
    slots
}

/// Days of the month on which at least one host has a bookable slot.
pub fn month_available_days(
    hosts: &[HostAvailability<'_>],
    year: i32,
    month: u32,
    duration: Duration,
    now: DateTime<Utc>,
) -> Vec<NaiveDate> {
    month_days(year, month)
        .filter(|date| hosts.iter().any(|h| h.has_slot_on(*date, duration, now)))
        .collect()
}

pub fn month_days(year: i32, month: u32) -> impl Iterator<Item = NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    std::iter::successors(first, |d| d.succ_opt()).take_while(move |d| d.month() == month)
}

/// Parses `YYYY-MM`.
pub fn parse_month(raw: &str) -> Option<(i32, u32)> {
    let (y, m) = raw.split_once('-')?;
    if y.len() != 4 || m.len() != 2 {
        return None;
    }
    let year: i32 = y.parse().ok()?;
    let month: u32 = m.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
}

/// UTC bounds wide enough to contain every host-local instant of the month.
pub fn month_query_range(year: i32, month: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let start = first.and_time(NaiveTime::MIN).and_utc() - Duration::days(1);
    let end = next.and_time(NaiveTime::MIN).and_utc() + Duration::days(1);
    Some((start, end))
}

/// Same as `month_query_range` for a single date.
pub fn day_query_range(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start - Duration::days(1), start + Duration::days(2))
}
