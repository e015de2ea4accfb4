//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (which may be either a specific instant or an all-day date). Every
//! conversion that depends on a calendar day takes the timezone explicitly, so
//! callers decide which local time "a day" refers to.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time (stored as UTC)
/// - **AllDay**: A date without a specific time (all-day events)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific instant, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::DateTime` from a datetime in any timezone.
    pub fn from_local<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the instant this event time denotes in `tz`.
    ///
    /// All-day dates resolve to local midnight of that date.
    pub fn instant<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => start_of_day(*date, tz),
        }
    }

    /// Returns this event time as a local datetime in `tz`.
    pub fn to_local<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Tz> {
        self.instant(tz).with_timezone(tz)
    }

    /// Returns the calendar day this event time falls on in `tz`.
    pub fn local_date<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.with_timezone(tz).date_naive(),
            Self::AllDay(date) => *date,
        }
    }
}

/// Returns the first instant of `date` in `tz`.
///
/// When local midnight falls in a DST gap the day starts at the first wall
/// clock time that exists, found in quarter-hour steps.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=DAY_IN_QUARTERS)
        .map(|quarter| midnight + TimeDelta::minutes(15 * quarter))
        .find_map(|naive| resolve_local(&naive, tz))
        .unwrap_or_else(|| midnight.and_utc())
}

const DAY_IN_QUARTERS: i64 = 24 * 4;

/// Interprets a naive local datetime in `tz`.
///
/// Ambiguous times (DST fold) take the earlier instant; nonexistent times
/// (DST gap) yield `None`.
pub fn resolve_local<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
