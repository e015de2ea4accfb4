//! Calendar event type.
//!
//! [`CalendarEvent`] is the provider-agnostic event the rest of the workspace
//! works with. Providers build it from their own wire format; the core only
//! reads it.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// A calendar event as fetched from a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Unique identifier for the event (provider-specific).
    pub id: String,
    /// The event title/summary.
    pub name: String,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends (exclusive).
    pub end: EventTime,
}

impl CalendarEvent {
    /// Creates a new event.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start: EventTime,
        end: EventTime,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start,
            end,
        }
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Returns the half-open `[start, end)` span of this event in `tz`.
    ///
    /// For all-day events the span runs from local midnight of the start date
    /// to local midnight of the (exclusive) end date.
    pub fn span<Tz: TimeZone>(&self, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start.instant(tz), self.end.instant(tz))
    }

    /// Returns the calendar day the event starts on in `tz`.
    pub fn start_date<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.start.local_date(tz)
    }
}
