//! Grouping events by calendar day.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::event::CalendarEvent;
use crate::time::start_of_day;

/// Events that start on the same local calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket<'a> {
    /// The local calendar day.
    pub date: NaiveDate,
    /// Events starting on that day, in source order.
    pub events: Vec<&'a CalendarEvent>,
}

impl DayBucket<'_> {
    /// Returns the first instant of this bucket's day in `tz`.
    pub fn start_of_day<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Utc> {
        start_of_day(self.date, tz)
    }

    /// Number of events in the bucket.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the bucket holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Groups `events` by the local day of their start.
///
/// All-day events are keyed by their date; timed events by the date of their
/// start instant in `tz`. Buckets come back in ascending day order, and every
/// input event lands in exactly one bucket.
pub fn group_by_day<'a, Tz: TimeZone>(events: &'a [CalendarEvent], tz: &Tz) -> Vec<DayBucket<'a>> {
    let mut days: BTreeMap<NaiveDate, Vec<&'a CalendarEvent>> = BTreeMap::new();
    for event in events {
        days.entry(event.start_date(tz)).or_default().push(event);
    }

    days.into_iter()
        .map(|(date, events)| DayBucket { date, events })
        .collect()
}
