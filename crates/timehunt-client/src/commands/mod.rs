//! Subcommand implementations.

#[cfg(feature = "google")]
pub mod auth;
pub mod config;
pub mod fix;
pub mod list;

use chrono::{TimeZone, Utc};

use timehunt_core::{CalendarEvent, start_of_day};
use timehunt_providers::FetchOptions;

/// Fetch options for upcoming events named `name`, from the start of the
/// current local day.
pub fn upcoming<Tz: TimeZone>(name: &str, tz: &Tz) -> FetchOptions {
    let today = Utc::now().with_timezone(tz).date_naive();
    FetchOptions::new()
        .with_query(name)
        .with_time_min(start_of_day(today, tz))
}

/// Keeps the events whose name contains `name`, ignoring case.
///
/// Backend queries are full-text and also hit descriptions, locations and
/// attendees.
pub fn named(mut events: Vec<CalendarEvent>, name: &str) -> Vec<CalendarEvent> {
    let needle = name.to_lowercase();
    events.retain(|e| e.name.to_lowercase().contains(&needle));
    events
}
