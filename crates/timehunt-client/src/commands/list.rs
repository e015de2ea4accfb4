//! The `list` command: show upcoming events with a given name, by day.

use std::fmt;
use std::io::Write;

use chrono::TimeZone;

use timehunt_core::{CalendarEvent, DayFormatter, group_by_day};
use timehunt_providers::{CalendarGateway, CredentialProvider, FetchOptions};

use crate::error::ClientResult;
use crate::retry::ReauthPolicy;

/// Fetches upcoming events named `name`, re-authorizing as `policy` allows.
pub async fn fetch(
    gateway: &dyn CalendarGateway,
    credentials: &dyn CredentialProvider,
    policy: ReauthPolicy,
    options: FetchOptions,
) -> ClientResult<Vec<CalendarEvent>> {
    let mut attempt = 1;
    loop {
        match gateway.fetch_events(options.clone()).await {
            Ok(events) => return Ok(events),
            Err(err) => {
                policy.recover(credentials, attempt, err).await?;
                attempt += 1;
            }
        }
    }
}

/// Writes `events` grouped by day.
///
/// A notice follows when there are more than `notice_threshold` events.
pub fn render<Tz>(
    events: &[CalendarEvent],
    formatter: &DayFormatter<Tz>,
    tz: &Tz,
    notice_threshold: usize,
    out: &mut dyn Write,
) -> std::io::Result<()>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    if events.is_empty() {
        return writeln!(out, "No upcoming events found.");
    }

    writeln!(out, "Upcoming events:")?;
    for line in formatter.format_buckets(&group_by_day(events, tz)) {
        writeln!(out, "{}", line)?;
    }
    if events.len() > notice_threshold {
        writeln!(out, "The number of events exceeds {}.", notice_threshold)?;
    }
    Ok(())
}

/// Runs `timehunt list <name>`.
#[allow(clippy::too_many_arguments)]
pub async fn run<Tz>(
    name: &str,
    gateway: &dyn CalendarGateway,
    credentials: &dyn CredentialProvider,
    policy: ReauthPolicy,
    formatter: &DayFormatter<Tz>,
    tz: &Tz,
    notice_threshold: usize,
    out: &mut dyn Write,
) -> ClientResult<()>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let fetched = fetch(gateway, credentials, policy, super::upcoming(name, tz)).await?;
    let total = fetched.len();
    let events = super::named(fetched, name);
    tracing::debug!("found {} events named {:?} among {} matches", events.len(), name, total);
    render(&events, formatter, tz, notice_threshold, out)?;
    Ok(())
}
