//! Google Calendar API client.
//!
//! This module provides a low-level HTTP client for the Google Calendar API,
//! handling authentication, request building, and response parsing.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use timehunt_core::{CalendarEvent, DateTimeRange, EventTime};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::FetchOptions;

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    /// Creates a new Google Calendar client with the given access token.
    pub fn new(
        access_token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
        })
    }

    /// Updates the access token (after refresh).
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Lists events from a calendar, following pagination.
    ///
    /// Recurring events are expanded and results are ordered by start time.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        options: &FetchOptions,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(calendar_id, options, page_token.as_deref())
                .await?;

            all_events.extend(page.items.into_iter().filter_map(convert_event));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("fetched {} events from calendar {}", all_events.len(), calendar_id);
        Ok(all_events)
    }

    /// Fetches a single page of events.
    async fn list_events_page(
        &self,
        calendar_id: &str,
        options: &FetchOptions,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let mut query: Vec<(&str, String)> = vec![
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(q) = &options.query {
            query.push(("q", q.clone()));
        }
        if let Some(time_min) = options.time_min {
            query.push(("timeMin", time_min.to_rfc3339()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .http_client
            .get(events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await
            .map_err(request_error)?;

        let body = read_success_body(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }

    /// Deletes one event.
    ///
    /// An event that is already gone counts as deleted.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> ProviderResult<()> {
        let url = format!("{}/{}", events_url(calendar_id), urlencoding::encode(event_id));

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_error)?;

        if response.status() == reqwest::StatusCode::GONE {
            debug!("event {} was already deleted", event_id);
            return Ok(());
        }

        read_success_body(response).await?;
        debug!("deleted event {} from calendar {}", event_id, calendar_id);
        Ok(())
    }

    /// Creates a timed event named `summary` spanning `range`.
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        summary: &str,
        range: &DateTimeRange,
    ) -> ProviderResult<CalendarEvent> {
        let body = serde_json::to_string(&NewEvent::new(summary, range))
            .map_err(|e| ProviderError::internal(format!("failed to serialize event: {}", e)))?;

        let response = self
            .http_client
            .post(events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(request_error)?;

        let body = read_success_body(response).await?;
        let event: ApiEvent = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse created event: {}", e))
        })?;

        let created = convert_event(event)
            .ok_or_else(|| ProviderError::invalid_response("created event has no usable times"))?;
        debug!("created event {} in calendar {}", created.id, calendar_id);
        Ok(created)
    }
}

fn events_url(calendar_id: &str) -> String {
    format!(
        "{}/calendars/{}/events",
        CALENDAR_API_BASE,
        urlencoding::encode(calendar_id)
    )
}

fn request_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    };
    ProviderError::network(message).with_source(e)
}

/// Returns the response body, or the error its status maps to.
async fn read_success_body(response: reqwest::Response) -> ProviderResult<String> {
    let status = response.status();

    if status.is_success() {
        return response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)));
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status.as_u16(), &body, retry_after))
}

/// Maps a non-success HTTP status to a provider error.
///
/// Google answers quota exhaustion with 403 too; those are told apart from
/// permission failures by the reason in the error body.
fn status_error(status: u16, body: &str, retry_after: Option<u64>) -> ProviderError {
    match status {
        401 => ProviderError::authentication("access token expired or invalid"),
        403 => match error_reason(body).as_deref() {
            Some(reason) if USAGE_LIMIT_REASONS.contains(&reason) => {
                ProviderError::rate_limited(format!("usage limit reached ({}): {}", reason, body))
            }
            _ => ProviderError::authorization(format!("access denied to calendar: {}", body)),
        },
        404 => ProviderError::not_found(format!("calendar or event not found: {}", body)),
        429 => ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        400 => ProviderError::bad_request(format!("API rejected request: {}", body)),
        _ => ProviderError::server(format!("API error ({}): {}", status, body)),
    }
}

/// 403 reasons that mean a quota ran out, not that access was refused.
const USAGE_LIMIT_REASONS: &[&str] = &[
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
    "quotaExceeded",
];

/// First `error.errors[].reason` of a Google API error body.
fn error_reason(body: &str) -> Option<String> {
    let envelope: ApiErrorEnvelope = serde_json::from_str(body).ok()?;
    envelope.error.errors.into_iter().find_map(|e| e.reason)
}

/// Converts a Google Calendar API event to a calendar event.
///
/// Cancelled events and events without an id or usable times yield `None`.
fn convert_event(event: ApiEvent) -> Option<CalendarEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let id = event.id?;
    let start = parse_event_time(&event.start, &id, "start")?;
    let end = parse_event_time(&event.end, &id, "end")?;

    Some(CalendarEvent::new(id, event.summary.unwrap_or_default(), start, end))
}

fn parse_event_time(time: &ApiEventTime, id: &str, which: &str) -> Option<EventTime> {
    match (&time.date_time, &time.date) {
        (Some(dt), _) => DateTime::parse_from_rfc3339(dt)
            .map(EventTime::from_local)
            .map_err(|e| warn!("failed to parse {} time of event {}: {}", which, id, e))
            .ok(),
        (None, Some(date)) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(EventTime::from_date)
            .map_err(|e| warn!("failed to parse {} date of event {}: {}", which, id, e))
            .ok(),
        (None, None) => {
            warn!("event {} has no {} time", id, which);
            None
        }
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
    status: Option<String>,
}

/// Event time from the API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    reason: Option<String>,
}

/// Body of an events.insert request.
#[derive(Debug, Serialize)]
struct NewEvent<'a> {
    summary: &'a str,
    start: NewEventTime,
    end: NewEventTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewEventTime {
    date_time: String,
}

impl<'a> NewEvent<'a> {
    fn new(summary: &'a str, range: &DateTimeRange) -> Self {
        Self {
            summary,
            start: NewEventTime {
                date_time: range.start().to_rfc3339(),
            },
            end: NewEventTime {
                date_time: range.end().to_rfc3339(),
            },
        }
    }
}
