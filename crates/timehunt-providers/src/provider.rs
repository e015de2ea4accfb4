//! Gateway and credential trait definitions.
//!
//! This module defines the two seams between the commands and a calendar
//! backend:
//!
//! - [`CalendarGateway`] reads, deletes and creates events
//! - [`CredentialProvider`] re-acquires credentials after the backend
//!   rejected them
//!
//! Commands only ever hold `&dyn CalendarGateway` and `&dyn CredentialProvider`,
//! so tests drive them with in-memory fakes.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use timehunt_core::{CalendarEvent, DateTimeRange};

use crate::error::ProviderResult;

/// Options for fetching events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Free-text query matched against event names (and other fields,
    /// depending on the backend).
    pub query: Option<String>,
    /// Only events ending after this instant are returned.
    pub time_min: Option<DateTime<Utc>>,
}

impl FetchOptions {
    /// Creates new fetch options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the name query.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Builder method to set the lower time bound.
    pub fn with_time_min(mut self, time_min: DateTime<Utc>) -> Self {
        self.time_min = Some(time_min);
        self
    }
}

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object-safe, so commands can take
/// `&dyn CalendarGateway`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read and write access to one calendar.
///
/// # Implementation Notes
///
/// - Implementations should be `Send + Sync` for use in async contexts
/// - `fetch_events` returns events ordered by start time, with recurring
///   events expanded and cancelled events left out
/// - Rejected or missing credentials must surface as an error for which
///   [`ProviderError::is_authorization`](crate::ProviderError::is_authorization)
///   is true
pub trait CalendarGateway: Send + Sync {
    /// Returns the name of this gateway (e.g., "google").
    fn name(&self) -> &str;

    /// Fetches events matching `options`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network errors, authentication failures, etc.
    fn fetch_events(&self, options: FetchOptions) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>>;

    /// Deletes every event in `events`, returning how many were deleted.
    ///
    /// Stops at the first failure.
    fn delete_events<'a>(&'a self, events: &'a [CalendarEvent]) -> BoxFuture<'a, ProviderResult<usize>>;

    /// Creates one event named `name` spanning `range`.
    fn create_event<'a>(
        &'a self,
        name: &'a str,
        range: &'a DateTimeRange,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>>;
}

/// Interactive credential acquisition.
pub trait CredentialProvider: Send + Sync {
    /// Obtains fresh credentials and persists them for the gateway to use.
    ///
    /// This may open a browser and block until the user completes consent.
    fn authorize(&self) -> BoxFuture<'_, ProviderResult<()>>;
}
