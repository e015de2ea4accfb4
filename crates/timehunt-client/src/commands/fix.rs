//! The `fix` command: replace placeholder events with one real event.
//!
//! The flow is fetch, show, check, confirm, then delete and create. Nothing
//! on the calendar changes unless the requested range overlaps one of the
//! fetched events and the user confirms.
//!
//! A rejected credential at any gateway step triggers re-authorization and a
//! restart from the fetch, bounded by [`ReauthPolicy`]. Once the old events
//! are deleted a restart goes straight to creating the new one.

use std::fmt;
use std::io::{self, Write};

use chrono::TimeZone;
use thiserror::Error;
use tracing::{debug, info, warn};

use timehunt_core::{
    CalendarEvent, DateTimeRange, DayFormatter, DisplayOptions, RangeParseError, group_by_day,
};
use timehunt_providers::{CalendarGateway, CredentialProvider, ProviderError};

use crate::prompt::{Confirmation, Prompt, confirm};
use crate::retry::{ReauthError, ReauthPolicy};

/// What to replace and with what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixRequest {
    /// Range expression for the new event, `START~END`.
    pub range: String,
    /// Name of the event to create.
    pub after: String,
    /// Name of the events to remove.
    pub before: String,
}

/// How a fix ended when no error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    /// Nothing to replace. `had_events` is false when no event named
    /// `before` was found at all, true when none overlapped the range.
    NotFound {
        /// Whether any event named `before` was found.
        had_events: bool,
    },
    /// The user declined.
    Aborted,
    /// The old events were removed and the new one created.
    Replaced {
        /// Number of events deleted.
        deleted: usize,
        /// The created event.
        created: CalendarEvent,
    },
}

/// Errors that end a fix.
#[derive(Debug, Error)]
pub enum FixError {
    /// The range expression is malformed. Nothing was changed.
    #[error(transparent)]
    Parse(#[from] RangeParseError),

    /// The calendar failed for a reason other than credentials.
    #[error(transparent)]
    Provider(ProviderError),

    /// Credentials were rejected on every allowed attempt.
    #[error("credentials still rejected after {attempts} attempts: {last}")]
    AuthorizationExhausted {
        /// Attempts made.
        attempts: u32,
        /// The error from the last attempt.
        #[source]
        last: ProviderError,
    },

    /// The confirmation could not be read.
    #[error("confirmation failed: {0}")]
    Prompt(#[source] io::Error),

    /// Output could not be written.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl From<ReauthError> for FixError {
    fn from(err: ReauthError) -> Self {
        match err {
            ReauthError::Fatal(err) => Self::Provider(err),
            ReauthError::Exhausted { attempts, last } => {
                Self::AuthorizationExhausted { attempts, last }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixStage {
    FetchingBefore,
    Displaying,
    CheckingRange,
    NotFound,
    AwaitingConfirmation,
    Aborted,
    Deleting,
    Creating,
    Done,
}

impl fmt::Display for FixStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchingBefore => "fetching-before",
            Self::Displaying => "displaying",
            Self::CheckingRange => "checking-range",
            Self::NotFound => "not-found",
            Self::AwaitingConfirmation => "awaiting-confirmation",
            Self::Aborted => "aborted",
            Self::Deleting => "deleting",
            Self::Creating => "creating",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Runs fixes against one calendar.
pub struct Fixer<'a, Tz: TimeZone> {
    gateway: &'a dyn CalendarGateway,
    credentials: &'a dyn CredentialProvider,
    prompt: &'a mut dyn Prompt,
    formatter: DayFormatter<Tz>,
    tz: Tz,
    policy: ReauthPolicy,
}

impl<'a, Tz> Fixer<'a, Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    /// Creates a fixer rendering and parsing local times in `tz`.
    pub fn new(
        gateway: &'a dyn CalendarGateway,
        credentials: &'a dyn CredentialProvider,
        prompt: &'a mut dyn Prompt,
        options: DisplayOptions,
        tz: Tz,
    ) -> Self {
        Self {
            gateway,
            credentials,
            prompt,
            formatter: DayFormatter::new(options, tz.clone()),
            tz,
            policy: ReauthPolicy::default(),
        }
    }

    /// Sets the re-authorization policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ReauthPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs `request`, writing progress for the user to `out`.
    pub async fn run(
        &mut self,
        request: &FixRequest,
        out: &mut dyn Write,
    ) -> Result<FixOutcome, FixError> {
        let mut deleted = None;
        let mut attempt = 1;
        let result: Result<FixOutcome, FixError> = loop {
            match self.attempt(request, &mut deleted, out).await {
                Err(FixError::Provider(err)) => {
                    if let Err(err) = self.policy.recover(self.credentials, attempt, err).await {
                        break Err(FixError::from(err));
                    }
                    attempt += 1;
                }
                result => break result,
            }
        };

        if let (Err(err), Some(count)) = (&result, deleted) {
            warn!(
                "{} {:?} events were removed but {:?} was not created: {}",
                count, request.before, request.after, err
            );
        }
        result
    }

    async fn attempt(
        &mut self,
        request: &FixRequest,
        deleted: &mut Option<usize>,
        out: &mut dyn Write,
    ) -> Result<FixOutcome, FixError> {
        if let Some(count) = *deleted {
            let range = DateTimeRange::parse(&request.range, &self.tz)?;
            return self.create(request, &range, count).await;
        }

        self.enter(FixStage::FetchingBefore);
        let fetched = self
            .gateway
            .fetch_events(super::upcoming(&request.before, &self.tz))
            .await
            .map_err(FixError::Provider)?;
        let events = super::named(fetched, &request.before);

        if events.is_empty() {
            self.enter(FixStage::NotFound);
            writeln!(out, "No upcoming events found.")?;
            return Ok(FixOutcome::NotFound { had_events: false });
        }

        self.enter(FixStage::Displaying);
        for line in self.formatter.format_buckets(&group_by_day(&events, &self.tz)) {
            writeln!(out, "{}", line)?;
        }

        self.enter(FixStage::CheckingRange);
        let range = DateTimeRange::parse(&request.range, &self.tz)?;
        if !range.overlaps_any(&events, &self.tz) {
            self.enter(FixStage::NotFound);
            writeln!(out, "Could not find schedule in \"{}\" events.", request.before)?;
            return Ok(FixOutcome::NotFound { had_events: true });
        }

        self.enter(FixStage::AwaitingConfirmation);
        writeln!(out, "Are you sure to remove schedules?")?;
        out.flush()?;
        let question = format!(
            "And add this?\n{}\n(y/n) > ",
            self.formatter.format_range(&range)
        );
        if confirm(&mut *self.prompt, &question).map_err(FixError::Prompt)? == Confirmation::Abort {
            self.enter(FixStage::Aborted);
            return Ok(FixOutcome::Aborted);
        }

        self.enter(FixStage::Deleting);
        let count = self
            .gateway
            .delete_events(&events)
            .await
            .map_err(FixError::Provider)?;
        *deleted = Some(count);

        self.create(request, &range, count).await
    }

    async fn create(
        &self,
        request: &FixRequest,
        range: &DateTimeRange,
        deleted: usize,
    ) -> Result<FixOutcome, FixError> {
        self.enter(FixStage::Creating);
        let created = self
            .gateway
            .create_event(&request.after, range)
            .await
            .map_err(FixError::Provider)?;

        self.enter(FixStage::Done);
        info!(
            "replaced {} {:?} events with {:?} ({})",
            deleted, request.before, request.after, range
        );
        Ok(FixOutcome::Replaced { deleted, created })
    }

    fn enter(&self, stage: FixStage) {
        debug!(gateway = self.gateway.name(), "fix stage: {}", stage);
    }
}
