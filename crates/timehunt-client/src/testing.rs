//! In-memory fakes for command tests.

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{FixedOffset, TimeZone};

use timehunt_core::{CalendarEvent, DateTimeRange, EventTime};
use timehunt_providers::{
    BoxFuture, CalendarGateway, CredentialProvider, FetchOptions, ProviderError, ProviderResult,
};

use crate::prompt::Prompt;

/// UTC+09:00, the zone the command tests render in.
pub(crate) fn tokyo() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

/// A timed event in Tokyo local time on June 2024.
pub(crate) fn event(id: &str, name: &str, day: u32, start: (u32, u32), end: (u32, u32)) -> CalendarEvent {
    let tz = tokyo();
    CalendarEvent::new(
        id,
        name,
        EventTime::from_local(tz.with_ymd_and_hms(2024, 6, day, start.0, start.1, 0).unwrap()),
        EventTime::from_local(tz.with_ymd_and_hms(2024, 6, day, end.0, end.1, 0).unwrap()),
    )
}

/// A calendar gateway backed by a list, failing on demand.
#[derive(Default)]
pub(crate) struct ScriptedGateway {
    events: Mutex<Vec<CalendarEvent>>,
    fetch_failures: Mutex<VecDeque<ProviderError>>,
    delete_failures: Mutex<VecDeque<ProviderError>>,
    create_failures: Mutex<VecDeque<ProviderError>>,
    text_hits: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub(crate) fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Default::default()
        }
    }

    /// The next fetch fails with `err`. Queued failures are used in order.
    pub(crate) fn fail_fetch(self, err: ProviderError) -> Self {
        self.fetch_failures.lock().unwrap().push_back(err);
        self
    }

    /// The next delete fails with `err`.
    pub(crate) fn fail_delete(self, err: ProviderError) -> Self {
        self.delete_failures.lock().unwrap().push_back(err);
        self
    }

    /// The next create fails with `err`.
    pub(crate) fn fail_create(self, err: ProviderError) -> Self {
        self.create_failures.lock().unwrap().push_back(err);
        self
    }

    /// Adds events every query matches, as a full-text search hitting their
    /// description would.
    pub(crate) fn with_text_hits(mut self, events: Vec<CalendarEvent>) -> Self {
        self.text_hits.extend(events.iter().map(|e| e.id.clone()));
        self.events.lock().unwrap().extend(events);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn events(&self) -> Vec<CalendarEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl CalendarGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch_events(&self, options: FetchOptions) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>> {
        let query = options.query.unwrap_or_default();
        self.record(format!("fetch {}", query));
        let result = match self.fetch_failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.name.contains(query.as_str()) || self.text_hits.contains(&e.id))
                .cloned()
                .collect()),
        };
        Box::pin(async move { result })
    }

    fn delete_events<'a>(&'a self, events: &'a [CalendarEvent]) -> BoxFuture<'a, ProviderResult<usize>> {
        self.record(format!("delete {}", events.len()));
        let result = match self.delete_failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => {
                let mut stored = self.events.lock().unwrap();
                let before = stored.len();
                stored.retain(|e| !events.iter().any(|d| d.id == e.id));
                Ok(before - stored.len())
            }
        };
        Box::pin(async move { result })
    }

    fn create_event<'a>(
        &'a self,
        name: &'a str,
        range: &'a DateTimeRange,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>> {
        self.record(format!("create {}", name));
        if let Some(err) = self.create_failures.lock().unwrap().pop_front() {
            return Box::pin(async move { Err(err) });
        }
        let event = CalendarEvent::new(
            "created",
            name,
            EventTime::from_utc(range.start()),
            EventTime::from_utc(range.end()),
        );
        self.events.lock().unwrap().push(event.clone());
        Box::pin(async move { Ok(event) })
    }
}

/// Credentials that count authorizations.
#[derive(Default)]
pub(crate) struct CountingCredentials {
    calls: AtomicU32,
}

impl CountingCredentials {
    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialProvider for CountingCredentials {
    fn authorize(&self) -> BoxFuture<'_, ProviderResult<()>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

/// A prompt answering from a fixed list, then reporting end of input.
#[derive(Default)]
pub(crate) struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub(crate) questions: Vec<String>,
}

impl ScriptedPrompt {
    pub(crate) fn answering(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            questions: Vec::new(),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more answers"))
    }
}
