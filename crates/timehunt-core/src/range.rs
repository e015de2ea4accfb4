//! Date-time range expressions.
//!
//! A range expression is two date-times joined by a tilde:
//!
//! ```text
//! START~END
//! ```
//!
//! The ASCII `~` and the full-width `～` are both accepted. Each side is one of:
//!
//! | Form | Example | Meaning |
//! |---|---|---|
//! | date | `2024-06-01` | 00:00 as a start, 24:00 as an end |
//! | date-time | `2024-06-01T10:00`, `2024-06-01 10:00:30` | local wall-clock time |
//! | RFC 3339 | `2024-06-01T10:00:00+09:00` | exact instant |
//!
//! Local forms are read in the timezone passed to [`DateTimeRange::parse`].
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use timehunt_core::DateTimeRange;
//!
//! let range = DateTimeRange::parse("2024-06-01T10:00~2024-06-01T12:00", &Utc).unwrap();
//! assert_eq!(range.duration(), chrono::Duration::hours(2));
//! ```

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use crate::event::CalendarEvent;
use crate::time::{resolve_local, start_of_day};

const DELIMITERS: [char; 2] = ['~', '～'];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors produced while parsing a range expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeParseError {
    /// The expression has no `~` delimiter.
    #[error("expected START~END, found no '~' in {0:?}")]
    MissingDelimiter(String),

    /// The expression has more than one delimiter.
    #[error("expected exactly one '~' in {0:?}")]
    TooManyDelimiters(String),

    /// One side of the delimiter is blank.
    #[error("missing {0} date-time")]
    EmptyToken(&'static str),

    /// A token is not a recognised date or date-time.
    #[error("invalid date-time {token:?} (expected YYYY-MM-DD, YYYY-MM-DDTHH:MM or RFC 3339)")]
    InvalidDateTime {
        /// The offending token.
        token: String,
    },

    /// A local date-time does not exist in the target timezone.
    #[error("local time {token:?} does not exist in this timezone")]
    NonexistentLocalTime {
        /// The offending token.
        token: String,
    },

    /// The start is after the end.
    #[error("range start {start} is after its end {end}")]
    StartAfterEnd {
        /// The parsed start.
        start: DateTime<Utc>,
        /// The parsed end.
        end: DateTime<Utc>,
    },
}

/// Which side of the range a token is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

impl Bound {
    fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

/// A validated `[start, end)` range of instants.
///
/// The only way to obtain one is [`DateTimeRange::parse`], which guarantees
/// `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateTimeRange {
    /// Parses a `START~END` expression, reading local date-times in `tz`.
    ///
    /// # Errors
    ///
    /// Returns [`RangeParseError`] when the expression does not split into
    /// exactly two tokens, a token does not parse, or the start is after the end.
    pub fn parse<Tz: TimeZone>(expr: &str, tz: &Tz) -> Result<Self, RangeParseError> {
        let parts: Vec<&str> = expr.split(DELIMITERS).collect();
        let (start_token, end_token) = match parts.as_slice() {
            [_] => return Err(RangeParseError::MissingDelimiter(expr.to_string())),
            [start, end] => (start.trim(), end.trim()),
            _ => return Err(RangeParseError::TooManyDelimiters(expr.to_string())),
        };

        let start = parse_bound(start_token, Bound::Start, tz)?;
        let end = parse_bound(end_token, Bound::End, tz)?;

        if start > end {
            return Err(RangeParseError::StartAfterEnd { start, end });
        }

        Ok(Self { start, end })
    }

    /// Start of the range (inclusive).
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the range (exclusive).
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the range.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks whether `event` overlaps this range.
    ///
    /// Both intervals are half-open, so an event ending exactly at the range
    /// start, or starting exactly at the range end, does not overlap.
    pub fn overlaps<Tz: TimeZone>(&self, event: &CalendarEvent, tz: &Tz) -> bool {
        let (start, end) = event.span(tz);
        start < self.end && end > self.start
    }

    /// Checks whether any of `events` overlaps this range.
    ///
    /// Returns `false` for an empty slice.
    pub fn overlaps_any<Tz: TimeZone>(&self, events: &[CalendarEvent], tz: &Tz) -> bool {
        events.iter().any(|event| self.overlaps(event, tz))
    }
}

impl fmt::Display for DateTimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

fn parse_bound<Tz: TimeZone>(
    token: &str,
    bound: Bound,
    tz: &Tz,
) -> Result<DateTime<Utc>, RangeParseError> {
    if token.is_empty() {
        return Err(RangeParseError::EmptyToken(bound.as_str()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Some(naive) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(token, fmt).ok())
    {
        return resolve_local(&naive, tz).ok_or_else(|| RangeParseError::NonexistentLocalTime {
            token: token.to_string(),
        });
    }

    let date = NaiveDate::parse_from_str(token, DATE_FORMAT).map_err(|_| {
        RangeParseError::InvalidDateTime {
            token: token.to_string(),
        }
    })?;

    let day = match bound {
        Bound::Start => date,
        // A date-only end means the end of that day.
        Bound::End => date.succ_opt().ok_or_else(|| RangeParseError::InvalidDateTime {
            token: token.to_string(),
        })?,
    };

    Ok(start_of_day(day, tz))
}
