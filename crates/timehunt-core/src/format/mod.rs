//! Display formatting for grouped events.
//!
//! The formatter renders one line per day:
//!
//! ```text
//! 2024年6月1日(土) : 10:00～15:00 or 終日
//! ```
//!
//! It carries no locale of its own. Templates, locale data and the business
//! window that decides what counts as "all day" all come in through
//! [`DisplayOptions`].
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use timehunt_core::{DayFormatter, DisplayOptions, group_by_day};
//!
//! let formatter = DayFormatter::new(DisplayOptions::default(), Utc);
//! let events = Vec::new();
//! let lines = formatter.format_buckets(&group_by_day(&events, &Utc));
//! assert!(lines.is_empty());
//! ```

use chrono::{DateTime, Locale, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use thiserror::Error;

use crate::event::CalendarEvent;
use crate::group::DayBucket;
use crate::range::DateTimeRange;

#[cfg(test)]
mod golden_tests;

/// Errors in display configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayConfigError {
    /// The business window closes before it opens.
    #[error("business window must open before it closes ({start} >= {end})")]
    InvertedWindow {
        /// Configured opening time.
        start: NaiveTime,
        /// Configured closing time.
        end: NaiveTime,
    },

    /// A time-of-day setting does not parse.
    #[error("invalid time of day {0:?} (expected HH:MM)")]
    InvalidTime(String),

    /// The locale name is unknown.
    #[error("unknown locale {0:?}")]
    UnknownLocale(String),
}

/// The time-of-day window treated as a full working day.
///
/// An event covering this whole window on its start day is shown with the
/// all-day label, and a timed event ending exactly at the closing time is
/// shown with its start time only. This is an organizational convention, so
/// it is configurable; the default is 09:00–19:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl BusinessWindow {
    /// Default opening time.
    pub const DEFAULT_START: (u32, u32) = (9, 0);
    /// Default closing time.
    pub const DEFAULT_END: (u32, u32) = (19, 0);

    /// Creates a window. `start` must be before `end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, DisplayConfigError> {
        if start >= end {
            return Err(DisplayConfigError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses a window from two `HH:MM` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, DisplayConfigError> {
        Self::new(parse_time_of_day(start)?, parse_time_of_day(end)?)
    }

    /// Opening time.
    pub fn start(&self) -> NaiveTime {
        self.start
    }

    /// Closing time.
    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Checks whether a local span covers the whole window on `day`.
    fn covers(&self, day: NaiveDate, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start <= day.and_time(self.start) && end >= day.and_time(self.end)
    }

    /// Checks whether `end` is exactly closing time on `day`.
    fn closes_at(&self, day: NaiveDate, end: NaiveDateTime) -> bool {
        end == day.and_time(self.end)
    }
}

impl Default for BusinessWindow {
    fn default() -> Self {
        let (sh, sm) = Self::DEFAULT_START;
        let (eh, em) = Self::DEFAULT_END;
        Self {
            start: NaiveTime::from_hms_opt(sh, sm, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(eh, em, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

fn parse_time_of_day(value: &str) -> Result<NaiveTime, DisplayConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| DisplayConfigError::InvalidTime(value.to_string()))
}

/// Parses a locale name such as `ja_JP` or `en_US`.
pub fn parse_locale(name: &str) -> Result<Locale, DisplayConfigError> {
    Locale::try_from(name).map_err(|_| DisplayConfigError::UnknownLocale(name.to_string()))
}

/// Configuration for the display formatter.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayOptions {
    /// strftime template for day headers.
    pub date_format: String,
    /// strftime template for times of day.
    pub time_format: String,
    /// Locale used to render names of days and months.
    pub locale: Locale,
    /// Label shown for events that fill the business window.
    pub all_day_label: String,
    /// Text between a start and an end time.
    pub range_separator: String,
    /// Text between two events on the same day.
    pub alternative_separator: String,
    /// The window that counts as a full day.
    pub business_window: BusinessWindow,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            date_format: "%Y年%-m月%-d日(%a)".to_string(),
            time_format: "%H:%M".to_string(),
            locale: Locale::ja_JP,
            all_day_label: "終日".to_string(),
            range_separator: "～".to_string(),
            alternative_separator: " or ".to_string(),
            business_window: BusinessWindow::default(),
        }
    }
}

/// Renders days and event spans as text.
#[derive(Debug, Clone)]
pub struct DayFormatter<Tz: TimeZone> {
    options: DisplayOptions,
    tz: Tz,
}

impl<Tz: TimeZone> DayFormatter<Tz>
where
    Tz::Offset: std::fmt::Display,
{
    /// Creates a formatter rendering local times in `tz`.
    pub fn new(options: DisplayOptions, tz: Tz) -> Self {
        Self { options, tz }
    }

    /// Returns the formatter options.
    pub fn options(&self) -> &DisplayOptions {
        &self.options
    }

    /// Formats every bucket, one line each.
    pub fn format_buckets(&self, buckets: &[DayBucket<'_>]) -> Vec<String> {
        buckets.iter().map(|b| self.format_bucket(b)).collect()
    }

    /// Formats a bucket as `"{header} : {span}{alt}{span}..."`.
    pub fn format_bucket(&self, bucket: &DayBucket<'_>) -> String {
        let spans: Vec<String> = bucket.events.iter().map(|e| self.format_span(e)).collect();
        format!(
            "{} : {}",
            self.format_header(bucket),
            spans.join(&self.options.alternative_separator)
        )
    }

    /// Formats the day header of a bucket.
    pub fn format_header(&self, bucket: &DayBucket<'_>) -> String {
        self.format_day(bucket.date)
    }

    /// Formats the time span of one event.
    pub fn format_span(&self, event: &CalendarEvent) -> String {
        if event.is_all_day() {
            return self.options.all_day_label.clone();
        }
        let (start, end) = event.span(&self.tz);
        self.format_instants(start, end)
    }

    /// Formats a requested range as a single line with its day header.
    ///
    /// A range reaching past its start day names the day it ends on. Whole
    /// days (midnight to midnight) show the first and last day with the
    /// all-day label.
    pub fn format_range(&self, range: &DateTimeRange) -> String {
        let local_start = range.start().with_timezone(&self.tz);
        let local_end = range.end().with_timezone(&self.tz);
        let first_day = local_start.date_naive();
        let last_day = if local_end.time() == NaiveTime::MIN && local_end > local_start {
            local_end.date_naive().pred_opt().unwrap_or(first_day)
        } else {
            local_end.date_naive()
        };

        if last_day <= first_day {
            return format!(
                "{} : {}",
                self.format_day(first_day),
                self.format_instants(range.start(), range.end())
            );
        }

        if local_start.time() == NaiveTime::MIN && local_end.time() == NaiveTime::MIN {
            return format!(
                "{}{}{} : {}",
                self.format_day(first_day),
                self.options.range_separator,
                self.format_day(last_day),
                self.options.all_day_label
            );
        }

        format!(
            "{} : {}{}{} {}",
            self.format_day(first_day),
            self.format_time(&local_start),
            self.options.range_separator,
            self.format_day(local_end.date_naive()),
            self.format_time(&local_end)
        )
    }

    /// Formats a raw `[start, end)` pair of instants.
    ///
    /// Spans covering the business window become the all-day label; spans
    /// ending at closing time on their start day show the start only.
    pub fn format_instants(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        let window = &self.options.business_window;
        let local_start = start.with_timezone(&self.tz);
        let local_end = end.with_timezone(&self.tz);
        let day = local_start.date_naive();

        if window.covers(day, local_start.naive_local(), local_end.naive_local()) {
            return self.options.all_day_label.clone();
        }

        let start_str = self.format_time(&local_start);
        if window.closes_at(day, local_end.naive_local()) {
            start_str
        } else {
            format!(
                "{}{}{}",
                start_str,
                self.options.range_separator,
                self.format_time(&local_end)
            )
        }
    }

    /// Renders a calendar day with the date template.
    ///
    /// The day is pinned to UTC midnight so the template sees that exact date
    /// whatever the formatter's zone does at midnight.
    fn format_day(&self, day: NaiveDate) -> String {
        day.and_time(NaiveTime::MIN)
            .and_utc()
            .format_localized(&self.options.date_format, self.options.locale)
            .to_string()
    }

    fn format_time(&self, local: &DateTime<Tz>) -> String {
        local
            .format_localized(&self.options.time_format, self.options.locale)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::EventTime;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap()
    }

    fn formatter() -> DayFormatter<Utc> {
        DayFormatter::new(DisplayOptions::default(), Utc)
    }

    #[test]
    fn business_window_must_be_ordered() {
        assert!(BusinessWindow::parse("09:00", "19:00").is_ok());
        assert!(matches!(
            BusinessWindow::parse("19:00", "09:00"),
            Err(DisplayConfigError::InvertedWindow { .. })
        ));
        assert!(matches!(
            BusinessWindow::parse("10:00", "10:00"),
            Err(DisplayConfigError::InvertedWindow { .. })
        ));
        assert!(matches!(
            BusinessWindow::parse("9am", "19:00"),
            Err(DisplayConfigError::InvalidTime(_))
        ));
    }

    #[test]
    fn default_window_is_nine_to_seven() {
        let window = BusinessWindow::default();
        assert_eq!(window, BusinessWindow::parse("09:00", "19:00").unwrap());
        assert_eq!(window.start(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(window.end(), NaiveTime::from_hms_opt(19, 0, 0).unwrap());
    }

    #[test]
    fn locale_names() {
        assert_eq!(parse_locale("ja_JP").unwrap(), Locale::ja_JP);
        assert_eq!(parse_locale("en_US").unwrap(), Locale::en_US);
        assert!(matches!(
            parse_locale("xx_YY"),
            Err(DisplayConfigError::UnknownLocale(_))
        ));
    }

    #[test]
    fn exact_business_window_is_all_day() {
        assert_eq!(formatter().format_instants(at(9, 0), at(19, 0)), "終日");
    }

    #[test]
    fn wider_than_business_window_is_all_day() {
        assert_eq!(formatter().format_instants(at(8, 0), at(20, 0)), "終日");
    }

    #[test]
    fn ending_at_closing_time_omits_end() {
        assert_eq!(formatter().format_instants(at(10, 0), at(19, 0)), "10:00");
    }

    #[test]
    fn regular_span_shows_both_ends() {
        assert_eq!(formatter().format_instants(at(10, 0), at(15, 0)), "10:00～15:00");
    }

    #[test]
    fn starting_at_opening_time_shows_both_ends() {
        assert_eq!(formatter().format_instants(at(9, 0), at(18, 30)), "09:00～18:30");
    }

    #[test]
    fn all_day_events_use_label() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let event = CalendarEvent::new(
            "evt",
            "Holiday",
            EventTime::from_date(day),
            EventTime::from_date(day.succ_opt().unwrap()),
        );
        assert_eq!(formatter().format_span(&event), "終日");
    }

    #[test]
    fn custom_window_and_labels() {
        let options = DisplayOptions {
            time_format: "%-I:%M %p".to_string(),
            locale: Locale::en_US,
            all_day_label: "all day".to_string(),
            range_separator: " - ".to_string(),
            business_window: BusinessWindow::parse("08:00", "17:00").unwrap(),
            ..DisplayOptions::default()
        };
        let formatter = DayFormatter::new(options, Utc);

        assert_eq!(formatter.format_instants(at(8, 0), at(17, 0)), "all day");
        assert_eq!(formatter.format_instants(at(9, 0), at(19, 0)), "9:00 AM - 7:00 PM");
        assert_eq!(formatter.format_instants(at(13, 0), at(17, 0)), "1:00 PM");
    }
}
