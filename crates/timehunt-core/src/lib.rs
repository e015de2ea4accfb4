//! Core types: event times, range parsing, day grouping, formatting

pub mod event;
pub mod format;
pub mod group;
pub mod range;
pub mod time;
pub mod tracing;

pub use event::CalendarEvent;
pub use format::{BusinessWindow, DayFormatter, DisplayConfigError, DisplayOptions, parse_locale};
pub use group::{DayBucket, group_by_day};
pub use range::{DateTimeRange, RangeParseError};
pub use time::{EventTime, resolve_local, start_of_day};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
