//! Golden tests for day-line formatting.
//!
//! Inline insta snapshots pin the rendered text. Run `cargo insta review`
//! after intentional changes.

use chrono::{DateTime, FixedOffset, Locale, NaiveDate, TimeZone, Utc};

use crate::event::CalendarEvent;
use crate::format::{BusinessWindow, DayFormatter, DisplayOptions};
use crate::group::group_by_day;
use crate::range::DateTimeRange;
use crate::time::EventTime;

fn tokyo() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

/// A timed event given in Tokyo wall-clock time.
fn timed(id: &str, d: u32, start: (u32, u32), end: (u32, u32)) -> CalendarEvent {
    let tz = tokyo();
    let local = |(h, m): (u32, u32)| -> DateTime<FixedOffset> {
        tz.with_ymd_and_hms(2024, 6, d, h, m, 0).unwrap()
    };
    CalendarEvent::new(
        id,
        "Focus",
        EventTime::from_local(local(start)),
        EventTime::from_local(local(end)),
    )
}

fn all_day(id: &str, d: u32) -> CalendarEvent {
    let day = NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
    CalendarEvent::new(
        id,
        "Focus",
        EventTime::from_date(day),
        EventTime::from_date(day.succ_opt().unwrap()),
    )
}

fn render(events: &[CalendarEvent], options: DisplayOptions) -> String {
    let tz = tokyo();
    let formatter = DayFormatter::new(options, tz);
    formatter
        .format_buckets(&group_by_day(events, &tz))
        .join("\n")
}

#[test]
fn golden_single_span() {
    let events = vec![timed("a", 1, (10, 0), (15, 0))];
    insta::assert_snapshot!(render(&events, DisplayOptions::default()), @"2024年6月1日(土) : 10:00～15:00");
}

#[test]
fn golden_business_day_is_all_day() {
    let events = vec![timed("a", 1, (9, 0), (19, 0))];
    insta::assert_snapshot!(render(&events, DisplayOptions::default()), @"2024年6月1日(土) : 終日");
}

#[test]
fn golden_closing_time_end_is_omitted() {
    let events = vec![timed("a", 1, (10, 0), (19, 0))];
    insta::assert_snapshot!(render(&events, DisplayOptions::default()), @"2024年6月1日(土) : 10:00");
}

#[test]
fn golden_week_of_alternatives() {
    let events = vec![
        timed("a", 3, (13, 0), (14, 30)),
        all_day("b", 1),
        timed("c", 3, (16, 0), (19, 0)),
        timed("d", 1, (9, 0), (12, 0)),
        timed("e", 4, (9, 0), (19, 0)),
    ];
    insta::assert_snapshot!(render(&events, DisplayOptions::default()), @r"
    2024年6月1日(土) : 終日 or 09:00～12:00
    2024年6月3日(月) : 13:00～14:30 or 16:00
    2024年6月4日(火) : 終日
    ");
}

#[test]
fn golden_english_locale() {
    let options = DisplayOptions {
        date_format: "%a, %b %-d %Y".to_string(),
        time_format: "%H:%M".to_string(),
        locale: Locale::en_US,
        all_day_label: "all day".to_string(),
        range_separator: "-".to_string(),
        alternative_separator: " / ".to_string(),
        business_window: BusinessWindow::parse("08:00", "18:00").unwrap(),
    };
    let events = vec![
        timed("a", 2, (8, 0), (18, 0)),
        timed("b", 2, (19, 0), (20, 0)),
        timed("c", 5, (11, 0), (18, 0)),
    ];
    insta::assert_snapshot!(render(&events, options), @r"
    Sun, Jun 2 2024 : all day / 19:00-20:00
    Wed, Jun 5 2024 : 11:00
    ");
}

#[test]
fn golden_requested_range() {
    let tz = tokyo();
    let formatter = DayFormatter::new(DisplayOptions::default(), tz);

    let range = DateTimeRange::parse("2024-06-10 13:00~2024-06-10 15:00", &tz).unwrap();
    insta::assert_snapshot!(formatter.format_range(&range), @"2024年6月10日(月) : 13:00～15:00");

    let range = DateTimeRange::parse("2024-06-11 09:00~2024-06-11 19:00", &tz).unwrap();
    insta::assert_snapshot!(formatter.format_range(&range), @"2024年6月11日(火) : 終日");
}

#[test]
fn golden_requested_range_across_days() {
    let tz = tokyo();
    let formatter = DayFormatter::new(DisplayOptions::default(), tz);
    let show = |expr: &str| formatter.format_range(&DateTimeRange::parse(expr, &tz).unwrap());

    insta::assert_snapshot!(show("2024-06-01T10:00~2024-06-05T15:00"), @"2024年6月1日(土) : 10:00～2024年6月5日(水) 15:00");
    insta::assert_snapshot!(show("2024-06-01T10:00~2024-06-02T10:00"), @"2024年6月1日(土) : 10:00～2024年6月2日(日) 10:00");
    insta::assert_snapshot!(show("2024-06-01~2024-06-03"), @"2024年6月1日(土)～2024年6月3日(月) : 終日");
}

#[test]
fn golden_requested_range_ending_at_midnight() {
    let tz = tokyo();
    let formatter = DayFormatter::new(DisplayOptions::default(), tz);
    let show = |expr: &str| formatter.format_range(&DateTimeRange::parse(expr, &tz).unwrap());

    insta::assert_snapshot!(show("2024-06-01~2024-06-01"), @"2024年6月1日(土) : 終日");
    insta::assert_snapshot!(show("2024-06-01T22:00~2024-06-02T00:00"), @"2024年6月1日(土) : 22:00～00:00");
}

#[test]
fn golden_header_on_dst_start_day() {
    use chrono_tz::America::Santiago;

    let day = NaiveDate::from_ymd_opt(2024, 9, 8).unwrap();
    let events = vec![CalendarEvent::new(
        "a",
        "Focus",
        EventTime::from_date(day),
        EventTime::from_date(day.succ_opt().unwrap()),
    )];
    let formatter = DayFormatter::new(DisplayOptions::default(), Santiago);
    let lines = formatter.format_buckets(&group_by_day(&events, &Santiago)).join("\n");
    insta::assert_snapshot!(lines, @"2024年9月8日(日) : 終日");
}

#[test]
fn golden_utc_rendering_shifts_days() {
    // 23:00 in Tokyo on June 1st is 14:00 UTC the same day; 08:00 Tokyo on
    // June 2nd is 23:00 UTC on June 1st.
    let events = vec![timed("a", 1, (23, 0), (23, 30)), timed("b", 2, (8, 0), (8, 30))];
    let formatter = DayFormatter::new(DisplayOptions::default(), Utc);
    let lines = formatter.format_buckets(&group_by_day(&events, &Utc)).join("\n");
    insta::assert_snapshot!(lines, @"2024年6月1日(土) : 14:00～14:30 or 23:00～23:30");
}
