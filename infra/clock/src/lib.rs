//! # Clock
//!
//! Date and time helpers over `chrono`.
//!
//! The workspace-wide display convention is `%Y-%m-%d %H:%M:%S` for
//! timestamps and `%Y-%m-%d` for dates; the parse helpers accept the same
//! shapes. Arithmetic helpers are total: an out-of-range shift returns the
//! input unchanged instead of panicking.
//!
//! ## Example
//!
//! ```rust
//! use shed_clock as clock;
//!
//! let dt = clock::parse_date_time("2024-03-01 10:20:30").unwrap();
//! assert_eq!(clock::to_date_string(&dt), "2024-03-01");
//! assert_eq!(clock::to_date_time_string(&clock::plus_days(dt, 1)), "2024-03-02 10:20:30");
//! ```

mod error;

pub use crate::error::{ClockError, ClockErrorExt};
pub use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use chrono::TimeDelta;

/// Timestamp display format used across the workspace.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Date display format used across the workspace.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Seconds since the Unix epoch.
#[must_use]
pub fn unix_seconds() -> i64 {
    Local::now().timestamp()
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn unix_millis() -> i64 {
    Local::now().timestamp_millis()
}

/// Nanoseconds since the Unix epoch.
///
/// Saturates instead of overflowing far in the future.
#[must_use]
pub fn unix_nanos() -> i64 {
    Local::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// The current local date and time.
#[must_use]
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// The current local time as `%Y-%m-%d %H:%M:%S`.
#[must_use]
pub fn now_string() -> String {
    Local::now().format(DATE_TIME_FORMAT).to_string()
}

/// The current local date.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The current local date as `%Y-%m-%d`.
#[must_use]
pub fn today_string() -> String {
    today().format(DATE_FORMAT).to_string()
}

/// Builds a timestamp from components.
///
/// # Errors
/// Returns [`ClockError::InvalidComponents`] for an impossible date or time.
pub fn date_time(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Result<NaiveDateTime, ClockError> {
    date(year, month, day)?.and_hms_opt(hour, minute, second).ok_or_else(|| {
        ClockError::InvalidComponents {
            message: format!("time {hour:02}:{minute:02}:{second:02} is out of range").into(),
            context: None,
        }
    })
}

/// Builds a date from components.
///
/// # Errors
/// Returns [`ClockError::InvalidComponents`] for an impossible date.
pub fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate, ClockError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| ClockError::InvalidComponents {
        message: format!("date {year:04}-{month:02}-{day:02} does not exist").into(),
        context: None,
    })
}

/// Parses a timestamp with an explicit `strftime` format.
///
/// # Errors
/// Returns [`ClockError::Parse`] when the text does not match the format.
pub fn parse(text: &str, format: &str) -> Result<NaiveDateTime, ClockError> {
    NaiveDateTime::parse_from_str(text, format).context(format!("parsing '{text}'"))
}

/// Parses a `%Y-%m-%d %H:%M:%S` timestamp.
///
/// # Errors
/// Returns [`ClockError::Parse`] when the text does not match.
pub fn parse_date_time(text: &str) -> Result<NaiveDateTime, ClockError> {
    parse(text, DATE_TIME_FORMAT)
}

/// Parses a `%Y-%m-%d` date.
///
/// # Errors
/// Returns [`ClockError::Parse`] when the text does not match.
pub fn parse_date(text: &str) -> Result<NaiveDate, ClockError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).context(format!("parsing '{text}'"))
}

/// Formats a timestamp with an explicit `strftime` format.
#[must_use]
pub fn format(dt: &NaiveDateTime, format: &str) -> String {
    dt.format(format).to_string()
}

/// Formats the date part of a timestamp as `%Y-%m-%d`.
#[must_use]
pub fn to_date_string(dt: &NaiveDateTime) -> String {
    dt.format(DATE_FORMAT).to_string()
}

/// Formats a timestamp as `%Y-%m-%d %H:%M:%S`.
#[must_use]
pub fn to_date_time_string(dt: &NaiveDateTime) -> String {
    dt.format(DATE_TIME_FORMAT).to_string()
}

/// Midnight at the start of `date`.
#[must_use]
pub fn date_to_date_time(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Shifts a timestamp by whole days.
#[must_use]
pub fn plus_days(dt: NaiveDateTime, days: i64) -> NaiveDateTime {
    shift(dt, TimeDelta::try_days(days))
}

/// Shifts a timestamp by whole hours.
#[must_use]
pub fn plus_hours(dt: NaiveDateTime, hours: i64) -> NaiveDateTime {
    shift(dt, TimeDelta::try_hours(hours))
}

/// Shifts a timestamp by whole minutes.
#[must_use]
pub fn plus_minutes(dt: NaiveDateTime, minutes: i64) -> NaiveDateTime {
    shift(dt, TimeDelta::try_minutes(minutes))
}

/// Shifts a timestamp by whole seconds.
#[must_use]
pub fn plus_seconds(dt: NaiveDateTime, seconds: i64) -> NaiveDateTime {
    shift(dt, TimeDelta::try_seconds(seconds))
}

fn shift(dt: NaiveDateTime, delta: Option<TimeDelta>) -> NaiveDateTime {
    delta.and_then(|d| dt.checked_add_signed(d)).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_clocks_are_monotonic_scales() {
        let seconds = unix_seconds();
        let millis = unix_millis();
        assert!(seconds > 1_700_000_000, "clock is before 2023: {seconds}");
        assert!(millis >= seconds * 1000);
        assert!(millis < (seconds + 2) * 1000);
    }

    #[test]
    fn now_string_matches_convention() {
        let text = now_string();
        assert!(parse_date_time(&text).is_ok(), "{text}");
        assert!(parse_date(&today_string()).is_ok());
    }

    #[test]
    fn component_construction_and_getters() {
        let dt = date_time(2024, 2, 29, 23, 59, 58).unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 2);
        assert_eq!(dt.day(), 29);
        assert_eq!(dt.hour(), 23);
        assert_eq!(dt.minute(), 59);
        assert_eq!(dt.second(), 58);

        assert!(date(2023, 2, 29).is_err());
        assert!(date_time(2024, 1, 1, 24, 0, 0).is_err());
    }

    #[test]
    fn parse_round_trips() {
        let dt = parse_date_time("2024-03-01 10:20:30").unwrap();
        assert_eq!(to_date_time_string(&dt), "2024-03-01 10:20:30");
        assert_eq!(to_date_string(&dt), "2024-03-01");
        assert_eq!(format(&dt, "%d/%m/%Y"), "01/03/2024");

        let d = parse_date("2024-02-29").unwrap();
        assert_eq!(d, date(2024, 2, 29).unwrap());

        assert!(parse_date("2024-02-30").is_err());
        assert!(parse("10:20", DATE_TIME_FORMAT).is_err());
    }

    #[test]
    fn parse_error_carries_context() {
        let err = parse_date("not a date").unwrap_err();
        assert!(matches!(err, ClockError::Parse { .. }));
        assert!(err.to_string().contains("parsing 'not a date'"));
    }

    #[test]
    fn arithmetic_crosses_boundaries() {
        let dt = parse_date_time("2024-01-31 00:00:00").unwrap();
        assert_eq!(to_date_string(&plus_days(dt, 1)), "2024-02-01");
        assert_eq!(to_date_string(&plus_days(dt, -31)), "2023-12-31");

        let dt = parse_date_time("2024-12-31 23:59:59").unwrap();
        assert_eq!(to_date_time_string(&plus_seconds(dt, 2)), "2025-01-01 00:00:01");
        assert_eq!(to_date_time_string(&plus_hours(dt, 1)), "2025-01-01 00:59:59");
        assert_eq!(to_date_time_string(&plus_minutes(dt, 1)), "2025-01-01 00:00:59");
    }

    #[test]
    fn out_of_range_shift_returns_input() {
        let dt = parse_date_time("2024-01-01 00:00:00").unwrap();
        assert_eq!(plus_days(dt, i64::MAX), dt);
    }

    #[test]
    fn midnight_promotion() {
        let d = date(2024, 5, 6).unwrap();
        assert_eq!(to_date_time_string(&date_to_date_time(d)), "2024-05-06 00:00:00");
    }
}
