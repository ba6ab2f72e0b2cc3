//! Device time windows and timestamp normalization
//!
//! Devices expect search bounds as `YYYY-MM-DDTHH:MM:SS+HH:MM` and report
//! event times as ISO 8601. Check-ins are stored as `YYYY-MM-DD HH:MM:SS`
//! in the event's own wall-clock time.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Storage format for check-in timestamps
pub const CHECKIN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a UTC offset such as `+06:00`, `-0330` or `Z`
pub fn parse_utc_offset(input: &str) -> Result<FixedOffset> {
    let s = input.trim();
    if s == "Z" || s == "z" {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| Error::Internal("zero offset out of range".to_string()));
    }

    let invalid = || Error::InvalidInput(format!("Invalid UTC offset: {}", input));

    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Render an offset as `+HH:MM`
pub fn format_utc_offset(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    format!("{}{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60)
}

/// Format a search bound the way the device expects it
pub fn format_device_time(time: NaiveDateTime, offset: FixedOffset) -> String {
    format!(
        "{}{}",
        time.format("%Y-%m-%dT%H:%M:%S"),
        format_utc_offset(offset)
    )
}

/// Which end of a window a bound is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Parse a user-supplied window bound
///
/// Datetimes keep their own wall clock (any offset is dropped; the device
/// offset is applied when formatting). Bare dates expand to the start or
/// end of that day.
pub fn parse_time_bound(input: &str, bound: Bound) -> Result<NaiveDateTime> {
    let s = input.trim();

    if let Ok(dt) = parse_iso_datetime(s) {
        return Ok(dt);
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("Invalid date or datetime: {}", input)))?;

    Ok(match bound {
        Bound::Start => date.and_time(start_of_day()),
        Bound::End => date.and_time(end_of_day()),
    })
}

/// Normalize a device event time to the check-in storage format
pub fn normalize_event_time(input: &str) -> Result<NaiveDateTime> {
    parse_iso_datetime(input.trim())
        .map_err(|_| Error::InvalidInput(format!("Invalid event time: {}", input)))
}

/// Format a check-in time for storage and duplicate checks
pub fn format_checkin_time(time: NaiveDateTime) -> String {
    time.format(CHECKIN_TIME_FORMAT).to_string()
}

fn parse_iso_datetime(s: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
}

fn start_of_day() -> NaiveTime {
    NaiveTime::default()
}

fn end_of_day() -> NaiveTime {
    // 23:59:59 is always representable
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
}

/// Inclusive time range for one device search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidInput(format!(
                "Window start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// 00:00:00 to 23:59:59 of one day
    pub fn for_day(date: NaiveDate) -> Self {
        Self {
            start: date.and_time(start_of_day()),
            end: date.and_time(end_of_day()),
        }
    }

    /// The current day as seen in the device's offset
    pub fn today(offset: FixedOffset) -> Self {
        Self::for_day(now().with_timezone(&offset).date_naive())
    }

    /// Build a window from optional user-supplied bounds
    ///
    /// A missing start or end falls back to today's bound.
    pub fn from_bounds(
        start: Option<&str>,
        end: Option<&str>,
        offset: FixedOffset,
    ) -> Result<Self> {
        let today = Self::today(offset);
        let start = match start {
            Some(s) => parse_time_bound(s, Bound::Start)?,
            None => today.start,
        };
        let end = match end {
            Some(s) => parse_time_bound(s, Bound::End)?,
            None => today.end,
        };
        Self::new(start, end)
    }

    pub fn device_start(&self, offset: FixedOffset) -> String {
        format_device_time(self.start, offset)
    }

    pub fn device_end(&self, offset: FixedOffset) -> String {
        format_device_time(self.end, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dhaka() -> FixedOffset {
        parse_utc_offset("+06:00").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_utc_offset_forms() {
        assert_eq!(parse_utc_offset("+06:00").unwrap().local_minus_utc(), 6 * 3600);
        assert_eq!(parse_utc_offset("-0330").unwrap().local_minus_utc(), -(3 * 3600 + 1800));
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("06:00").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
        assert!(parse_utc_offset("+6").is_err());
    }

    #[test]
    fn test_format_device_time_appends_offset() {
        let formatted = format_device_time(dt("2025-01-07 12:34:56"), dhaka());
        assert_eq!(formatted, "2025-01-07T12:34:56+06:00");

        let west = parse_utc_offset("-05:30").unwrap();
        assert_eq!(
            format_device_time(dt("2025-01-07 00:00:00"), west),
            "2025-01-07T00:00:00-05:30"
        );
    }

    #[test]
    fn test_utc_bound_keeps_wall_clock() {
        // The Z is not converted into the device offset
        let start = parse_time_bound("2025-01-07T12:34:56Z", Bound::Start).unwrap();
        assert_eq!(format_device_time(start, dhaka()), "2025-01-07T12:34:56+06:00");
    }

    #[test]
    fn test_date_bounds_cover_whole_day() {
        let start = parse_time_bound("2025-01-01", Bound::Start).unwrap();
        let end = parse_time_bound("2025-01-07", Bound::End).unwrap();
        assert_eq!(start, dt("2025-01-01 00:00:00"));
        assert_eq!(end, dt("2025-01-07 23:59:59"));
    }

    #[test]
    fn test_invalid_bound_is_rejected() {
        assert!(matches!(
            parse_time_bound("yesterday", Bound::Start),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_normalize_event_time() {
        assert_eq!(
            format_checkin_time(normalize_event_time("2025-01-07T09:00:00Z").unwrap()),
            "2025-01-07 09:00:00"
        );
        assert_eq!(
            format_checkin_time(normalize_event_time("2025-01-07T09:00:00+06:00").unwrap()),
            "2025-01-07 09:00:00"
        );
        assert_eq!(
            format_checkin_time(normalize_event_time("2025-01-07T09:00:00").unwrap()),
            "2025-01-07 09:00:00"
        );
        assert!(normalize_event_time("not a time").is_err());
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        let result = TimeWindow::new(dt("2025-01-08 00:00:00"), dt("2025-01-07 00:00:00"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_day_window() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        let window = TimeWindow::for_day(day);
        assert_eq!(window.device_start(dhaka()), "2025-01-07T00:00:00+06:00");
        assert_eq!(window.device_end(dhaka()), "2025-01-07T23:59:59+06:00");
    }

    #[test]
    fn test_from_bounds_defaults_to_today() {
        let window = TimeWindow::from_bounds(None, None, dhaka()).unwrap();
        assert_eq!(window, TimeWindow::today(dhaka()));

        let window = TimeWindow::from_bounds(Some("2025-01-01"), Some("2025-01-07"), dhaka()).unwrap();
        assert_eq!(window.start, dt("2025-01-01 00:00:00"));
        assert_eq!(window.end, dt("2025-01-07 23:59:59"));
    }
}
