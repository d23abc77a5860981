//! Timestamp rendering and user-input parsing in a fixed display offset.

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::core::{Result, TrackerError};

/// UTC+8, the zone the tracked servers run on.
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 8 * 3600;

const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

lazy_static! {
    static ref CLOCK_TIME: Regex = Regex::new(r"^(\d{1,2}):(\d{2})$").expect("clock time pattern");
}

pub fn default_display_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or(Utc.fix())
}

/// Renders `at` as `YYYY/MM/DD HH:MM:SS` in `offset`.
pub fn format_timestamp(at: DateTime<Utc>, offset: &FixedOffset) -> String {
    at.with_timezone(offset).format(DISPLAY_FORMAT).to_string()
}

/// Parses `+HH:MM`, `-HH:MM`, `Z` or `UTC`.
pub fn parse_utc_offset(input: &str) -> Result<FixedOffset> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("z") || input.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let invalid = || TrackerError::Config(format!("invalid UTC offset '{input}', expected +HH:MM"));

    let (sign, rest) = match input.as_bytes().first() {
        Some(b'+') => (1, &input[1..]),
        Some(b'-') => (-1, &input[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Parses a user-entered kill time.
///
/// Accepts:
/// - `HH:MM` / `H:MM`: today's date in `offset`
/// - RFC 3339 (`2024-01-01T08:00:00Z`, `2024-01-01T08:00:00+08:00`)
/// - `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM[:SS]`, `YYYY/MM/DD HH:MM[:SS]`
///   interpreted in `offset`
pub fn parse_kill_time(
    input: &str,
    now: DateTime<Utc>,
    offset: &FixedOffset,
) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    let invalid = || {
        TrackerError::InvalidTimestamp(format!(
            "unsupported time '{trimmed}', use HH:MM or a full date-time"
        ))
    };

    if trimmed.contains('T') || trimmed.contains(' ') {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(parsed.with_timezone(&Utc));
        }
        return DATE_TIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
            .and_then(|naive| local_to_utc(naive, offset))
            .ok_or_else(invalid);
    }

    let captures = CLOCK_TIME.captures(trimmed).ok_or_else(invalid)?;
    let hours: u32 = captures[1].parse().map_err(|_| invalid())?;
    let minutes: u32 = captures[2].parse().map_err(|_| invalid())?;
    let time = NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)?;
    let today = now.with_timezone(offset).date_naive();

    local_to_utc(today.and_time(time), offset).ok_or_else(invalid)
}

fn local_to_utc(naive: NaiveDateTime, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}
