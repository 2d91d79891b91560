//! Time formatting and parsing utilities for the player.
//!
//! This module converts between the representations the player deals with:
//! - `Duration` positions reported by the engine
//! - Clock strings shown next to the scrub bar (`MM:SS`, `HH:MM:SS`)
//! - Episode durations published by feeds (`SS`, `MM:SS`, `HH:MM:SS`)
//! - Publication dates rendered in the listener's time zone

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::errors::PlayerError;

/// Publication date pattern, e.g. `Wed, May 1, 2024 @ 07:00 AM`
pub const PUBLISH_DATE_FORMAT: &str = "%a, %b %-d, %Y @ %I:%M %p";

/// Formats a duration in seconds as HH:MM:SS.
///
/// # Examples
/// ```
/// # use hpmplayer::time_utils::format_hhmmss;
/// assert_eq!(format_hhmmss(0), "00:00:00");
/// assert_eq!(format_hhmmss(61), "00:01:01");
/// assert_eq!(format_hhmmss(3661), "01:01:01");
/// ```
pub fn format_hhmmss(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Formats a playback position for display.
///
/// Uses `MM:SS` below one hour and `HH:MM:SS` from one hour up. Sub-second
/// precision is truncated.
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use hpmplayer::time_utils::format_clock;
/// assert_eq!(format_clock(Duration::from_millis(290_000)), "04:50");
/// assert_eq!(format_clock(Duration::from_secs(3723)), "01:02:03");
/// ```
pub fn format_clock(position: Duration) -> String {
    let seconds = position.as_secs();
    if seconds >= 3600 {
        format_hhmmss(seconds)
    } else {
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    }
}

/// Parses a time string in HH:MM:SS, MM:SS, or SS format to seconds.
///
/// # Examples
/// ```
/// # use hpmplayer::time_utils::parse_time_flexible;
/// assert_eq!(parse_time_flexible("01:02:03").unwrap(), 3723);
/// assert_eq!(parse_time_flexible("02:03").unwrap(), 123);
/// assert_eq!(parse_time_flexible("42").unwrap(), 42);
/// ```
///
/// # Errors
/// Returns an error if:
/// - The input has more than 3 parts
/// - Any part is not a valid u32
pub fn parse_time_flexible(input: &str) -> Result<u32, PlayerError> {
    let trimmed = input.trim();
    let parts: Vec<&str> = trimmed.split(':').collect();

    if trimmed.is_empty() || parts.len() > 3 {
        return Err(PlayerError::InvalidTimeFormat(format!(
            "Invalid time format '{}': expected HH:MM:SS, MM:SS, or SS",
            input
        )));
    }

    let mut total = 0u32;
    for part in parts {
        let value = part.parse::<u32>().map_err(|_| {
            PlayerError::InvalidTimeFormat(format!(
                "Invalid numeric value '{}' in time string '{}'",
                part, input
            ))
        })?;
        total = total
            .checked_mul(60)
            .and_then(|t| t.checked_add(value))
            .ok_or_else(|| PlayerError::InvalidTimeFormat(format!("'{}' is too large", input)))?;
    }

    Ok(total)
}

/// Parses a time string into a `Duration`. See [`parse_time_flexible`].
pub fn parse_duration(input: &str) -> Result<Duration, PlayerError> {
    parse_time_flexible(input).map(|secs| Duration::from_secs(secs as u64))
}

/// Clamps a seek target into `[0, duration]`.
///
/// Without a known duration only the lower bound applies, which `Duration`
/// already guarantees.
pub fn clamp_position(target: Duration, duration: Option<Duration>) -> Duration {
    match duration {
        Some(max) if target > max => max,
        _ => target,
    }
}

/// Renders a publication instant in the given time zone.
///
/// # Examples
/// ```
/// # use chrono::{TimeZone, Utc, FixedOffset};
/// # use hpmplayer::time_utils::format_publish_date;
/// let published = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
/// let houston = FixedOffset::west_opt(5 * 3600).unwrap();
/// assert_eq!(format_publish_date(&published, &houston), "Wed, May 1, 2024 @ 07:00 AM");
/// ```
pub fn format_publish_date<Tz>(published: &DateTime<Utc>, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    published
        .with_timezone(zone)
        .format(PUBLISH_DATE_FORMAT)
        .to_string()
}
