//! Event timestamp parsing and display formatting.
//!
//! Event times arrive in several shapes (`2025-03-26 17:30:00+02`,
//! `2025-03-26T17:30:00+02:00`, `2025-03-26T17:30Z`, or with no offset at
//! all). They are parsed into a [`DateTime<FixedOffset>`] in the offset
//! embedded in the string and are never converted to the viewer's local
//! zone: an event at 17:30 Helsinki time is displayed as 17:30
//! regardless of where it is viewed from. A missing offset is treated as
//! `+00:00`, which displays the wall-clock time unchanged.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Errors from [`parse_event_time`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    /// The date/time portion could not be parsed.
    #[error("invalid event timestamp: {value}")]
    Timestamp {
        /// The original input.
        value: String,
    },

    /// The UTC offset suffix could not be parsed.
    #[error("invalid UTC offset in event timestamp: {value}")]
    Offset {
        /// The original input.
        value: String,
    },
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parses an event timestamp in its embedded UTC offset.
///
/// # Errors
///
/// Returns [`TimeParseError`] if the timestamp or offset is malformed.
pub fn parse_event_time(value: &str) -> Result<DateTime<FixedOffset>, TimeParseError> {
    let trimmed = value.trim();
    let normalized = match trimmed.get(10..11) {
        Some(" ") => format!("{}T{}", &trimmed[..10], trimmed[11..].trim_start()),
        _ => trimmed.to_string(),
    };

    let (local, offset) = split_offset(&normalized);

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(local, fmt).ok())
        .ok_or_else(|| TimeParseError::Timestamp {
            value: value.to_string(),
        })?;

    let offset = parse_offset(offset).ok_or_else(|| TimeParseError::Offset {
        value: value.to_string(),
    })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| TimeParseError::Timestamp {
            value: value.to_string(),
        })
}

/// Splits `2025-03-26T17:30:00+02` into the local part and the offset
/// suffix (`+02`). The suffix is empty when there is no offset.
fn split_offset(value: &str) -> (&str, &str) {
    if let Some(local) = value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        return (local, "Z");
    }
    let Some(time_start) = value.find('T') else {
        return (value, "");
    };
    value[time_start..]
        .rfind(['+', '-'])
        .map_or((value, ""), |idx| value.split_at(time_start + idx))
}

/// Parses `Z`, `+HH`, `+HHMM` or `+HH:MM` (and the `-` forms).
fn parse_offset(suffix: &str) -> Option<FixedOffset> {
    if suffix.is_empty() || suffix == "Z" {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match suffix.split_at(1) {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Formats the span between two instants for display.
///
/// Uses the largest unit that fits: years (365 days), months (30 days),
/// days, then `Xh Ym` / `Xh` / `Ym`. Negative spans display as `0m`.
#[must_use]
pub fn format_duration<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> String {
    let total_minutes = (end.clone() - start.clone()).num_minutes().max(0);
    let hours = total_minutes / 60;
    let days = hours / 24;
    let months = days / 30;
    let years = days / 365;

    if years >= 1 {
        format!("{years} year{}", plural(years))
    } else if months >= 1 {
        format!("{months} month{}", plural(months))
    } else if days >= 1 {
        format!("{days} day{}", plural(days))
    } else if hours >= 1 {
        let minutes = total_minutes % 60;
        if minutes > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{hours}h")
        }
    } else {
        format!("{total_minutes}m")
    }
}

const fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// `HH:MM - HH:MM`, each in its own offset.
#[must_use]
pub fn format_time_range(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> String {
    format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"))
}

/// `Wed, 26/03 17:30 - 26/03 19:00`, each in its own offset.
#[must_use]
pub fn format_date_range(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> String {
    format!(
        "{} - {}",
        start.format("%a, %d/%m %H:%M"),
        end.format("%d/%m %H:%M")
    )
}

/// Days remaining until `start`, rounded up, or `ongoing` once started.
#[must_use]
pub fn days_to_event(start: &DateTime<FixedOffset>, now: &DateTime<Utc>) -> String {
    let millis = start.with_timezone(&Utc).signed_duration_since(*now).num_milliseconds();
    let day = 24 * 60 * 60 * 1000;
    let days = if millis > 0 {
        (millis + day - 1) / day
    } else {
        -((-millis) / day)
    };
    if days >= 0 {
        format!("{days} day{} left", plural(days))
    } else {
        "ongoing".to_string()
    }
}

/// The venue name without the street address (`Tampere-talo, ...`).
#[must_use]
pub fn short_venue(venue: &str) -> &str {
    venue.split(',').next().unwrap_or(venue).trim()
}

/// Display bucket for an event score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::AsRefStr)]
pub enum ScoreCategory {
    /// Score of 150 or more.
    Top,
    /// Score of 100 or more.
    High,
    /// Score of 70 or more.
    Medium,
    /// Anything lower.
    Low,
}

impl ScoreCategory {
    /// Buckets a raw event score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 150.0 {
            Self::Top
        } else if score >= 100.0 {
            Self::High
        } else if score >= 70.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}
