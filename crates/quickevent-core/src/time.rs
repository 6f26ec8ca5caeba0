//! Start-time parsing for event requests.
//!
//! [`EventStart`] accepts the ISO-8601 shapes people actually type:
//! offset-qualified instants (`2025-03-01T10:00:00+05:30`, `...Z`) and
//! naive wall-clock times (`2025-03-01T10:00`, `2025-03-01 10:00:00`,
//! `2025-03-01`). Naive times are left floating and get pinned to the
//! event's timezone label by the calendar service.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

use crate::error::EventParseError;

/// Offset-qualified layouts tried after RFC 3339 fails.
///
/// Covers minute precision and offsets written without a colon.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%d %H:%M%z",
];

/// Naive layouts tried in order after the offset layouts fail.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// When an event starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStart {
    /// An instant with an explicit UTC offset.
    Offset(DateTime<FixedOffset>),
    /// A wall-clock time without offset.
    Floating(NaiveDateTime),
}

impl EventStart {
    /// Parses an ISO-8601 start time.
    pub fn parse(input: &str) -> Result<Self, EventParseError> {
        let trimmed = input.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self::Offset(dt));
        }

        // `Z` is UTC; the strftime layouts only understand numeric offsets.
        let zulu;
        let with_offset = match trimmed.strip_suffix(['Z', 'z']) {
            Some(rest) => {
                zulu = format!("{}+00:00", rest);
                zulu.as_str()
            }
            None => trimmed,
        };

        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(with_offset, format) {
                return Ok(Self::Offset(dt));
            }
        }

        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Self::Floating(dt));
            }
        }

        // A bare date means midnight.
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            && let Some(dt) = date.and_hms_opt(0, 0, 0)
        {
            return Ok(Self::Floating(dt));
        }

        Err(EventParseError::InvalidStart(input.to_string()))
    }

    /// Returns this start shifted forward by `minutes`.
    pub fn plus_minutes(&self, minutes: u32) -> Result<Self, EventParseError> {
        let delta = Duration::minutes(i64::from(minutes));
        let shifted = match self {
            Self::Offset(dt) => dt.checked_add_signed(delta).map(Self::Offset),
            Self::Floating(dt) => dt.checked_add_signed(delta).map(Self::Floating),
        };
        shifted.ok_or(EventParseError::DurationOverflow(minutes))
    }

    /// Returns true if the time carries no UTC offset.
    pub fn is_floating(&self) -> bool {
        matches!(self, Self::Floating(_))
    }

    /// Renders the time as ISO-8601 with seconds precision.
    ///
    /// The offset is kept when the input had one (`+00:00` for `Z`).
    pub fn to_iso_string(&self) -> String {
        match self {
            Self::Offset(dt) => dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
            Self::Floating(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

impl FromStr for EventStart {
    type Err = EventParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EventStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

/// Checks that `label` is an IANA timezone name the calendar will accept.
pub fn validate_timezone(label: &str) -> Result<Tz, EventParseError> {
    label
        .parse::<Tz>()
        .map_err(|e| EventParseError::InvalidTimezone {
            label: label.to_string(),
            reason: e.to_string(),
        })
}
