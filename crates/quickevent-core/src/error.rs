//! Errors raised while building an event request from user input.

use thiserror::Error;

/// An event request could not be built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    /// The start time is not a recognised ISO-8601 value.
    #[error("invalid start time '{0}': expected ISO-8601, e.g. 2025-03-01T10:00:00")]
    InvalidStart(String),

    /// Adding the duration moved the end past the representable range.
    #[error("duration of {0} minutes overflows the end time")]
    DurationOverflow(u32),

    /// The timezone label is not a known IANA name.
    #[error("invalid timezone '{label}': {reason}")]
    InvalidTimezone {
        /// The rejected label.
        label: String,
        /// Why it was rejected.
        reason: String,
    },
}
