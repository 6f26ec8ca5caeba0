//! The event request handed to a calendar backend.
//!
//! An [`EventRequest`] is built per call from a title, a start time and a
//! duration; the end time is always derived, never supplied.

use crate::error::EventParseError;
use crate::time::EventStart;

/// Duration used when the caller does not give one.
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Timezone label attached to events unless configured otherwise.
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

/// A single event to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRequest {
    /// Event summary shown in the calendar.
    pub title: String,
    /// When the event starts.
    pub start: EventStart,
    /// Length of the event in minutes. Zero yields a point-in-time event.
    pub duration_minutes: u32,
}

impl EventRequest {
    /// Creates a request with the default duration.
    pub fn new(title: impl Into<String>, start: EventStart) -> Self {
        Self {
            title: title.into(),
            start,
            duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }

    /// Builds a request from raw user input.
    ///
    /// `duration_minutes` falls back to [`DEFAULT_DURATION_MINUTES`]. The end
    /// time is computed eagerly so an overflowing duration is rejected here
    /// rather than at submission.
    pub fn parse(
        title: impl Into<String>,
        start_iso: &str,
        duration_minutes: Option<u32>,
    ) -> Result<Self, EventParseError> {
        let start = EventStart::parse(start_iso)?;
        let request = Self::new(title, start)
            .with_duration(duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES));
        request.end()?;
        Ok(request)
    }

    /// Sets the duration in minutes.
    #[must_use]
    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    /// Returns the end time: start plus duration.
    pub fn end(&self) -> Result<EventStart, EventParseError> {
        self.start.plus_minutes(self.duration_minutes)
    }
}
