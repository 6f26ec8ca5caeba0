//! Core types: event requests, start-time parsing, tracing setup

pub mod error;
pub mod event;
pub mod time;
pub mod tracing;

pub use error::EventParseError;
pub use event::{DEFAULT_DURATION_MINUTES, DEFAULT_TIMEZONE, EventRequest};
pub use time::{EventStart, validate_timezone};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
