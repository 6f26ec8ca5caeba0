//! Client error types.

use std::fmt;

use quickevent_core::EventParseError;
use quickevent_providers::{ProviderError, ProviderErrorCode};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Invalid command-line input.
    Input(String),
    /// Authentication required or rejected.
    AuthRequired(String),
    /// Provider error.
    Provider(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Input(msg) => write!(f, "invalid input: {}", msg),
            Self::AuthRequired(msg) => write!(f, "authentication required: {}", msg),
            Self::Provider(msg) => write!(f, "provider error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        match err.code() {
            ProviderErrorCode::ConfigurationError => Self::Config(err.message().to_string()),
            ProviderErrorCode::AuthenticationFailed => {
                Self::AuthRequired(err.message().to_string())
            }
            _ => Self::Provider(err.to_string()),
        }
    }
}

impl From<EventParseError> for ClientError {
    fn from(err: EventParseError) -> Self {
        match err {
            EventParseError::InvalidTimezone { .. } => Self::Config(err.to_string()),
            _ => Self::Input(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_are_classified() {
        let err: ClientError = ProviderError::configuration("no secrets").into();
        assert_eq!(err.to_string(), "configuration error: no secrets");

        let err: ClientError = ProviderError::authentication("token revoked").into();
        assert_eq!(err.to_string(), "authentication required: token revoked");

        let err: ClientError = EventParseError::InvalidStart("soon".to_string()).into();
        assert!(matches!(err, ClientError::Input(_)));

        let err: ClientError = ProviderError::bad_request("event rejected: bad tz").into();
        assert_eq!(err.to_string(), "provider error: bad_request: event rejected: bad tz");

        let err: ClientError = ProviderError::rate_limited("slow down").into();
        assert_eq!(err.to_string(), "provider error: rate_limited: slow down");
    }
}
