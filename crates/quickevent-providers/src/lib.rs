//! Google Calendar credential management and event creation.
//!
//! - [`google::CredentialManager`] loads, refreshes or interactively
//!   acquires an OAuth token and persists it
//! - [`google::GoogleProvider`] creates events on the primary calendar
//! - [`add_to_google_calendar`] is the one-call entry point;
//!   [`create_calendar_event`] takes an already-parsed request
//! - [`ProviderError`] is the error type for all of the above

pub mod error;
pub mod google;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};

use google::{GoogleConfig, GoogleProvider};
use quickevent_core::EventRequest;

/// Creates an event on the primary calendar and returns its browser link.
///
/// `duration_minutes` defaults to 30. The start time is parsed before any
/// file or network access, so malformed input fails fast with
/// [`ProviderErrorCode::BadRequest`].
pub async fn add_to_google_calendar(
    config: &GoogleConfig,
    title: &str,
    start_time_iso: &str,
    duration_minutes: Option<u32>,
) -> ProviderResult<String> {
    let request = EventRequest::parse(title, start_time_iso, duration_minutes)?;
    create_calendar_event(config, &request).await
}

/// Creates an already-parsed event and returns its browser link.
pub async fn create_calendar_event(
    config: &GoogleConfig,
    request: &EventRequest,
) -> ProviderResult<String> {
    let mut provider = GoogleProvider::new(config.clone())?;
    provider.create_event_link(request).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::google::{GoogleEndpoints, OAuthCredentials, TokenInfo};

    #[tokio::test]
    async fn one_call_entry_point() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/calendars/primary/events")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"end":{"dateTime":"2025-06-01T18:30:00"}}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"id":"e","htmlLink":"https://calendar.google.com/event?eid=e"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let tokens = TokenInfo::new(
            "t",
            None,
            Some(3600),
            vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
        )
        .with_client(&OAuthCredentials::new(
            "id.apps.googleusercontent.com",
            "s",
        ));
        std::fs::write(&token_path, serde_json::to_string(&tokens).unwrap()).unwrap();

        let config = GoogleConfig::new()
            .with_token_path(&token_path)
            .with_timeout(Duration::from_secs(5))
            .with_endpoints(GoogleEndpoints {
                api_base: server.url(),
                ..GoogleEndpoints::default()
            });

        let link = add_to_google_calendar(&config, "Gym", "2025-06-01T18:00:00", None)
            .await
            .unwrap();
        assert_eq!(link, "https://calendar.google.com/event?eid=e");
    }

    #[tokio::test]
    async fn parsed_request_is_sent_as_is() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calendars/primary/events")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"summary":"Stand-up","start":{"dateTime":"2025-06-01T09:00:00+02:00"},"end":{"dateTime":"2025-06-01T09:00:00+02:00"}}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"id":"p","htmlLink":"https://calendar.google.com/event?eid=p"}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let tokens = TokenInfo::new(
            "t",
            None,
            Some(3600),
            vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
        )
        .with_client(&OAuthCredentials::new(
            "id.apps.googleusercontent.com",
            "s",
        ));
        std::fs::write(&token_path, serde_json::to_string(&tokens).unwrap()).unwrap();

        let config = GoogleConfig::new()
            .with_token_path(&token_path)
            .with_timeout(Duration::from_secs(5))
            .with_endpoints(GoogleEndpoints {
                api_base: server.url(),
                ..GoogleEndpoints::default()
            });

        let request = EventRequest::parse("Stand-up", "2025-06-01T09:00+02:00", Some(0)).unwrap();
        let link = create_calendar_event(&config, &request).await.unwrap();
        assert_eq!(link, "https://calendar.google.com/event?eid=p");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn bad_start_fails_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let config = GoogleConfig::new()
            .with_token_path(dir.path().join("token.json"))
            .with_credentials_path(dir.path().join("missing.json"));

        let err = add_to_google_calendar(&config, "Gym", "2025-13-45", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::BadRequest);
    }
}
