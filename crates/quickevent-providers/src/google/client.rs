//! Google Calendar API client.
//!
//! A thin HTTP wrapper around `events.insert`: it builds the request body,
//! sends it with bearer auth and maps the response status onto
//! [`ProviderError`] codes.

use std::time::Duration;

use quickevent_core::EventRequest;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    api_base: String,
}

impl GoogleCalendarClient {
    /// Creates a client authorized with `access_token`.
    pub fn new(
        access_token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
            api_base: api_base.into(),
        })
    }

    /// Inserts an event into a calendar.
    ///
    /// Every call creates a new event; nothing is deduplicated.
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        body: &EventBody,
    ) -> ProviderResult<CreatedEvent> {
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base.trim_end_matches('/'),
            urlencoding::encode(calendar_id)
        );

        debug!("POST {}", url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            )));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::authentication(
                "access token expired or invalid",
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::authorization(format!(
                "access denied to calendar {}: {}",
                calendar_id,
                api_error_message(&body)
            )));
        }

        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(ProviderError::bad_request(format!(
                "event rejected: {}",
                api_error_message(&body)
            )));
        }

        if !status.is_success() {
            return Err(ProviderError::server(format!(
                "API error ({}): {}",
                status,
                api_error_message(&body)
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }
}

/// Pulls `error.message` out of a Google error body, or returns the body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Request body for `events.insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventBody {
    pub summary: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub reminders: Reminders,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
}

impl EventBody {
    /// Builds the body for `request`, labelling both ends with `timezone`.
    ///
    /// A start with an explicit offset keeps it; Google then uses the
    /// offset for the instant and the label only for display.
    pub fn from_request(request: &EventRequest, timezone: &str) -> ProviderResult<Self> {
        let end = request.end()?;
        Ok(Self {
            summary: request.title.clone(),
            start: EventDateTime {
                date_time: request.start.to_iso_string(),
                time_zone: timezone.to_string(),
            },
            end: EventDateTime {
                date_time: end.to_iso_string(),
                time_zone: timezone.to_string(),
            },
            reminders: Reminders { use_default: true },
        })
    }
}

/// The parts of the created event resource we use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    /// Event identifier assigned by Google.
    pub id: String,
    /// Browser link to the event.
    #[serde(default)]
    pub html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
