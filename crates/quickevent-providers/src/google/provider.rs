//! Google Calendar provider: credentials plus event creation.

use std::path::Path;

use quickevent_core::EventRequest;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::client::{CreatedEvent, EventBody, GoogleCalendarClient};
use super::config::GoogleConfig;
use super::credentials::CredentialManager;

/// Creates events on the user's primary Google calendar.
///
/// Owns a [`CredentialManager`]; each call obtains a credential first,
/// which may refresh the stored token or open the browser.
#[derive(Debug)]
pub struct GoogleProvider {
    config: GoogleConfig,
    credentials: CredentialManager,
}

impl GoogleProvider {
    /// Creates a provider after validating the configuration.
    ///
    /// No files are read and no network calls are made here.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate()?;
        let credentials = CredentialManager::new(config.clone());
        Ok(Self {
            config,
            credentials,
        })
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Returns the token file path.
    pub fn token_path(&self) -> &Path {
        self.credentials.token_path()
    }

    /// Creates `request` on the primary calendar.
    ///
    /// The request body is built before any credential work, so invalid
    /// input never triggers a refresh or browser flow.
    pub async fn create_event(&mut self, request: &EventRequest) -> ProviderResult<CreatedEvent> {
        let body = EventBody::from_request(request, &self.config.timezone)?;

        let tokens = self.credentials.credential().await?;
        let client = GoogleCalendarClient::new(
            tokens.access_token,
            &self.config.endpoints.api_base,
            self.config.timeout,
            &self.config.user_agent,
        )?;

        debug!(
            "creating event {:?} at {} for {} minutes",
            request.title, request.start, request.duration_minutes
        );
        let created = client
            .insert_event(GoogleConfig::CALENDAR_ID, &body)
            .await?;

        info!(event_id = %created.id, "event created");
        Ok(created)
    }

    /// Parses raw input, creates the event and returns its browser link.
    pub async fn add_event(
        &mut self,
        title: &str,
        start_time_iso: &str,
        duration_minutes: Option<u32>,
    ) -> ProviderResult<String> {
        let request = EventRequest::parse(title, start_time_iso, duration_minutes)?;
        self.create_event_link(&request).await
    }

    /// Creates `request` and returns the browser link of the new event.
    ///
    /// A response without `htmlLink` is an invalid response.
    pub async fn create_event_link(&mut self, request: &EventRequest) -> ProviderResult<String> {
        let created = self.create_event(request).await?;

        let link = created.html_link.ok_or_else(|| {
            ProviderError::invalid_response(format!(
                "created event {} has no htmlLink",
                created.id
            ))
        })?;

        info!("event created: {}", link);
        Ok(link)
    }

    /// Makes sure a usable credential is stored.
    ///
    /// With `force`, the browser flow runs even if a token already works.
    pub async fn authenticate(&mut self, force: bool) -> ProviderResult<()> {
        if force {
            self.credentials.authorize().await?;
        } else {
            self.credentials.credential().await?;
        }
        Ok(())
    }

    /// Returns true if events can be created without user interaction.
    pub fn is_authenticated(&mut self) -> ProviderResult<bool> {
        self.credentials.is_authenticated()
    }

    /// Deletes the stored token.
    pub fn logout(&mut self) -> ProviderResult<()> {
        self.credentials.clear()
    }
}
