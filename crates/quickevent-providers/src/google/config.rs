//! Google Calendar configuration and client-secrets loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use quickevent_core::{DEFAULT_TIMEZONE, validate_timezone};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 client credentials issued by Google Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level (e.g., from gcloud)
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads client secrets from the JSON file downloaded from Google Cloud Console.
    ///
    /// A missing file is a configuration error; nothing touches the network
    /// before this succeeds.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProviderError::configuration(format!(
                "client secrets file not found at {}; download it from the Google Cloud Console",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read client secrets file {}",
                path.display()
            ))
            .with_source(e)
        })?;

        debug!("loaded client secrets from {:?}", path);
        Self::from_json(&content)
    }

    /// Parses client secrets from a JSON string.
    ///
    /// Accepts `{"installed": {...}}`, `{"web": {...}}` or a flat
    /// `{"client_id": ..., "client_secret": ...}` object.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse client secrets JSON: {}", e))
        })?;

        let credentials = if let Some(creds) = file.installed.or(file.web) {
            Self::new(creds.client_id, creds.client_secret)
        } else if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret)
        {
            Self::new(client_id, client_secret)
        } else {
            return Err(ProviderError::configuration(
                "client secrets must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level",
            ));
        };

        credentials.validate().map_err(ProviderError::configuration)?;
        Ok(credentials)
    }

    /// Validates that the credentials look like Google-issued ones.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Remote endpoints used by the provider.
///
/// Only tests point these anywhere other than Google.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleEndpoints {
    /// OAuth consent page.
    pub auth_url: String,
    /// OAuth token endpoint, used for code exchange and refresh.
    pub token_url: String,
    /// Calendar API v3 base URL.
    pub api_base: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            api_base: "https://www.googleapis.com/calendar/v3".to_string(),
        }
    }
}

/// Configuration for the Google Calendar provider.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Path to the client-secrets JSON file.
    ///
    /// Only read when a new interactive authorization is needed.
    pub credentials_path: PathBuf,

    /// Path of the persisted token file.
    pub token_path: PathBuf,

    /// OAuth scopes to request. Defaults to event access only.
    pub scopes: Vec<String>,

    /// IANA timezone label attached to created events.
    pub timezone: String,

    /// Request timeout for token and API calls.
    pub timeout: Duration,

    /// User agent string for HTTP requests.
    pub user_agent: String,

    /// Port range for the loopback OAuth listener.
    ///
    /// `(0, 0)` lets the OS pick a free port.
    pub loopback_port_range: (u16, u16),

    /// How long to wait for the browser redirect.
    pub callback_timeout: Duration,

    /// Whether an interactive browser flow may be started.
    ///
    /// When false, a missing or unrefreshable token is an authentication
    /// error instead.
    pub interactive: bool,

    /// Remote endpoints.
    pub endpoints: GoogleEndpoints,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default callback wait in seconds.
    pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;

    /// Scope allowing event creation on the user's calendars.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.events";

    /// The calendar events are created on.
    pub const CALENDAR_ID: &'static str = "primary";

    /// Creates a configuration with default paths and settings.
    pub fn new() -> Self {
        Self {
            credentials_path: Self::default_credentials_path(),
            token_path: Self::default_token_path(),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            timezone: DEFAULT_TIMEZONE.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("quickevent/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (0, 0),
            callback_timeout: Duration::from_secs(Self::DEFAULT_CALLBACK_TIMEOUT_SECS),
            interactive: true,
            endpoints: GoogleEndpoints::default(),
        }
    }

    /// Returns the default client-secrets path.
    pub fn default_credentials_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickevent")
            .join("credentials.json")
    }

    /// Returns the default token storage path.
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickevent")
            .join("google-token.json")
    }

    /// Sets the client-secrets path.
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the event timezone label.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the loopback port range for OAuth.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Sets how long the loopback listener waits for the browser redirect.
    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Enables or disables the interactive browser flow.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Overrides the remote endpoints.
    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProviderResult<()> {
        validate_timezone(&self.timezone)?;

        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(ProviderError::configuration("invalid loopback port range"));
        }

        Ok(())
    }
}
