//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/quickevent/config.toml` by default. Every key is optional:
//!
//! ```toml
//! [google]
//! credentials_file = "~/.config/quickevent/credentials.json"
//! token_path = "~/.local/share/quickevent/google-token.json"
//! timezone = "Asia/Kolkata"
//! default_duration_minutes = 30
//! interactive = true
//! timeout_secs = 30
//! loopback_port_range = [8400, 8410]
//! callback_timeout_secs = 300
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use quickevent_core::DEFAULT_DURATION_MINUTES;
use quickevent_providers::google::GoogleConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the quickevent client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Calendar settings.
    pub google: GoogleSettings,
}

/// Google Calendar settings (`[google]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Client-secrets JSON downloaded from Google Cloud Console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    /// Where the OAuth token is persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,

    /// IANA timezone label attached to events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Duration used when `add` gets no `--duration`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_duration_minutes: Option<u32>,

    /// Whether the browser flow may start on its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive: Option<bool>,

    /// HTTP timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Inclusive `[start, end]` ports tried for the OAuth redirect listener.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loopback_port_range: Option<(u16, u16)>,

    /// How long the browser flow waits for the redirect, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickevent")
            .join("config.toml")
    }
}

impl GoogleSettings {
    /// Returns the configured default duration, or 30 minutes.
    pub fn default_duration(&self) -> u32 {
        self.default_duration_minutes
            .unwrap_or(DEFAULT_DURATION_MINUTES)
    }

    /// Builds the provider configuration, applying only the keys that are set.
    pub fn to_provider_config(&self) -> GoogleConfig {
        let mut config = GoogleConfig::new();

        if let Some(ref path) = self.credentials_file {
            config = config.with_credentials_path(expand_tilde(path));
        }
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(expand_tilde(path));
        }
        if let Some(ref timezone) = self.timezone {
            config = config.with_timezone(timezone);
        }
        if let Some(interactive) = self.interactive {
            config = config.with_interactive(interactive);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some((start, end)) = self.loopback_port_range {
            config = config.with_loopback_port_range(start, end);
        }
        if let Some(secs) = self.callback_timeout_secs {
            config = config.with_callback_timeout(Duration::from_secs(secs));
        }

        config
    }
}

/// Replaces a leading `~/` with the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
