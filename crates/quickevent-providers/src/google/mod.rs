//! Google Calendar integration.
//!
//! # Authentication Flow
//!
//! 1. The user downloads an OAuth client-secrets file from Google Cloud Console
//! 2. A local HTTP server is started on a loopback port
//! 3. The browser opens Google's consent page with a PKCE challenge
//! 4. Google redirects to the loopback server with an authorization code
//! 5. The code is exchanged for access and refresh tokens
//! 6. Tokens are persisted and refreshed on later runs
//!
//! # Example
//!
//! ```ignore
//! use quickevent_providers::google::{GoogleConfig, GoogleProvider};
//!
//! let mut provider = GoogleProvider::new(GoogleConfig::new())?;
//! let link = provider.add_event("Standup", "2025-01-15T10:00:00", None).await?;
//! println!("{link}");
//! ```

mod client;
mod config;
mod credentials;
mod oauth;
mod provider;
mod tokens;

pub use client::{CreatedEvent, EventBody, EventDateTime, GoogleCalendarClient, Reminders};
pub use config::{GoogleConfig, GoogleEndpoints, OAuthCredentials};
pub use credentials::CredentialManager;
pub use oauth::{OAuthClient, PkceFlow, RefreshedToken};
pub use provider::GoogleProvider;
pub use tokens::{TokenInfo, TokenStorage};
