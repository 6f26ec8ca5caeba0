//! Obtaining a usable OAuth credential.
//!
//! [`CredentialManager::credential`] resolves a token in this order:
//!
//! 1. A stored token that is unexpired and covers the configured scopes is
//!    returned as is, without touching the network.
//! 2. An expired token with a refresh token is refreshed once, persisted
//!    and returned.
//! 3. Otherwise the interactive browser flow runs (unless disabled) and
//!    the new token is persisted.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::config::{GoogleConfig, OAuthCredentials};
use super::oauth::OAuthClient;
use super::tokens::{TokenInfo, TokenStorage};

/// Loads, refreshes and acquires OAuth tokens for the calendar API.
#[derive(Debug)]
pub struct CredentialManager {
    config: GoogleConfig,
    storage: TokenStorage,
    loaded: bool,
}

impl CredentialManager {
    /// Creates a manager over the token file named in `config`.
    ///
    /// Nothing is read until a credential is requested.
    pub fn new(config: GoogleConfig) -> Self {
        let storage = TokenStorage::new(&config.token_path);
        Self {
            config,
            storage,
            loaded: false,
        }
    }

    /// Returns the token file path.
    pub fn token_path(&self) -> &Path {
        self.storage.path()
    }

    /// Returns a token valid for the configured scopes.
    ///
    /// # Errors
    ///
    /// - configuration error if the token file is malformed, or if a new
    ///   authorization is needed and the client-secrets file is missing
    /// - authentication error if a refresh or authorization is rejected,
    ///   or if authorization is needed but interactive mode is off
    /// - network error if the token endpoint cannot be reached
    pub async fn credential(&mut self) -> ProviderResult<TokenInfo> {
        self.ensure_loaded()?;

        let scopes = &self.config.scopes;
        let stored = self.storage.get().cloned();

        if let Some(tokens) = stored {
            if tokens.is_valid_for(scopes) {
                debug!("using stored access token");
                return Ok(tokens);
            }

            if tokens.is_refreshable_for(scopes) {
                return self.refresh(&tokens).await;
            }

            debug!("stored token is unusable for the configured scopes");
        }

        if !self.config.interactive {
            return Err(ProviderError::authentication(format!(
                "no usable token at {}; run `quickevent auth` to authorize",
                self.storage.path().display()
            )));
        }

        self.authorize().await
    }

    /// Runs the interactive browser flow regardless of any stored token.
    pub async fn authorize(&mut self) -> ProviderResult<TokenInfo> {
        let credentials = OAuthCredentials::from_file(&self.config.credentials_path)?;
        let oauth = self.oauth_client(credentials)?;

        let tokens = oauth
            .authorize(
                &self.config.scopes,
                self.config.loopback_port_range,
                self.config.callback_timeout,
            )
            .await?;

        self.storage.set(tokens.clone())?;
        self.loaded = true;
        info!("authorization complete, token saved to {:?}", self.storage.path());
        Ok(tokens)
    }

    /// Removes the stored token.
    pub fn clear(&mut self) -> ProviderResult<()> {
        self.storage.clear()?;
        self.loaded = true;
        Ok(())
    }

    /// Returns true if a credential can be obtained without user interaction.
    pub fn is_authenticated(&mut self) -> ProviderResult<bool> {
        self.ensure_loaded()?;
        let scopes = &self.config.scopes;
        Ok(self
            .storage
            .get()
            .is_some_and(|t| t.is_valid_for(scopes) || t.is_refreshable_for(scopes)))
    }

    fn ensure_loaded(&mut self) -> ProviderResult<()> {
        if !self.loaded {
            self.storage.load()?;
            self.loaded = true;
        }
        Ok(())
    }

    async fn refresh(&mut self, tokens: &TokenInfo) -> ProviderResult<TokenInfo> {
        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .ok_or_else(|| ProviderError::internal("refresh requested without a refresh token"))?;

        // Tokens written before the client was recorded fall back to the
        // secrets file.
        let credentials = match tokens.client() {
            Some(credentials) => credentials,
            None => OAuthCredentials::from_file(&self.config.credentials_path)?,
        };

        info!("access token expired, refreshing");
        let refreshed = self
            .oauth_client(credentials)?
            .refresh_token(refresh_token)
            .await?;

        self.storage.update_access_token(
            refreshed.access_token,
            refreshed.expires_in,
            refreshed.refresh_token,
        )?;

        self.storage
            .get()
            .cloned()
            .ok_or_else(|| ProviderError::internal("token vanished after refresh"))
    }

    fn oauth_client(&self, credentials: OAuthCredentials) -> ProviderResult<OAuthClient> {
        OAuthClient::new(
            credentials,
            self.config.endpoints.clone(),
            self.config.timeout,
            &self.config.user_agent,
        )
    }
}
