//! OAuth token persistence.
//!
//! The token file is JSON and holds everything needed to refresh without
//! the client-secrets file: access token, refresh token, expiry, granted
//! scopes and the issuing client id/secret.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;

/// Seconds shaved off the reported lifetime so a token is refreshed before
/// Google starts rejecting it.
const EXPIRY_SKEW_SECS: i64 = 60;

/// An OAuth token set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    pub scopes: Vec<String>,

    /// When the tokens were last obtained or refreshed.
    pub last_refresh: DateTime<Utc>,

    /// Client id that issued the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Client secret that issued the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl TokenInfo {
    /// Creates a new token info from OAuth response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
            last_refresh: Utc::now(),
            client_id: None,
            client_secret: None,
        }
    }

    /// Records the client that issued this token.
    #[must_use]
    pub fn with_client(mut self, credentials: &OAuthCredentials) -> Self {
        self.client_id = Some(credentials.client_id.clone());
        self.client_secret = Some(credentials.client_secret.clone());
        self
    }

    /// Returns the issuing client, if it was recorded.
    pub fn client(&self) -> Option<OAuthCredentials> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some(OAuthCredentials::new(id, secret)),
            _ => None,
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            // No expiry means the token does not expire.
            None => false,
        }
    }

    /// Returns true if the token has the required scopes.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Returns true if the token can be used right now without any network call.
    pub fn is_valid_for(&self, required: &[String]) -> bool {
        self.has_scopes(required) && !self.is_expired()
    }

    /// Returns true if the token can be brought back to life by a refresh.
    pub fn is_refreshable_for(&self, required: &[String]) -> bool {
        self.has_scopes(required) && self.is_expired() && self.refresh_token.is_some()
    }

    /// Updates the access token after a refresh.
    ///
    /// Google may rotate the refresh token; a new one replaces the old.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(expiry_from_now);
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.last_refresh = Utc::now();
    }
}

fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_SKEW_SECS)
}

/// Writes `content` to a file readable only by the owner.
///
/// The mode is set at creation and enforced again in case a stale file
/// with wider permissions was already there.
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(content)?;
    file.sync_all()
}

/// File-backed token storage with an in-memory copy.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: Option<TokenInfo>,
}

impl TokenStorage {
    /// Creates a new token storage at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: None,
        }
    }

    /// Loads tokens from disk into memory.
    ///
    /// Returns Ok(true) if tokens were loaded, Ok(false) if no token file
    /// exists. A file that exists but does not parse is an error.
    pub fn load(&mut self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read token file {}",
                self.path.display()
            ))
            .with_source(e)
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse token file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        info!("loaded tokens from {:?}", self.path);
        self.tokens = Some(tokens);
        Ok(true)
    }

    /// Writes the current tokens to disk.
    ///
    /// Writes a sibling temp file and renames it over the token file.
    pub fn save(&self) -> ProviderResult<()> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or_else(|| ProviderError::internal("no tokens to save"))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration("failed to create token directory").with_source(e)
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        write_private(&temp_path, content.as_bytes()).map_err(|e| {
            ProviderError::configuration("failed to write token file").with_source(e)
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration("failed to rename token file").with_source(e)
        })?;

        debug!("saved tokens to {:?}", self.path);
        Ok(())
    }

    /// Returns the current tokens, if any.
    pub fn get(&self) -> Option<&TokenInfo> {
        self.tokens.as_ref()
    }

    /// Replaces the tokens and saves them to disk.
    pub fn set(&mut self, tokens: TokenInfo) -> ProviderResult<()> {
        self.tokens = Some(tokens);
        self.save()
    }

    /// Applies a refresh result and saves to disk.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) -> ProviderResult<()> {
        match self.tokens.as_mut() {
            Some(tokens) => {
                tokens.update_access_token(access_token, expires_in_secs, refresh_token);
                self.save()
            }
            None => Err(ProviderError::internal("no tokens to update")),
        }
    }

    /// Clears the stored tokens (both in memory and on disk).
    pub fn clear(&mut self) -> ProviderResult<()> {
        self.tokens = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration("failed to remove token file").with_source(e)
            })?;
            info!("cleared tokens from {:?}", self.path);
        }
        Ok(())
    }

    /// Returns the token storage path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(s: &str) -> Vec<String> {
        vec![s.to_string()]
    }

    #[test]
    fn token_info_creation() {
        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            scope("calendar.events"),
        );

        assert_eq!(token.access_token, "access-token");
        assert_eq!(token.refresh_token, Some("refresh-token".to_string()));
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());
        assert!(token.client().is_none());
    }

    #[test]
    fn token_info_expired() {
        let mut token = TokenInfo::new("access", None, Some(3600), vec![]);
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired());
    }

    #[test]
    fn short_lifetime_counts_as_expired() {
        // Inside the skew window.
        let token = TokenInfo::new("access", None, Some(30), vec![]);
        assert!(token.is_expired());
    }

    #[test]
    fn validity_and_refreshability() {
        let required = scope("calendar.events");

        let fresh = TokenInfo::new("a", None, Some(3600), required.clone());
        assert!(fresh.is_valid_for(&required));
        assert!(!fresh.is_refreshable_for(&required));

        let mut stale = TokenInfo::new("a", Some("r".to_string()), Some(3600), required.clone());
        stale.expires_at = Some(Utc::now() - Duration::minutes(5));
        assert!(!stale.is_valid_for(&required));
        assert!(stale.is_refreshable_for(&required));

        stale.refresh_token = None;
        assert!(!stale.is_refreshable_for(&required));

        let wrong_scope = TokenInfo::new("a", Some("r".to_string()), None, scope("calendar.readonly"));
        assert!(!wrong_scope.is_valid_for(&required));
        assert!(!wrong_scope.is_refreshable_for(&required));
    }

    #[test]
    fn refresh_keeps_refresh_token_unless_rotated() {
        let mut token = TokenInfo::new("old", Some("r1".to_string()), Some(10), vec![]);
        token.update_access_token("new", Some(3600), None);
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("r1"));
        assert!(!token.is_expired());

        token.update_access_token("newer", Some(3600), Some("r2".to_string()));
        assert_eq!(token.refresh_token.as_deref(), Some("r2"));
    }

    #[test]
    fn client_round_trips_through_token() {
        let creds = OAuthCredentials::new("id.apps.googleusercontent.com", "secret");
        let token = TokenInfo::new("a", None, None, vec![]).with_client(&creds);
        assert_eq!(token.client(), Some(creds));
    }

    #[test]
    fn token_storage_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");
        let mut storage = TokenStorage::new(&path);

        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            scope("calendar.events"),
        );

        storage.set(token).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let mut reloaded = TokenStorage::new(&path);
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.get().unwrap().access_token, "access-token");
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let mut storage = TokenStorage::new(&path);
        storage.set(TokenInfo::new("a", None, None, vec![])).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn stale_temp_file_does_not_widen_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, "leftover").unwrap();
        fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o644)).unwrap();

        let mut storage = TokenStorage::new(&path);
        storage
            .set(TokenInfo::new("a", Some("secret-refresh".into()), None, vec![]))
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!temp_path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_directory_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();

        // Privileged users bypass directory permissions.
        if fs::write(locked.join("canary"), "x").is_ok() {
            return;
        }

        let mut storage = TokenStorage::new(locked.join("token.json"));
        let err = storage
            .set(TokenInfo::new("a", None, None, vec![]))
            .unwrap_err();
        assert!(err.is_configuration());

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();
    }

    #[test]
    fn token_storage_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let mut storage = TokenStorage::new(&path);
        storage
            .set(TokenInfo::new("old", Some("r".to_string()), Some(3600), vec![]))
            .unwrap();

        storage.update_access_token("new", Some(3600), None).unwrap();

        let mut reloaded = TokenStorage::new(&path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.get().unwrap().access_token, "new");
    }

    #[test]
    fn token_storage_update_without_tokens_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = TokenStorage::new(dir.path().join("token.json"));
        assert!(storage.update_access_token("x", None, None).is_err());
    }

    #[test]
    fn token_storage_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let mut storage = TokenStorage::new(&path);

        storage.set(TokenInfo::new("access", None, None, vec![])).unwrap();
        assert!(path.exists());

        storage.clear().unwrap();
        assert!(!path.exists());
        assert!(storage.get().is_none());
    }

    #[test]
    fn token_storage_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = TokenStorage::new(dir.path().join("token.json"));
        assert!(!storage.load().unwrap());
        assert!(storage.get().is_none());
    }

    #[test]
    fn malformed_token_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{ not json").unwrap();

        let mut storage = TokenStorage::new(&path);
        let err = storage.load().unwrap_err();
        assert!(err.is_configuration());
    }
}
