//! Authentication commands.

use std::path::{Path, PathBuf};

use quickevent_providers::google::{GoogleProvider, OAuthCredentials};
use tracing::{info, warn};

use crate::config::{ClientConfig, expand_tilde};
use crate::error::{ClientError, ClientResult};

/// Runs the Google authorization flow.
///
/// A `--credentials-file` overrides the configured client-secrets path and,
/// once authorization succeeds, is written to `config_path` so later runs
/// find it.
pub async fn google(
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    // The explicit auth command may always open the browser.
    let mut provider_config = config.google.to_provider_config().with_interactive(true);

    let credentials_file = credentials_file.map(|p| expand_tilde(&p));
    if let Some(ref path) = credentials_file {
        // Fail on a bad file before any browser work.
        OAuthCredentials::from_file(path)?;
        provider_config = provider_config.with_credentials_path(path);
    }

    let mut provider = GoogleProvider::new(provider_config)?;

    if !force && provider.is_authenticated()? {
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authentication...");
    provider.authenticate(force).await?;

    if let Some(ref path) = credentials_file
        && let Err(e) = save_credentials_file_to_config(config_path, path)
    {
        warn!("could not record credentials file in config: {}", e);
    }

    info!("Google authentication successful");
    println!();
    println!("Authentication successful!");
    println!("Token saved to {}", provider.token_path().display());

    Ok(())
}

/// Removes the stored token.
pub fn logout(config: &ClientConfig) -> ClientResult<()> {
    let mut provider = GoogleProvider::new(config.google.to_provider_config())?;
    let token_path = provider.token_path().to_path_buf();

    if !token_path.exists() {
        println!("No stored token at {}", token_path.display());
        return Ok(());
    }

    provider.logout()?;
    println!("Removed token at {}", token_path.display());
    Ok(())
}

/// Writes `credentials_file` under `[google]` in `config.toml`.
///
/// Comments and unrelated keys in an existing file are preserved.
fn save_credentials_file_to_config(config_path: &Path, credentials_file: &Path) -> ClientResult<()> {
    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| ClientError::Config(format!("could not parse {}: {}", config_path.display(), e)))?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    let google = doc["google"]
        .as_table_mut()
        .ok_or_else(|| ClientError::Config("[google] in config.toml is not a table".to_string()))?;
    google["credentials_file"] = toml_edit::value(credentials_file.display().to_string());

    if let Some(parent) = config_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, doc.to_string())?;

    info!("credentials file recorded in {}", config_path.display());
    println!("Credentials file saved to {}", config_path.display());
    Ok(())
}
