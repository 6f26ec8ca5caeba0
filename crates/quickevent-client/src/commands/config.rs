//! Configuration commands.

use std::path::Path;

use quickevent_providers::google::{GoogleProvider, OAuthCredentials};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", config_path.display());
    println!("{}", toml_str);

    let effective = config.google.to_provider_config();
    println!("# effective settings");
    println!("# credentials_file = {}", effective.credentials_path.display());
    println!("# token_path = {}", effective.token_path.display());
    println!("# timezone = {}", effective.timezone);
    println!(
        "# default_duration_minutes = {}",
        config.google.default_duration()
    );

    Ok(())
}

/// Validate the configuration.
///
/// A missing client-secrets file is reported but not an error: it is only
/// needed for a new authorization.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    let mut provider = GoogleProvider::new(config.google.to_provider_config())?;
    let credentials_path = provider.config().credentials_path.clone();

    if credentials_path.exists() {
        OAuthCredentials::from_file(&credentials_path)?;
        println!("Client secrets are valid ({}).", credentials_path.display());
    } else {
        println!(
            "Client secrets not found at {}; `quickevent auth` will need them.",
            credentials_path.display()
        );
    }

    if provider.is_authenticated()? {
        println!("Stored token is usable.");
    } else {
        println!("No usable token; run `quickevent auth`.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(config_path: &Path) -> ClientResult<()> {
    println!("config: {}", config_path.display());
    Ok(())
}
