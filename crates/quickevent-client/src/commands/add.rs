//! The `add` command.

use quickevent_core::{EventRequest, validate_timezone};
use quickevent_providers::create_calendar_event;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Creates an event and prints its link.
pub async fn add(
    title: String,
    start: String,
    duration: Option<u32>,
    timezone: Option<String>,
    config: &ClientConfig,
) -> ClientResult<()> {
    let link = create(&title, &start, duration, timezone, config).await?;
    println!("Event created: {}", link);
    Ok(())
}

/// Creates an event and returns its link.
///
/// Input is checked before any file or network access.
async fn create(
    title: &str,
    start: &str,
    duration: Option<u32>,
    timezone: Option<String>,
    config: &ClientConfig,
) -> ClientResult<String> {
    let duration = duration.unwrap_or_else(|| config.google.default_duration());
    let request = EventRequest::parse(title, start, Some(duration))?;

    let mut provider_config = config.google.to_provider_config();
    if let Some(tz) = timezone {
        validate_timezone(&tz)?;
        provider_config = provider_config.with_timezone(tz);
    }

    debug!(
        "adding {:?} at {} for {} minutes ({})",
        request.title, request.start, request.duration_minutes, provider_config.timezone
    );

    let link = create_calendar_event(&provider_config, &request).await?;
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoogleSettings;
    use crate::error::ClientError;

    fn offline_config(dir: &tempfile::TempDir) -> ClientConfig {
        ClientConfig {
            google: GoogleSettings {
                credentials_file: Some(dir.path().join("credentials.json")),
                token_path: Some(dir.path().join("token.json")),
                interactive: Some(false),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn bad_start_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = create("Lunch", "noon-ish", None, None, &offline_config(&dir))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Input(_)));
    }

    #[tokio::test]
    async fn bad_timezone_flag_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = create(
            "Lunch",
            "2025-03-01T12:00",
            None,
            Some("Moon/Base".to_string()),
            &offline_config(&dir),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[tokio::test]
    async fn no_token_non_interactive_requires_auth() {
        let dir = tempfile::tempdir().unwrap();
        let err = create("Lunch", "2025-03-01T12:00", Some(60), None, &offline_config(&dir))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthRequired(_)));
    }
}
