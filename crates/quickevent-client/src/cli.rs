//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// quickevent - Add events to Google Calendar from the terminal
#[derive(Debug, Parser)]
#[command(name = "quickevent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "QUICKEVENT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an event on the primary calendar
    Add {
        /// Event title
        title: String,

        /// Start time in ISO-8601, e.g. 2025-03-01T10:00:00 or 2025-03-01T10:00:00+05:30
        start: String,

        /// Duration in minutes (default from config, else 30)
        #[arg(long, short)]
        duration: Option<u32>,

        /// IANA timezone label for the event (overrides config)
        #[arg(long, short)]
        timezone: Option<String>,
    },

    /// Authorize access to Google Calendar
    Auth {
        /// Client-secrets JSON from Google Cloud Console; saved to config.toml
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },

    /// Delete the stored token
    Logout,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_add() {
        let cli = Cli::try_parse_from([
            "quickevent",
            "add",
            "Team sync",
            "2025-03-01T10:00:00",
            "--duration",
            "45",
            "--debug",
        ])
        .unwrap();

        assert!(cli.debug);
        match cli.command {
            Command::Add {
                title,
                start,
                duration,
                timezone,
            } => {
                assert_eq!(title, "Team sync");
                assert_eq!(start, "2025-03-01T10:00:00");
                assert_eq!(duration, Some(45));
                assert!(timezone.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parse_auth_force() {
        let cli = Cli::try_parse_from(["quickevent", "auth", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Auth {
                force: true,
                credentials_file: None
            }
        ));
    }

    #[test]
    fn add_requires_start() {
        assert!(Cli::try_parse_from(["quickevent", "add", "Lunch"]).is_err());
    }

    #[test]
    fn negative_duration_is_rejected() {
        assert!(
            Cli::try_parse_from(["quickevent", "add", "Lunch", "2025-03-01", "-d", "-5"]).is_err()
        );
    }
}
