//! quickevent CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use quickevent_core::{TracingConfig, init_tracing};

use quickevent_client::cli::{Cli, Command, ConfigAction};
use quickevent_client::commands;
use quickevent_client::config::ClientConfig;
use quickevent_client::error::{ClientError, ClientResult};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let (config, config_path) = match cli.config {
        Some(path) => (
            ClientConfig::load_from(&path).map_err(ClientError::Config)?,
            path,
        ),
        None => (
            ClientConfig::load().map_err(ClientError::Config)?,
            ClientConfig::default_path(),
        ),
    };

    match cli.command {
        Command::Add {
            title,
            start,
            duration,
            timezone,
        } => commands::add::add(title, start, duration, timezone, &config).await,
        Command::Auth {
            credentials_file,
            force,
        } => commands::auth::google(credentials_file, force, &config, &config_path).await,
        Command::Logout => commands::auth::logout(&config),
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}
