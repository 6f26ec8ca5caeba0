//! Command-line interface for creating Google Calendar events.
//!
//! This crate provides the `quickevent` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
