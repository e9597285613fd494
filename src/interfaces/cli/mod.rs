//! CLI interface module
//!
//! This module provides command-line interface functionality for footprint.

pub mod commands;

use crate::cli::Commands;
use commands::{config_generate, print_stats, record_visit, run_cleanup, run_dashboard};
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
    NetworkError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
            CliError::NetworkError(msg) => format!("Network error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
            CliError::NetworkError(msg) => {
                format!("{} {}", "Network error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::FootprintError> for CliError {
    fn from(err: crate::errors::FootprintError) -> Self {
        CliError::StorageError(err.to_string())
    }
}

impl From<crate::client::ClientError> for CliError {
    fn from(err: crate::client::ClientError) -> Self {
        CliError::NetworkError(err.to_string())
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::StorageError(format!("{:#}", err))
    }
}

/// Run a CLI command from clap-parsed input
///
/// `serve` is handled by the caller.
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::Cleanup { days, yes } => run_cleanup(days, yes).await,
        Commands::Stats { panel, json } => print_stats(panel, json).await,
        Commands::Dashboard {
            panel,
            watch,
            cleanup,
            url,
            token,
        } => run_dashboard(panel, watch, cleanup, url, token).await,
        Commands::Record {
            path,
            stay,
            user_agent,
            viewport,
            url,
        } => record_visit(path, stay, user_agent, viewport, url).await,
        Commands::ConfigGen { output_path, force } => config_generate(output_path, force),
        Commands::Serve => Err(CliError::CommandError(
            "serve is not a CLI command".to_string(),
        )),
    }
}
