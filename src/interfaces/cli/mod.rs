//! CLI interface module
//!
//! This module provides command-line interface functionality for geoip-resolver.

pub mod commands;

use std::fmt;

use crate::cli::{BackupCommands, Commands, ConfigCommands};
use crate::config::StaticConfig;
use commands::{backup, config_generate, lookup_ips, serve, source_status, validate_file};

#[derive(Debug)]
pub enum CliError {
    DataError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::DataError(msg) => format!("Data error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::DataError(msg) => {
                format!("{} {}", "Data error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
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

impl From<crate::errors::GeoError> for CliError {
    fn from(err: crate::errors::GeoError) -> Self {
        CliError::DataError(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::CommandError(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::ParseError(err.to_string())
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands, config: &StaticConfig) -> Result<(), CliError> {
    match cmd {
        Commands::Serve => serve(config).await,

        Commands::Lookup { ips, pretty } => lookup_ips(config, &ips, pretty).await,

        Commands::Validate { path } => {
            let path = path.unwrap_or_else(|| config.geoip.csv_path.clone());
            validate_file(&path)
        }

        Commands::Status => source_status(config).await,

        Commands::Backup { action } => match action {
            BackupCommands::Create => backup::create(&config.geoip),
            BackupCommands::List => backup::list(&config.geoip),
            BackupCommands::Prune { retention_days } => backup::prune(&config.geoip, retention_days),
            BackupCommands::Restore { snapshot } => backup::restore(&config.geoip, &snapshot),
        },

        Commands::Config { action } => match action {
            ConfigCommands::Generate { output_path, force } => {
                config_generate(output_path, force).await
            }
        },
    }
}
