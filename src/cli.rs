//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for geoip-resolver using clap's derive macros.

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// geoip-resolver - Confidence-weighted IP geolocation resolver
#[derive(Parser)]
#[command(name = "geoip-resolver")]
#[command(version)]
#[command(about = "Resolve IP addresses to locations from validated range data", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Load all sources, start the scheduler and resolve IPs read from stdin
    ///
    /// One IP address per line; one JSON location is printed per line.
    Serve,

    /// Resolve one or more IP addresses
    Lookup {
        /// IP addresses to resolve
        #[arg(required = true)]
        ips: Vec<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a range data file (default: configured csv_path)
    Validate {
        /// CSV file to validate
        path: Option<String>,
    },

    /// Refresh all sources once and show their status
    Status,

    /// Manage range data snapshots
    Backup {
        #[command(subcommand)]
        action: BackupCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Snapshot management commands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Snapshot the active range data file
    Create,

    /// List snapshots, newest first
    List,

    /// Delete snapshots older than the retention window
    Prune {
        /// Retention window in days (default: backup_retention_days)
        #[arg(long)]
        retention_days: Option<u64>,
    },

    /// Overwrite the active range data file with a snapshot
    Restore {
        /// Snapshot file path, or a file name inside the backup directory
        snapshot: String,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}
