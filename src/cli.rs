//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for footprint using clap's derive macros.

use clap::{Parser, Subcommand};

use crate::client::Panel;

/// Footprint - self-hosted visitor analytics
#[derive(Parser)]
#[command(name = "footprint")]
#[command(version)]
#[command(about = "Self-hosted visitor analytics for a portfolio site", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Delete records older than the retention window from the local database
    Cleanup {
        /// Override analytics.retention_days
        #[arg(long)]
        days: Option<u64>,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Print aggregates computed from the local database
    Stats {
        /// Panel to print (overview, visitors, browsers, pages, sessions)
        #[arg(long)]
        panel: Option<Panel>,

        /// Output the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Poll a running server's aggregation API and render the dashboard
    Dashboard {
        /// Panel to render
        #[arg(long, default_value = "overview")]
        panel: Panel,

        /// Keep polling and re-render on every refresh
        #[arg(long, short = 'w')]
        watch: bool,

        /// Run the remote cleanup first (asks for confirmation)
        #[arg(long)]
        cleanup: bool,

        /// Override client.api_base_url
        #[arg(long)]
        url: Option<String>,

        /// Override client.admin_token
        #[arg(long)]
        token: Option<String>,
    },

    /// Simulate one page load and unload against a server
    Record {
        /// Page path to record
        #[arg(default_value = "/")]
        path: String,

        /// Seconds to stay on the page before unloading
        #[arg(long, default_value_t = 6)]
        stay: u64,

        /// User agent to fingerprint
        #[arg(long)]
        user_agent: Option<String>,

        /// Viewport as WIDTHxHEIGHT
        #[arg(long, default_value = "1920x1080")]
        viewport: String,

        /// Override client.api_base_url
        #[arg(long)]
        url: Option<String>,
    },

    /// Generate a sample configuration file
    ConfigGen {
        /// Output path (default: print to stdout)
        output_path: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}
