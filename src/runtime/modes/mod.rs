//! Mode routing
//!
//! - Server mode (HTTP server)
//! - CLI mode (one-shot commands)
//!
//! `footprint` with no subcommand, or `footprint serve`, starts the server.

pub mod cli;
pub mod server;

pub use cli::run_cli;
pub use server::run_server;

use crate::cli::Commands;

/// Mode detection result
#[derive(Debug, PartialEq)]
pub enum Mode {
    Server,
    Cli,
}

/// 无子命令或 `serve` 为服务器模式，其余为 CLI
pub fn detect_mode(command: Option<&Commands>) -> Mode {
    match command {
        None | Some(Commands::Serve) => Mode::Server,
        Some(_) => Mode::Cli,
    }
}
