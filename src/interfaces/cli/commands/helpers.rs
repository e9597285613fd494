//! Shared CLI helpers

use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::config::ClientConfig;
use crate::interfaces::cli::CliError;

/// 交互确认，默认否
pub fn confirm(prompt: &str) -> Result<bool, CliError> {
    print!("{} {} ", prompt.yellow(), "[y/N]".yellow());
    io::stdout()
        .flush()
        .map_err(|e| CliError::CommandError(e.to_string()))?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(|e| CliError::CommandError(e.to_string()))?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// `[client]` 配置加命令行覆盖
pub fn client_config(url: Option<String>, token: Option<String>) -> ClientConfig {
    let mut config = crate::config::get_config().client.clone();
    if let Some(url) = url {
        config.api_base_url = url;
    }
    if let Some(token) = token {
        config.admin_token = Some(token);
    }
    config
}
