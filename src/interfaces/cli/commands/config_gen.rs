//! Generate config command

use std::path::Path;

use colored::Colorize;

use super::helpers::confirm;
use crate::config::StaticConfig;
use crate::interfaces::cli::CliError;

/// 无路径时打印到 stdout
pub fn config_generate(output_path: Option<String>, force: bool) -> Result<(), CliError> {
    let Some(path) = output_path else {
        print!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    };

    if !force
        && Path::new(&path).exists()
        && !confirm(&format!("File already exists: {}. Overwrite?", path))?
    {
        println!("{}", "Aborted.".red());
        return Ok(());
    }

    StaticConfig::default()
        .save_to_file(&path)
        .map_err(|e| CliError::CommandError(format!("Failed to write {}: {}", path, e)))?;
    println!(
        "  {} {}",
        "Configuration file generated:".green(),
        path.blue()
    );
    Ok(())
}
