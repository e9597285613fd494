//! Cleanup command - run the retention purge against the local database

use colored::Colorize;

use super::helpers::confirm;
use crate::analytics::DataRetentionTask;
use crate::interfaces::cli::CliError;
use crate::runtime::lifetime::startup::open_storage;

pub async fn run_cleanup(days: Option<u64>, yes: bool) -> Result<(), CliError> {
    let retention_days =
        days.unwrap_or_else(|| crate::config::get_config().analytics.retention_days);

    if !yes
        && !confirm(&format!(
            "Delete all visitors, page views and sessions older than {} days?",
            retention_days
        ))?
    {
        println!("{}", "Aborted.".red());
        return Ok(());
    }

    let storage = open_storage().await?;
    let task = DataRetentionTask::new(storage.clone(), retention_days);
    let report = task.run_cleanup().await?;
    storage.close().await;

    println!("{}", "Cleanup completed".bold().green());
    println!("  {}:    {}", "Visitors".cyan(), report.visitors);
    println!("  {}:  {}", "Page views".cyan(), report.page_views);
    println!("  {}:    {}", "Sessions".cyan(), report.session_durations);
    println!("  {}:       {}", "Total".cyan(), report.total());
    Ok(())
}
