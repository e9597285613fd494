//! Stats command - print aggregates straight from the database

use strum::IntoEnumIterator;

use crate::client::{DashboardState, DataSource, Panel};
use crate::interfaces::cli::CliError;
use crate::runtime::lifetime::startup::open_storage;
use crate::services::AnalyticsService;

/// 不指定面板时依次打印全部面板
pub async fn print_stats(panel: Option<Panel>, json: bool) -> Result<(), CliError> {
    let storage = open_storage().await?;
    let service = AnalyticsService::from_config(storage.clone());
    let snapshot = service.snapshot().await?;
    storage.close().await;

    if json {
        let output = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| CliError::ParseError(e.to_string()))?;
        println!("{}", output);
        return Ok(());
    }

    let state = DashboardState::from_snapshot(snapshot, DataSource::Database);
    match panel {
        Some(panel) => print!("{}", state.render(panel)),
        None => {
            for panel in Panel::iter() {
                println!("{}", state.render(panel));
            }
        }
    }
    Ok(())
}
