//! Dashboard command - poll the aggregation API and render a panel

use colored::Colorize;

use super::helpers::{client_config, confirm};
use crate::client::{ClientContext, DashboardClient, DashboardPoller, DataSource, Panel};
use crate::interfaces::cli::CliError;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub async fn run_dashboard(
    panel: Panel,
    watch: bool,
    cleanup: bool,
    url: Option<String>,
    token: Option<String>,
) -> Result<(), CliError> {
    let ctx = ClientContext::from_config(&client_config(url, token));
    let interval = ctx.poll_interval();
    let client = DashboardClient::new(ctx);
    client.select(panel);

    if cleanup {
        if confirm("Delete all analytics data older than the retention window on the server?")? {
            let response = client.cleanup().await?;
            println!(
                "{} {} record(s) removed",
                "Cleanup completed:".bold().green(),
                response.total_deleted
            );
        } else {
            println!("{}", "Cleanup skipped.".yellow());
        }
    }

    if !watch {
        let outcome = client.refresh().await;
        if outcome.source == DataSource::Local {
            eprintln!(
                "{} API unreachable, showing locally recorded data",
                "warning:".yellow().bold()
            );
        }
        print!("{}", client.render());
        return Ok(());
    }

    let poller = DashboardPoller::start(client.clone(), interval);
    let mut refreshed = poller.subscribe();
    loop {
        tokio::select! {
            changed = refreshed.changed() => {
                if changed.is_err() {
                    break;
                }
                print!("{}{}", CLEAR_SCREEN, client.render());
                println!(
                    "\n{}",
                    format!("refreshing every {}s, Ctrl+C to quit", interval.as_secs()).dimmed()
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    poller.stop().await;
    Ok(())
}
