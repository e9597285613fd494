//! Record command - simulate one page load and unload (smoke test)

use colored::Colorize;
use std::time::Duration;

use super::helpers::client_config;
use crate::client::{ClientContext, Recorder, SessionOutcome, Viewport};
use crate::interfaces::cli::CliError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// `"1920x1080"`
pub fn parse_viewport(value: &str) -> Result<Viewport, CliError> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| CliError::ParseError(format!("Invalid viewport '{}'", value)))?;
    let width = w
        .trim()
        .parse()
        .map_err(|_| CliError::ParseError(format!("Invalid viewport width '{}'", w)))?;
    let height = h
        .trim()
        .parse()
        .map_err(|_| CliError::ParseError(format!("Invalid viewport height '{}'", h)))?;
    Ok(Viewport::new(width, height))
}

pub async fn record_visit(
    path: String,
    stay: u64,
    user_agent: Option<String>,
    viewport: String,
    url: Option<String>,
) -> Result<(), CliError> {
    let viewport = parse_viewport(&viewport)?;
    let user_agent = user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    let ctx = ClientContext::from_config(&client_config(url, None));
    let recorder = Recorder::new(ctx, &user_agent, viewport);
    let fp = recorder.fingerprint();
    println!(
        "{} {} / {} / {}",
        "Fingerprint:".cyan(),
        fp.browser,
        fp.device,
        fp.screen_size
    );

    let mut session = recorder.on_page_load(&path);
    session.submitted().await;
    println!(
        "{} {} as {}",
        "Recorded page view".green(),
        session.page(),
        session.visitor_id()
    );

    tokio::time::sleep(Duration::from_secs(stay)).await;

    match session.end() {
        SessionOutcome::Discarded { duration } => println!(
            "{} {}s is below the minimum, not sent",
            "Session".yellow(),
            duration
        ),
        SessionOutcome::Sent { duration } => {
            println!("{} {}s", "Session sent:".green(), duration)
        }
        SessionOutcome::Buffered { duration } => {
            println!("{} {}s", "Session buffered:".yellow(), duration)
        }
    }

    recorder.shutdown().await;
    Ok(())
}
