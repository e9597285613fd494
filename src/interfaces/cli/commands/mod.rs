//! CLI commands

mod cleanup;
mod config_gen;
mod dashboard;
mod helpers;
mod record;
mod stats;

pub use cleanup::run_cleanup;
pub use config_gen::config_generate;
pub use dashboard::run_dashboard;
pub use record::{parse_viewport, record_visit};
pub use stats::print_stats;
