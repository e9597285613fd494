use clap::Parser;
use colored::Colorize;

use footprint::cli::Cli;
use footprint::config::{StaticConfig, get_config, update_config};
use footprint::runtime::modes::{self, Mode};

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    update_config(StaticConfig::load_from(&cli.config));
    let config = get_config();

    // 日志 guard 需要活到进程结束
    let _guard = match footprint::system::logging::init_logging(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} {}", "Failed to initialize logging:".red().bold(), e);
            None
        }
    };

    match modes::detect_mode(cli.command.as_ref()) {
        Mode::Server => {
            if let Err(e) = modes::run_server().await {
                eprintln!("{} {:#}", "Server error:".red().bold(), e);
                std::process::exit(1);
            }
        }
        Mode::Cli => {
            let Some(command) = cli.command else {
                return;
            };
            if let Err(e) = modes::run_cli(command).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
        }
    }
}
