use clap::Parser;
use colored::Colorize;

use geodetect::cli::{Cli, Commands};
use geodetect::config::{StaticConfig, get_config, init_config};
use geodetect::runtime::run_server;
use geodetect::system::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command() {
        Commands::ConfigGen { output } => {
            let sample = StaticConfig::generate_sample_config();
            if let Err(e) = std::fs::write(&output, sample) {
                eprintln!("{} {}", "Failed to write config:".red().bold(), e);
                std::process::exit(1);
            }
            println!("{} {}", "Sample configuration written to".green(), output.bold());
            Ok(())
        }
        Commands::Serve => {
            init_config(cli.config.as_deref());
            let config = get_config();

            // guard 需要存活到进程结束，保证日志刷盘
            let _log_guard = init_logging(&config.logging)?;

            run_server(&config).await
        }
    }
}
