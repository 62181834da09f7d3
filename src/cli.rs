//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// geodetect - IP geolocation detector
#[derive(Parser, Debug)]
#[command(name = "geodetect")]
#[command(version)]
#[command(about = "Detects a visitor's location from their IP address", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Write a sample configuration file
    ConfigGen {
        /// Output path
        #[arg(default_value = "config.example.toml")]
        output: String,
    },
}

impl Cli {
    /// 未指定子命令时默认启动服务
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}
