//! CLI argument parsing.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "reqlog", version, about = "HTTP request capture server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the server (default when no subcommand is given)
    Run(RunArgs),
    /// Load and validate the config file, then exit
    CheckConfig(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to config file
    #[arg(short, long, default_value = "config.yaml", env = "REQLOG_CONFIG")]
    pub config: String,

    /// Listen host
    #[arg(long, env = "REQLOG_HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(long, env = "REQLOG_PORT")]
    pub port: Option<u16>,

    /// Log level
    #[arg(long, default_value = "info", env = "REQLOG_LOG_LEVEL")]
    pub log_level: String,

    /// Enable request capture regardless of the config file
    #[arg(long)]
    pub capture: bool,

    /// Graceful shutdown timeout in seconds
    #[arg(long, default_value = "5")]
    pub shutdown_timeout: u64,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            config: "config.yaml".to_string(),
            host: None,
            port: None,
            log_level: "info".to_string(),
            capture: false,
            shutdown_timeout: 5,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Path to config file
    #[arg(short, long, default_value = "config.yaml", env = "REQLOG_CONFIG")]
    pub config: String,
}
