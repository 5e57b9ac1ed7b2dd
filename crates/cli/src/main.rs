//! Steward CLI, the main entry point.
//!
//! Commands:
//! - `run`     Execute one task through the plan–act–reflect loop
//! - `serve`   Start the HTTP gateway
//! - `tools`   List the built-in tool catalog
//! - `config`  Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use steward_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "steward",
    about = "Steward: an autonomous plan–act–reflect task agent",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Path to the config file (default: ~/.steward/config.toml)
    #[arg(short, long, global = true, env = "STEWARD_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single task and print the answer
    Run {
        /// The task to accomplish
        query: String,

        /// Override the iteration budget
        #[arg(short, long)]
        max_iterations: Option<u32>,

        /// Print the full result, trace included, as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the built-in tools
    Tools,

    /// Print the effective configuration with secrets redacted
    Config {
        /// Print the default configuration instead
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    if let Commands::Config { default: true } = cli.command {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = AppConfig::load_with(cli.config.as_deref())
        .map_err(|e| format!("Failed to load config: {e}"))?;

    match cli.command {
        Commands::Run {
            query,
            max_iterations,
            json,
        } => commands::run::run(&config, &query, max_iterations, json).await?,
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Tools => commands::tools::run(&config)?,
        Commands::Config { .. } => commands::config_cmd::show(&config)?,
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only command output.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
