//! # Sensor Relay CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - configuration loading, overrides and validation
//! - producer / receiver / combined run modes
//! - HTTP control surface for the generator cadence
//! - ordered, time-bounded shutdown on SIGINT / SIGTERM

mod cli;
mod commands;
mod control;
mod error;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use pipeline::ShutdownOutcome;
use tracing::{error, info, warn};

use cli::{Cli, Commands};
use commands::{run_produce, run_receive, run_relay, run_validate};

/// Exit code when shutdown had to abandon work
const EXIT_FORCED_SHUTDOWN: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Sensor relay starting"
    );

    let result = match &cli.command {
        Commands::Produce(args) => run_produce(args).await.map(Some),
        Commands::Receive(args) => run_receive(args).await.map(Some),
        Commands::Run(args) => run_relay(args).await.map(Some),
        Commands::Validate(args) => run_validate(args).map(|()| None),
    };

    match result {
        Ok(Some(ShutdownOutcome::Forced)) => {
            warn!("Shutdown timed out, some readings may be lost");
            ExitCode::from(EXIT_FORCED_SHUTDOWN)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging based on CLI options
///
/// The Prometheus exporter is started later, once the configuration is known.
fn init_logging(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: default_log_level.to_string(),
    })
}
