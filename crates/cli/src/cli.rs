//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sensor Relay - periodic sensor readings streamed to a persistence pool
#[derive(Parser, Debug)]
#[command(
    name = "sensor-relay",
    author,
    version,
    about = "Sensor telemetry relay",
    long_about = "Generates periodic sensor readings, streams them over a persistent \n\
                  connection to a receiver, and persists them with a pool of workers."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SENSOR_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SENSOR_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the producer: generator, transport client and control surface
    Produce(ProduceArgs),

    /// Run the receiver: ingress and persistence workers
    Receive(ReceiveArgs),

    /// Run producer and receiver in one process over loopback
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Options shared by every running mode
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "SENSOR_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Prometheus exporter port (overrides configuration)
    #[arg(long, env = "SENSOR_RELAY_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Upper bound on graceful shutdown in milliseconds
    #[arg(long, env = "SENSOR_RELAY_SHUTDOWN_TIMEOUT_MS")]
    pub shutdown_timeout_ms: Option<u64>,

    /// Stop after this many seconds instead of waiting for a signal
    #[arg(long, env = "SENSOR_RELAY_RUN_FOR")]
    pub run_for: Option<u64>,
}

/// Producer overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ProducerOverrides {
    /// Receiver address to stream to
    #[arg(long, env = "SENSOR_RELAY_RECEIVER_ADDR")]
    pub receiver_addr: Option<String>,

    /// Sensor type label
    #[arg(long, env = "SENSOR_RELAY_SENSOR_TYPE")]
    pub sensor_type: Option<String>,

    /// First sensor identifier
    #[arg(long, env = "SENSOR_RELAY_ID1")]
    pub id1: Option<String>,

    /// Second sensor identifier
    #[arg(long, env = "SENSOR_RELAY_ID2")]
    pub id2: Option<String>,

    /// Initial interval between readings in milliseconds
    #[arg(long, env = "SENSOR_RELAY_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Control surface address
    #[arg(long, env = "SENSOR_RELAY_CONTROL_ADDR")]
    pub control_addr: Option<String>,

    /// Disable the HTTP control surface
    #[arg(long, conflicts_with = "control_addr")]
    pub no_control: bool,
}

/// Receiver overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ReceiverOverrides {
    /// Address the ingress listens on
    #[arg(long, env = "SENSOR_RELAY_LISTEN_ADDR")]
    pub listen_addr: Option<String>,

    /// Number of persistence workers
    #[arg(long, env = "SENSOR_RELAY_WORKERS")]
    pub workers: Option<usize>,

    /// Storage backend
    #[arg(long, value_enum, env = "SENSOR_RELAY_STORAGE")]
    pub storage: Option<StorageArg>,

    /// Output file for json_lines storage
    #[arg(long, env = "SENSOR_RELAY_STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,
}

/// Arguments for the `produce` command
#[derive(Parser, Debug, Clone)]
pub struct ProduceArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub producer: ProducerOverrides,
}

/// Arguments for the `receive` command
#[derive(Parser, Debug, Clone)]
pub struct ReceiveArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub receiver: ReceiverOverrides,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub producer: ProducerOverrides,

    #[command(flatten)]
    pub receiver: ReceiverOverrides,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Storage backend selection
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageArg {
    Memory,
    JsonLines,
    Log,
}

impl From<StorageArg> for contracts::StorageKind {
    fn from(arg: StorageArg) -> Self {
        match arg {
            StorageArg::Memory => Self::Memory,
            StorageArg::JsonLines => Self::JsonLines,
            StorageArg::Log => Self::Log,
        }
    }
}
