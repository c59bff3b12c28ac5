//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RelayConfig, StorageKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Intervals below this get a warning
const FAST_INTERVAL_MS: u64 = 10;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    receiver_addr: String,
    sensor: String,
    interval_ms: u64,
    control_addr: Option<String>,
    listen_addr: String,
    workers: usize,
    storage: String,
    shutdown_timeout_ms: u64,
}

impl ConfigSummary {
    fn new(config: &RelayConfig) -> Self {
        let producer = &config.producer;
        let storage = &config.receiver.storage;
        Self {
            version: format!("{:?}", config.version),
            receiver_addr: producer.receiver_addr.clone(),
            sensor: format!("{}/{}/{}", producer.sensor_type, producer.id1, producer.id2),
            interval_ms: producer.interval_ms,
            control_addr: producer.control_addr.clone(),
            listen_addr: config.receiver.listen_addr.clone(),
            workers: config.receiver.worker_count,
            storage: match (storage.kind, &storage.path) {
                (StorageKind::JsonLines, Some(path)) => format!("json_lines ({})", path.display()),
                (kind, _) => format!("{kind:?}").to_lowercase(),
            },
            shutdown_timeout_ms: config.shutdown.timeout_ms,
        }
    }
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary::new(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &RelayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    match config.receiver.storage.kind {
        StorageKind::Memory => {
            warnings.push("receiver.storage.kind = memory - readings are lost at exit".to_string())
        }
        StorageKind::Log => {
            warnings.push("receiver.storage.kind = log - readings are only logged".to_string())
        }
        StorageKind::JsonLines => {}
    }

    if config.producer.interval_ms < FAST_INTERVAL_MS {
        warnings.push(format!(
            "producer.interval_ms = {} - expect outbound drops if the receiver lags",
            config.producer.interval_ms
        ));
    }

    if let Some(ref addr) = config.producer.control_addr {
        if addr.starts_with("0.0.0.0") || addr.starts_with("[::]") {
            warnings.push(format!(
                "producer.control_addr = {addr} - control surface is reachable from any interface"
            ));
        }
    }

    if config.receiver.inbound_capacity < config.receiver.worker_count {
        warnings.push(
            "receiver.inbound_capacity is smaller than worker_count - workers will idle"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Producer:");
            println!("    Receiver: {}", summary.receiver_addr);
            println!("    Sensor: {}", summary.sensor);
            println!("    Interval: {}ms", summary.interval_ms);
            match summary.control_addr {
                Some(ref addr) => println!("    Control: {}", addr),
                None => println!("    Control: disabled"),
            }
            println!("  Receiver:");
            println!("    Listen: {}", summary.listen_addr);
            println!("    Workers: {}", summary.workers);
            println!("    Storage: {}", summary.storage);
            println!("  Shutdown timeout: {}ms", summary.shutdown_timeout_ms);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
