//! Config validation
//!
//! Rules:
//! - sensor labels are non-empty
//! - addresses parse as socket addresses
//! - interval, retry delay, capacities and worker count > 0
//! - shutdown timeout within 1..=60000 ms
//! - json_lines storage has a path

use std::net::SocketAddr;

use contracts::{ContractError, ProducerConfig, ReceiverConfig, RelayConfig, StorageKind};

/// Upper bound accepted for the shutdown timeout
const MAX_SHUTDOWN_TIMEOUT_MS: u64 = 60_000;

/// Validate a RelayConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    validate_producer(&config.producer)?;
    validate_receiver(&config.receiver)?;
    validate_shutdown(config)?;
    Ok(())
}

fn validate_producer(producer: &ProducerConfig) -> Result<(), ContractError> {
    validate_addr("producer.receiver_addr", &producer.receiver_addr)?;
    if let Some(ref control_addr) = producer.control_addr {
        validate_addr("producer.control_addr", control_addr)?;
    }

    for (field, value) in [
        ("producer.sensor_type", &producer.sensor_type),
        ("producer.id1", &producer.id1),
        ("producer.id2", &producer.id2),
    ] {
        if value.trim().is_empty() {
            return Err(ContractError::config_validation(field, "cannot be empty"));
        }
    }

    validate_positive("producer.interval_ms", producer.interval_ms)?;
    validate_positive("producer.connect_retry_delay_ms", producer.connect_retry_delay_ms)?;
    validate_positive(
        "producer.outbound_capacity",
        producer.outbound_capacity as u64,
    )?;
    Ok(())
}

fn validate_receiver(receiver: &ReceiverConfig) -> Result<(), ContractError> {
    validate_addr("receiver.listen_addr", &receiver.listen_addr)?;
    validate_positive("receiver.worker_count", receiver.worker_count as u64)?;
    validate_positive("receiver.inbound_capacity", receiver.inbound_capacity as u64)?;

    if receiver.storage.kind == StorageKind::JsonLines && receiver.storage.path.is_none() {
        return Err(ContractError::config_validation(
            "receiver.storage.path",
            "json_lines storage requires a path",
        ));
    }
    Ok(())
}

fn validate_shutdown(config: &RelayConfig) -> Result<(), ContractError> {
    let timeout_ms = config.shutdown.timeout_ms;
    if timeout_ms == 0 || timeout_ms > MAX_SHUTDOWN_TIMEOUT_MS {
        return Err(ContractError::config_validation(
            "shutdown.timeout_ms",
            format!("timeout_ms must be within 1..={MAX_SHUTDOWN_TIMEOUT_MS}, got {timeout_ms}"),
        ));
    }
    Ok(())
}

fn validate_addr(field: &str, addr: &str) -> Result<(), ContractError> {
    addr.parse::<SocketAddr>().map(|_| ()).map_err(|e| {
        ContractError::config_validation(field, format!("invalid address '{addr}': {e}"))
    })
}

fn validate_positive(field: &str, value: u64) -> Result<(), ContractError> {
    if value == 0 {
        return Err(ContractError::config_validation(
            field,
            format!("{} must be > 0, got 0", field.rsplit('.').next().unwrap_or(field)),
        ));
    }
    Ok(())
}
