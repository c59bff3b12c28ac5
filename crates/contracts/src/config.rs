//! RelayConfig - Config Loader output
//!
//! Describes both halves of the relay: the producer (generator + transport
//! client), the receiver (ingress + worker pool), and shutdown bounds.
//! Defaults reproduce the reference sizing.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Full relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Producer side
    #[serde(default)]
    pub producer: ProducerConfig,

    /// Receiver side
    #[serde(default)]
    pub receiver: ReceiverConfig,

    /// Shutdown bounds
    #[serde(default)]
    pub shutdown: ShutdownConfig,

    /// Metrics exporter settings
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

/// Producer configuration: generator, outbound buffer, transport client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Receiver address the transport client dials
    #[serde(default = "default_receiver_addr")]
    pub receiver_addr: String,

    /// Sensor type label
    #[serde(default = "default_sensor_type")]
    pub sensor_type: String,

    /// First identifier
    #[serde(default = "default_id1")]
    pub id1: String,

    /// Second identifier
    #[serde(default = "default_id2")]
    pub id2: String,

    /// Initial tick interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Outbound buffer capacity
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    /// Fixed delay between connection attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub connect_retry_delay_ms: u64,

    /// HTTP control surface address (None = disabled)
    #[serde(default = "default_control_addr")]
    pub control_addr: Option<String>,
}

impl ProducerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            receiver_addr: default_receiver_addr(),
            sensor_type: default_sensor_type(),
            id1: default_id1(),
            id2: default_id2(),
            interval_ms: default_interval_ms(),
            outbound_capacity: default_outbound_capacity(),
            connect_retry_delay_ms: default_retry_delay_ms(),
            control_addr: default_control_addr(),
        }
    }
}

/// Receiver configuration: ingress, inbound buffer, worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Address the ingress binds
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Number of persistence workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Inbound buffer capacity
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,

    /// Storage backend
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            worker_count: default_worker_count(),
            inbound_capacity: default_inbound_capacity(),
            storage: StorageConfig::default(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend kind
    #[serde(default)]
    pub kind: StorageKind,

    /// Output path (json_lines only)
    #[serde(default = "default_storage_path")]
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            path: default_storage_path(),
        }
    }
}

/// Storage backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// In-process store
    Memory,
    /// Append-only JSON-lines file
    #[default]
    JsonLines,
    /// Log every reading
    Log,
}

/// Shutdown bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Upper bound on the whole teardown sequence in milliseconds
    #[serde(default = "default_shutdown_timeout_ms")]
    pub timeout_ms: u64,
}

impl ShutdownConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

/// Metrics exporter settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    /// Prometheus port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_receiver_addr() -> String {
    "127.0.0.1:50051".to_string()
}

fn default_sensor_type() -> String {
    "Temperature".to_string()
}

fn default_id1() -> String {
    "A".to_string()
}

fn default_id2() -> String {
    "1".to_string()
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_outbound_capacity() -> usize {
    100
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_control_addr() -> Option<String> {
    Some("0.0.0.0:8080".to_string())
}

fn default_listen_addr() -> String {
    "0.0.0.0:50051".to_string()
}

fn default_worker_count() -> usize {
    10
}

fn default_inbound_capacity() -> usize {
    1000
}

fn default_storage_path() -> Option<PathBuf> {
    Some(PathBuf::from("sensor_readings.jsonl"))
}

fn default_shutdown_timeout_ms() -> u64 {
    5000
}
