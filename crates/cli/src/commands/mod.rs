//! Command implementations.

mod produce;
mod receive;
mod run;
mod validate;

pub use produce::run_produce;
pub use receive::run_receive;
pub use run::run_relay;
pub use validate::run_validate;

use std::time::Duration;

use anyhow::Result;
use config_loader::ConfigLoader;
use contracts::{ProducerConfig, ReceiverConfig, RelayConfig};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{CommonArgs, ProducerOverrides, ReceiverOverrides};
use crate::control;
use crate::error::CliError;

/// Load the configuration file (or defaults), apply CLI overrides, validate
pub(crate) fn resolve_config(
    common: &CommonArgs,
    producer: Option<&ProducerOverrides>,
    receiver: Option<&ReceiverOverrides>,
) -> std::result::Result<RelayConfig, CliError> {
    let mut config = match &common.config {
        Some(path) if !path.exists() => {
            return Err(CliError::config_not_found(path.display().to_string()));
        }
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(path)?
        }
        None => {
            info!("No configuration file given, using defaults");
            RelayConfig::default()
        }
    };

    if let Some(port) = common.metrics_port {
        config.observability.metrics_port = Some(port);
    }
    if let Some(timeout_ms) = common.shutdown_timeout_ms {
        config.shutdown.timeout_ms = timeout_ms;
    }
    if let Some(overrides) = producer {
        apply_producer_overrides(&mut config.producer, overrides);
    }
    if let Some(overrides) = receiver {
        apply_receiver_overrides(&mut config.receiver, overrides);
    }

    ConfigLoader::validate(&config)?;
    Ok(config)
}

fn apply_producer_overrides(config: &mut ProducerConfig, overrides: &ProducerOverrides) {
    if let Some(ref addr) = overrides.receiver_addr {
        config.receiver_addr = addr.clone();
    }
    if let Some(ref sensor_type) = overrides.sensor_type {
        config.sensor_type = sensor_type.clone();
    }
    if let Some(ref id1) = overrides.id1 {
        config.id1 = id1.clone();
    }
    if let Some(ref id2) = overrides.id2 {
        config.id2 = id2.clone();
    }
    if let Some(interval_ms) = overrides.interval_ms {
        config.interval_ms = interval_ms;
    }
    if let Some(ref addr) = overrides.control_addr {
        config.control_addr = Some(addr.clone());
    }
    if overrides.no_control {
        config.control_addr = None;
    }
}

fn apply_receiver_overrides(config: &mut ReceiverConfig, overrides: &ReceiverOverrides) {
    if let Some(ref addr) = overrides.listen_addr {
        config.listen_addr = addr.clone();
    }
    if let Some(workers) = overrides.workers {
        config.worker_count = workers;
    }
    if let Some(storage) = overrides.storage {
        config.storage.kind = storage.into();
    }
    if let Some(ref path) = overrides.storage_path {
        config.storage.path = Some(path.clone());
    }
}

/// Start the Prometheus exporter when a port is configured
pub(crate) fn start_metrics(config: &RelayConfig) -> Result<()> {
    if let Some(port) = config.observability.metrics_port {
        observability::init_metrics_only(port)?;
    }
    Ok(())
}

/// Running control surface
pub(crate) struct ControlSurface {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ControlSurface {
    /// Bind and serve; a bind failure is returned to the caller
    pub(crate) async fn start(
        addr: &str,
        rate: ingestion::RateController,
    ) -> std::result::Result<Self, CliError> {
        let listener: TcpListener = control::bind(addr).await?;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(control::serve(listener, rate, cancel.clone()));
        Ok(Self { cancel, task })
    }

    pub(crate) async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = ?e, "control surface task failed");
        }
    }
}

/// Resolve once a termination signal arrives or `run_for` elapses
pub(crate) async fn wait_for_stop(run_for: Option<u64>) {
    let deadline = async {
        match run_for {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = shutdown_signal() => warn!("Received shutdown signal, stopping relay..."),
        _ = deadline => info!("Run duration elapsed, stopping relay..."),
    }
}

/// Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
