//! `run` command implementation: both halves in one process.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use contracts::{ReadingRepository, SharedObserver};
use observability::TracingObserver;
use persistence::Repository;
use pipeline::{
    PipelineStats, ProducerPipeline, ReceiverPipeline, ShutdownCoordinator, ShutdownOutcome,
};
use tracing::info;

use super::{resolve_config, start_metrics, wait_for_stop, ControlSurface};
use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<ShutdownOutcome> {
    let mut config = resolve_config(&args.common, Some(&args.producer), Some(&args.receiver))?;
    start_metrics(&config)?;

    let started = Instant::now();
    let observer: SharedObserver = Arc::new(TracingObserver::new());

    let repository = Repository::from_config(&config.receiver.storage)
        .await
        .map_err(CliError::from)?;
    info!(
        listen = %config.receiver.listen_addr,
        workers = config.receiver.worker_count,
        storage = %repository.name(),
        "Starting receiver"
    );
    let receiver =
        ReceiverPipeline::start(&config.receiver, Arc::new(repository), observer.clone())
            .await
            .map_err(CliError::from)?;

    if args.producer.receiver_addr.is_none() {
        config.producer.receiver_addr = dial_addr(receiver.local_addr()).to_string();
    }
    info!(
        receiver = %config.producer.receiver_addr,
        sensor_type = %config.producer.sensor_type,
        interval_ms = config.producer.interval_ms,
        "Starting producer"
    );
    let producer =
        ProducerPipeline::start(&config.producer, observer).map_err(CliError::from)?;

    let control = match config.producer.control_addr.as_deref() {
        Some(addr) => Some(ControlSurface::start(addr, producer.rate_controller()).await?),
        None => None,
    };

    wait_for_stop(args.common.run_for).await;

    if let Some(control) = control {
        control.stop().await;
    }
    let outcome = ShutdownCoordinator::new(config.shutdown.timeout())
        .with_producer(&producer)
        .with_receiver(&receiver)
        .shutdown()
        .await;

    PipelineStats {
        producer: Some(producer.stats()),
        receiver: Some(receiver.stats()),
        duration: started.elapsed(),
        outcome,
    }
    .print_summary();

    Ok(outcome)
}

/// Loopback address for a listener bound to the unspecified address
fn dial_addr(listen: SocketAddr) -> SocketAddr {
    if listen.ip().is_unspecified() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), listen.port())
    } else {
        listen
    }
}
