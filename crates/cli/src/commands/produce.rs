//! `produce` command implementation.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use contracts::SharedObserver;
use observability::TracingObserver;
use pipeline::{PipelineStats, ProducerPipeline, ShutdownCoordinator, ShutdownOutcome};
use tracing::info;

use super::{resolve_config, start_metrics, wait_for_stop, ControlSurface};
use crate::cli::ProduceArgs;
use crate::error::CliError;

/// Execute the `produce` command
pub async fn run_produce(args: &ProduceArgs) -> Result<ShutdownOutcome> {
    let config = resolve_config(&args.common, Some(&args.producer), None)?;
    start_metrics(&config)?;

    info!(
        receiver = %config.producer.receiver_addr,
        sensor_type = %config.producer.sensor_type,
        interval_ms = config.producer.interval_ms,
        "Starting producer"
    );

    let started = Instant::now();
    let observer: SharedObserver = Arc::new(TracingObserver::new());
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
        .shutdown()
        .await;

    PipelineStats {
        producer: Some(producer.stats()),
        receiver: None,
        duration: started.elapsed(),
        outcome,
    }
    .print_summary();

    Ok(outcome)
}
