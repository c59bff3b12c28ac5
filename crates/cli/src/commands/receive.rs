//! `receive` command implementation.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use contracts::{ReadingRepository, SharedObserver};
use observability::TracingObserver;
use persistence::Repository;
use pipeline::{PipelineStats, ReceiverPipeline, ShutdownCoordinator, ShutdownOutcome};
use tracing::info;

use super::{resolve_config, start_metrics, wait_for_stop};
use crate::cli::ReceiveArgs;
use crate::error::CliError;

/// Execute the `receive` command
pub async fn run_receive(args: &ReceiveArgs) -> Result<ShutdownOutcome> {
    let config = resolve_config(&args.common, None, Some(&args.receiver))?;
    start_metrics(&config)?;

    let repository = Repository::from_config(&config.receiver.storage)
        .await
        .map_err(CliError::from)?;
    info!(
        listen = %config.receiver.listen_addr,
        workers = config.receiver.worker_count,
        storage = %repository.name(),
        "Starting receiver"
    );

    let started = Instant::now();
    let observer: SharedObserver = Arc::new(TracingObserver::new());
    let receiver = ReceiverPipeline::start(&config.receiver, Arc::new(repository), observer)
        .await
        .map_err(CliError::from)?;

    wait_for_stop(args.common.run_for).await;

    let outcome = ShutdownCoordinator::new(config.shutdown.timeout())
        .with_receiver(&receiver)
        .shutdown()
        .await;

    PipelineStats {
        producer: None,
        receiver: Some(receiver.stats()),
        duration: started.elapsed(),
        outcome,
    }
    .print_summary();

    Ok(outcome)
}
