//! Receiver half: ingress → inbound buffer → worker pool

use std::net::SocketAddr;
use std::sync::Arc;

use buffer::BoundedBuffer;
use contracts::{Reading, ReadingRepository, ReceiverConfig, SharedObserver};
use persistence::WorkerPool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use transport::{IngressMetrics, IngressServer};

use crate::error::Result;
use crate::stats::ReceiverStats;

/// Name of the receiver-side buffer
pub const INBOUND_BUFFER: &str = "inbound";

/// Running receiver
pub struct ReceiverPipeline {
    local_addr: SocketAddr,
    inbound: BoundedBuffer<Reading>,
    ingress_cancel: CancellationToken,
    ingress: Mutex<Option<JoinHandle<()>>>,
    ingress_metrics: Arc<IngressMetrics>,
    pool: WorkerPool,
}

impl ReceiverPipeline {
    /// Bind the ingress and launch the worker pool
    ///
    /// # Errors
    /// Fails if the listen address cannot be bound or the pool is misconfigured.
    #[instrument(
        name = "receiver_start",
        skip_all,
        fields(listen = %config.listen_addr, workers = config.worker_count)
    )]
    pub async fn start<R>(
        config: &ReceiverConfig,
        repository: Arc<R>,
        observer: SharedObserver,
    ) -> Result<Self>
    where
        R: ReadingRepository + Sync + 'static,
    {
        let inbound = BoundedBuffer::try_new(INBOUND_BUFFER, config.inbound_capacity)?;

        let server = IngressServer::bind(&config.listen_addr, inbound.clone(), observer.clone())
            .await?;
        let local_addr = server.local_addr()?;
        let ingress_metrics = server.metrics().clone();

        let pool = WorkerPool::start(repository, config.worker_count, inbound.clone(), observer)?;

        let ingress_cancel = CancellationToken::new();
        let ingress = tokio::spawn(server.serve(ingress_cancel.clone()));

        info!(%local_addr, "receiver started");

        Ok(Self {
            local_addr,
            inbound,
            ingress_cancel,
            ingress: Mutex::new(Some(ingress)),
            ingress_metrics,
            pool,
        })
    }

    /// Address the ingress is actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn inbound(&self) -> &BoundedBuffer<Reading> {
        &self.inbound
    }

    /// Cancel the accept loop, force open sessions closed and wait
    pub async fn stop_ingress(&self) {
        self.ingress_cancel.cancel();

        let mut ingress = self.ingress.lock().await;
        if let Some(handle) = ingress.as_mut() {
            if let Err(e) = handle.await {
                warn!(error = ?e, "ingress task failed");
            }
            *ingress = None;
        }
    }

    /// Close the inbound buffer and wait for the workers to drain it
    pub async fn stop_pool(&self) {
        self.pool.stop().await;
    }

    pub(crate) async fn abort(&self) {
        self.ingress_cancel.cancel();
        if let Some(handle) = self.ingress.lock().await.take() {
            handle.abort();
        }
        self.pool.abort().await;
    }

    pub fn stats(&self) -> ReceiverStats {
        ReceiverStats {
            ingress: self.ingress_metrics.snapshot(),
            inbound: self.inbound.metrics().snapshot(),
            pool: self.pool.metrics().snapshot(),
        }
    }
}
