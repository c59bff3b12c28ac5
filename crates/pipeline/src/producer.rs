//! Producer half: generator → outbound buffer → transport client

use std::sync::Arc;

use buffer::BoundedBuffer;
use contracts::{ProducerConfig, Reading, SharedObserver};
use ingestion::{RateController, ReadingGenerator};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use transport::{
    ClientExit, ClientMetrics, ClientState, StreamTransport, TcpTransport, TransportClient,
};

use crate::error::Result;
use crate::stats::ProducerStats;

/// Name of the producer-side buffer
pub const OUTBOUND_BUFFER: &str = "outbound";

/// Running producer
pub struct ProducerPipeline {
    generator: ReadingGenerator,
    outbound: BoundedBuffer<Reading>,
    client_stop: CancellationToken,
    client: Mutex<Option<JoinHandle<ClientExit>>>,
    client_exit: Mutex<Option<ClientExit>>,
    client_state: watch::Receiver<ClientState>,
    client_metrics: Arc<ClientMetrics>,
}

impl ProducerPipeline {
    /// Start generating and streaming over TCP
    pub fn start(config: &ProducerConfig, observer: SharedObserver) -> Result<Self> {
        Self::start_with_transport(config, TcpTransport::new(), observer)
    }

    /// Start with a custom transport
    #[instrument(
        name = "producer_start",
        skip_all,
        fields(receiver = %config.receiver_addr, sensor_type = %config.sensor_type)
    )]
    pub fn start_with_transport<T>(
        config: &ProducerConfig,
        transport: T,
        observer: SharedObserver,
    ) -> Result<Self>
    where
        T: StreamTransport + 'static,
    {
        let outbound = BoundedBuffer::try_new(OUTBOUND_BUFFER, config.outbound_capacity)?;
        let client_stop = CancellationToken::new();

        let client = TransportClient::new(
            config.receiver_addr.clone(),
            transport,
            outbound.clone(),
            client_stop.clone(),
            observer.clone(),
        )
        .with_retry_delay(config.connect_retry_delay());
        let client_state = client.subscribe();
        let client_metrics = client.metrics().clone();
        let client = tokio::spawn(client.run());

        let generator = ReadingGenerator::new(outbound.clone(), config.interval(), observer);
        generator.start(&config.sensor_type, &config.id1, &config.id2)?;

        info!(
            interval_ms = config.interval_ms,
            capacity = config.outbound_capacity,
            "producer started"
        );

        Ok(Self {
            generator,
            outbound,
            client_stop,
            client: Mutex::new(Some(client)),
            client_exit: Mutex::new(None),
            client_state,
            client_metrics,
        })
    }

    /// Handle for the control surface
    pub fn rate_controller(&self) -> RateController {
        self.generator.rate_controller()
    }

    pub fn client_state(&self) -> watch::Receiver<ClientState> {
        self.client_state.clone()
    }

    /// Stop the generator and wait for it to exit
    pub async fn stop_generator(&self) {
        self.generator.stop();
        self.generator.join().await;
    }

    /// Close the outbound buffer, stop the client and wait for its drain
    pub async fn stop_client(&self) {
        self.outbound.close();
        self.client_stop.cancel();

        let mut client = self.client.lock().await;
        if let Some(handle) = client.as_mut() {
            match handle.await {
                Ok(exit) => *self.client_exit.lock().await = Some(exit),
                Err(e) => warn!(error = ?e, "transport client task failed"),
            }
            *client = None;
        }
    }

    /// Abort the client task if it is still running
    pub(crate) async fn abort(&self) {
        if let Some(handle) = self.client.lock().await.take() {
            handle.abort();
        }
    }

    /// How the client ended, once it has
    pub async fn client_exit(&self) -> Option<ClientExit> {
        self.client_exit.lock().await.clone()
    }

    pub fn stats(&self) -> ProducerStats {
        ProducerStats {
            generator: self.generator.metrics().snapshot(),
            outbound: self.outbound.metrics().snapshot(),
            client: self.client_metrics.snapshot(),
        }
    }
}
