//! Transport client
//!
//! Drains the outbound buffer into a long-lived stream and rebuilds the
//! connection after any failure.
//!
//! ```text
//!            dial ok        open ok
//! Disconnected ──> Connecting ──> Streaming
//!      ^               │              │
//!      └── wait retry ─┘   send error ┘
//! ```
//!
//! The retry delay is fixed and retries never give up; only the stop token
//! ends the outer loop. A reading whose send fails is lost.

use std::sync::Arc;
use std::time::Duration;

use buffer::BoundedBuffer;
use contracts::{Ack, PipelineEvent, Reading, SharedObserver};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::codec::{ClientCodec, ClientMessage, ServerMessage};
use crate::error::{Result, TransportError};
use crate::metrics::ClientMetrics;

/// Default wait between connection attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default bound on the open handshake and the final Ack
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection lifecycle of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Streaming,
}

/// How `TransportClient::run` ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientExit {
    /// Buffer drained and the stream was acknowledged
    Finished(Ack),
    /// Buffer drained but ending the stream failed
    FinishFailed(String),
    /// Stop signal seen while not streaming
    Stopped,
}

/// One client-streaming connection
///
/// Split into the steps the client state machine moves through so that each
/// transition can be driven without sockets.
#[trait_variant::make(StreamTransport: Send)]
pub trait LocalStreamTransport {
    /// Establish the connection
    async fn dial(&mut self, addr: &str) -> Result<()>;

    /// Open the `SendSensorData` stream on the current connection
    async fn open_stream(&mut self) -> Result<()>;

    /// Send one reading on the open stream
    async fn send(&mut self, reading: &Reading) -> Result<()>;

    /// End the stream and wait for the acknowledgment
    async fn finish(&mut self) -> Result<Ack>;

    /// Drop the connection; never fails
    async fn close(&mut self);
}

/// `StreamTransport` over TCP with the length-delimited bincode protocol
#[derive(Debug)]
pub struct TcpTransport {
    framed: Option<Framed<TcpStream, ClientCodec>>,
    reply_timeout: Duration,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::with_reply_timeout(DEFAULT_REPLY_TIMEOUT)
    }

    pub fn with_reply_timeout(reply_timeout: Duration) -> Self {
        Self {
            framed: None,
            reply_timeout,
        }
    }

    fn framed(&mut self) -> Result<&mut Framed<TcpStream, ClientCodec>> {
        self.framed.as_mut().ok_or(TransportError::NotConnected)
    }

    async fn reply(&mut self, operation: &'static str) -> Result<ServerMessage> {
        let timeout = self.reply_timeout;
        let framed = self.framed()?;
        match tokio::time::timeout(timeout, framed.next()).await {
            Ok(Some(msg)) => msg,
            Ok(None) => Err(TransportError::ConnectionClosed),
            Err(_) => Err(TransportError::Timeout { operation }),
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamTransport for TcpTransport {
    async fn dial(&mut self, addr: &str) -> Result<()> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        self.framed = Some(Framed::new(stream, ClientCodec::new()));
        Ok(())
    }

    async fn open_stream(&mut self) -> Result<()> {
        self.framed()?.send(ClientMessage::open()).await?;
        match self.reply("stream open").await? {
            ServerMessage::Ready => Ok(()),
            ServerMessage::Rejected { reason } => Err(TransportError::Rejected { reason }),
            other => Err(TransportError::unexpected("Ready", other)),
        }
    }

    async fn send(&mut self, reading: &Reading) -> Result<()> {
        self.framed()?
            .send(ClientMessage::Reading(reading.clone()))
            .await
    }

    async fn finish(&mut self) -> Result<Ack> {
        self.framed()?.send(ClientMessage::End).await?;
        match self.reply("ack").await? {
            ServerMessage::Ack(ack) => Ok(ack),
            other => Err(TransportError::unexpected("Ack", other)),
        }
    }

    async fn close(&mut self) {
        if let Some(mut framed) = self.framed.take() {
            // Flushes pending frames and shuts down the write half
            let _ = framed.close().await;
        }
    }
}

/// Producer-side stream client
pub struct TransportClient<T> {
    addr: String,
    transport: T,
    outbound: BoundedBuffer<Reading>,
    retry_delay: Duration,
    stop: CancellationToken,
    state: watch::Sender<ClientState>,
    metrics: Arc<ClientMetrics>,
    observer: SharedObserver,
}

impl<T: StreamTransport> TransportClient<T> {
    /// Create a client that will drain `outbound` into `addr`
    ///
    /// Cancelling `stop` ends reconnection attempts. While streaming, it closes
    /// the outbound buffer instead so the remaining readings are still sent
    /// before the stream is ended.
    pub fn new(
        addr: impl Into<String>,
        transport: T,
        outbound: BoundedBuffer<Reading>,
        stop: CancellationToken,
        observer: SharedObserver,
    ) -> Self {
        let (state, _) = watch::channel(ClientState::Disconnected);
        Self {
            addr: addr.into(),
            transport,
            outbound,
            retry_delay: DEFAULT_RETRY_DELAY,
            stop,
            state,
            metrics: Arc::new(ClientMetrics::new()),
            observer,
        }
    }

    /// Wait between connection attempts (default 1s)
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.state.subscribe()
    }

    pub fn metrics(&self) -> &Arc<ClientMetrics> {
        &self.metrics
    }

    /// Run until the buffer is drained or the stop token fires
    #[instrument(name = "transport_client_run", skip(self), fields(addr = %self.addr))]
    pub async fn run(mut self) -> ClientExit {
        info!("transport client started");

        let exit = loop {
            if self.stop.is_cancelled() {
                break ClientExit::Stopped;
            }

            self.set_state(ClientState::Connecting);
            if let Err(e) = self.transport.dial(&self.addr).await {
                self.metrics.record_dial_failure();
                self.observer.on_event(&PipelineEvent::DialFailed {
                    addr: self.addr.clone(),
                    error: e.to_string(),
                });
                self.disconnect_and_wait().await;
                continue;
            }

            if let Err(e) = self.transport.open_stream().await {
                self.metrics.record_open_failure();
                self.observer.on_event(&PipelineEvent::StreamOpenFailed {
                    addr: self.addr.clone(),
                    error: e.to_string(),
                });
                self.transport.close().await;
                self.disconnect_and_wait().await;
                continue;
            }

            self.metrics.record_connect();
            self.set_state(ClientState::Streaming);
            info!("stream open");

            match self.stream().await {
                Some(exit) => break exit,
                None => {
                    self.transport.close().await;
                    self.set_state(ClientState::Disconnected);
                }
            }
        };

        self.set_state(ClientState::Disconnected);
        info!(
            sent = self.metrics.sent(),
            send_failures = self.metrics.send_failures(),
            ?exit,
            "transport client exited"
        );
        exit
    }

    /// Drain the buffer into the open stream
    ///
    /// `None` means the connection broke and the caller should reconnect.
    async fn stream(&mut self) -> Option<ClientExit> {
        loop {
            let next = tokio::select! {
                biased;
                next = self.outbound.take() => next,
                _ = self.stop.cancelled(), if !self.outbound.is_closed() => {
                    debug!("stop requested while streaming, draining outbound buffer");
                    self.outbound.close();
                    continue;
                }
            };

            let Some(reading) = next else {
                return Some(self.finish().await);
            };

            if let Err(e) = self.transport.send(&reading).await {
                self.metrics.record_send_failure();
                self.observer.on_event(&PipelineEvent::SendFailed {
                    addr: self.addr.clone(),
                    error: e.to_string(),
                });
                return None;
            }
            self.metrics.record_sent();
        }
    }

    async fn finish(&mut self) -> ClientExit {
        let exit = match self.transport.finish().await {
            Ok(ack) => {
                self.observer.on_event(&PipelineEvent::StreamFinished {
                    addr: self.addr.clone(),
                    ok: ack.ok,
                    message: ack.message.clone(),
                });
                ClientExit::Finished(ack)
            }
            Err(e) => {
                warn!(error = %e, "ending the stream failed");
                ClientExit::FinishFailed(e.to_string())
            }
        };
        self.transport.close().await;
        exit
    }

    /// Back to `Disconnected`, then sleep the retry delay unless stopped
    async fn disconnect_and_wait(&mut self) {
        self.set_state(ClientState::Disconnected);
        tokio::select! {
            _ = self.stop.cancelled() => {}
            _ = tokio::time::sleep(self.retry_delay) => {}
        }
    }

    fn set_state(&self, next: ClientState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = ?prev, to = ?next, "client state");
        }
    }
}
