//! Ingress server
//!
//! Accepts `SendSensorData` streams and feeds every decoded reading into the
//! inbound buffer. Sessions are independent tasks; a failing session never
//! affects the accept loop or its siblings.
//!
//! Accept errors (for example file descriptor exhaustion) back off before the
//! next attempt: 5 ms, doubling per consecutive failure, capped at 1 s.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use buffer::{BoundedBuffer, Offer};
use contracts::{Ack, PipelineEvent, Reading, SharedObserver};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::codec::{ClientMessage, ServerCodec, ServerMessage, SEND_SENSOR_DATA};
use crate::error::{Result, TransportError};
use crate::metrics::IngressMetrics;

/// Bound ingress listener
pub struct IngressServer {
    listener: TcpListener,
    inbound: BoundedBuffer<Reading>,
    metrics: Arc<IngressMetrics>,
    observer: SharedObserver,
}

impl IngressServer {
    /// Bind the listener
    ///
    /// # Errors
    /// `TransportError::Bind` if the address is unavailable. This is the only
    /// fatal transport error.
    #[instrument(name = "ingress_bind", skip(inbound, observer))]
    pub async fn bind(
        addr: &str,
        inbound: BoundedBuffer<Reading>,
        observer: SharedObserver,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!(addr = %listener.local_addr()?, "ingress listening");

        Ok(Self {
            listener,
            inbound,
            metrics: Arc::new(IngressMetrics::new()),
            observer,
        })
    }

    /// Actual bound address (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn metrics(&self) -> &Arc<IngressMetrics> {
        &self.metrics
    }

    /// Accept sessions until `cancel` fires
    ///
    /// Cancelling also forces every open session to close. Returns after all
    /// session tasks have finished.
    #[instrument(name = "ingress_serve", skip_all)]
    pub async fn serve(self, cancel: CancellationToken) {
        let mut sessions = JoinSet::new();
        let mut backoff = AcceptBackoff::default();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        backoff.reset();
                        let session = Session {
                            peer,
                            inbound: self.inbound.clone(),
                            metrics: self.metrics.clone(),
                            observer: self.observer.clone(),
                            cancel: cancel.child_token(),
                        };
                        sessions.spawn(session.run(stream));
                    }
                    Err(e) => {
                        let delay = backoff.next_delay();
                        warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "accept failed");
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                },
                Some(done) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = done {
                        warn!(error = ?e, "session task panicked");
                    }
                }
            }
        }

        debug!(open_sessions = sessions.len(), "ingress stopping");
        while let Some(done) = sessions.join_next().await {
            if let Err(e) = done {
                warn!(error = ?e, "session task panicked");
            }
        }
        info!(
            received = self.metrics.received(),
            sessions = self.metrics.sessions_opened(),
            "ingress stopped"
        );
    }
}

/// Delay between failed accepts
#[derive(Debug, Default)]
struct AcceptBackoff {
    current: Option<Duration>,
}

impl AcceptBackoff {
    const INITIAL: Duration = Duration::from_millis(5);
    const MAX: Duration = Duration::from_secs(1);

    fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => Self::INITIAL,
            Some(prev) => (prev * 2).min(Self::MAX),
        };
        self.current = Some(delay);
        delay
    }

    fn reset(&mut self) {
        self.current = None;
    }
}

/// One accepted connection
struct Session {
    peer: SocketAddr,
    inbound: BoundedBuffer<Reading>,
    metrics: Arc<IngressMetrics>,
    observer: SharedObserver,
    cancel: CancellationToken,
}

impl Session {
    #[instrument(name = "ingress_session", skip(self, stream), fields(peer = %self.peer))]
    async fn run(self, stream: TcpStream) {
        let mut framed = Framed::new(stream, ServerCodec::new());
        let peer = self.peer.to_string();

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionError::Cancelled),
            outcome = self.handle(&mut framed) => outcome,
        };

        match outcome {
            Ok(received) => {
                self.metrics.record_session_ended();
                self.observer
                    .on_event(&PipelineEvent::SessionEnded { peer, received });
            }
            Err(SessionError::Rejected) => {}
            Err(e) => {
                self.metrics.record_session_failed();
                self.observer.on_event(&PipelineEvent::SessionFailed {
                    peer,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Handshake then receive until `End`; returns the number of readings
    async fn handle(
        &self,
        framed: &mut Framed<TcpStream, ServerCodec>,
    ) -> std::result::Result<u64, SessionError> {
        match framed.next().await {
            Some(Ok(ClientMessage::Open { method })) if method == SEND_SENSOR_DATA => {
                framed.send(ServerMessage::Ready).await?;
            }
            Some(Ok(ClientMessage::Open { method })) => {
                debug!(%method, "unknown method");
                framed
                    .send(ServerMessage::Rejected {
                        reason: format!("unknown method {method}"),
                    })
                    .await?;
                return Err(SessionError::Rejected);
            }
            Some(Ok(other)) => return Err(TransportError::unexpected("Open", other).into()),
            Some(Err(e)) => return Err(e.into()),
            None => return Err(TransportError::ConnectionClosed.into()),
        }

        self.metrics.record_session_opened();
        self.observer.on_event(&PipelineEvent::SessionOpened {
            peer: self.peer.to_string(),
        });

        let mut received = 0u64;
        loop {
            match framed.next().await {
                Some(Ok(ClientMessage::Reading(reading))) => {
                    received += 1;
                    self.metrics.record_received();
                    self.accept(reading);
                }
                Some(Ok(ClientMessage::End)) => {
                    framed.send(ServerMessage::Ack(Ack::received_all())).await?;
                    let _ = framed.close().await;
                    debug!(received, "stream ended");
                    return Ok(received);
                }
                Some(Ok(other)) => {
                    return Err(TransportError::unexpected("Reading or End", other).into())
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(TransportError::ConnectionClosed.into()),
            }
        }
    }

    fn accept(&self, reading: Reading) {
        match self.inbound.offer(reading) {
            Offer::Accepted => {}
            Offer::Dropped | Offer::Closed => {
                self.metrics.record_dropped();
                self.observer.on_event(&PipelineEvent::ReadingDropped {
                    buffer: self.inbound.name().to_string(),
                    capacity: self.inbound.capacity(),
                });
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("unknown method, stream rejected")]
    Rejected,

    #[error("ingress shutting down")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{StreamTransport, TcpTransport};
    use crate::codec::ClientCodec;
    use contracts::{RecordingObserver, SensorLabels};
    use std::time::Duration;

    async fn start(
        capacity: usize,
    ) -> (
        SocketAddr,
        BoundedBuffer<Reading>,
        Arc<RecordingObserver>,
        CancellationToken,
        tokio::task::JoinHandle<()>,
    ) {
        let inbound = BoundedBuffer::new("inbound", capacity);
        let observer = Arc::new(RecordingObserver::new());
        let server = IngressServer::bind("127.0.0.1:0", inbound.clone(), observer.clone())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(server.serve(cancel.clone()));
        (addr, inbound, observer, cancel, handle)
    }

    fn reading(value: f64) -> Reading {
        Reading::now(value, &SensorLabels::new("Temperature", "A", "1"))
    }

    async fn wait_for_len(buffer: &BoundedBuffer<Reading>, len: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while buffer.len() < len {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("readings did not arrive");
    }

    #[tokio::test]
    async fn test_session_receives_and_acks() {
        let (addr, inbound, observer, cancel, handle) = start(100).await;

        let mut transport = TcpTransport::new();
        transport.dial(&addr.to_string()).await.unwrap();
        transport.open_stream().await.unwrap();
        for v in [1.0, 2.0, 3.0] {
            transport.send(&reading(v)).await.unwrap();
        }
        let ack = transport.finish().await.unwrap();
        transport.close().await;

        assert_eq!(ack, Ack::received_all());
        let values: Vec<f64> = std::iter::from_fn(|| inbound.try_take())
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(observer.count("session_opened"), 1);
        assert_eq!(observer.count("session_ended"), 1);
        assert_eq!(observer.count("session_failed"), 0);
    }

    #[tokio::test]
    async fn test_overflow_drops_with_event() {
        let (addr, inbound, observer, cancel, handle) = start(2).await;

        let mut transport = TcpTransport::new();
        transport.dial(&addr.to_string()).await.unwrap();
        transport.open_stream().await.unwrap();
        for v in 0..5 {
            transport.send(&reading(v as f64)).await.unwrap();
        }
        transport.finish().await.unwrap();

        assert_eq!(inbound.len(), 2);
        assert_eq!(observer.count("reading_dropped"), 3);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_method_is_rejected() {
        let (addr, _inbound, _observer, cancel, handle) = start(10).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut framed = Framed::new(stream, ClientCodec::new());
        framed
            .send(ClientMessage::Open {
                method: "Subscribe".to_string(),
            })
            .await
            .unwrap();
        let reply = framed.next().await.unwrap().unwrap();
        assert!(matches!(reply, ServerMessage::Rejected { .. }));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_abrupt_disconnect_fails_only_that_session() {
        let (addr, inbound, observer, cancel, handle) = start(100).await;

        let mut broken = TcpTransport::new();
        broken.dial(&addr.to_string()).await.unwrap();
        broken.open_stream().await.unwrap();
        broken.send(&reading(1.0)).await.unwrap();
        drop(broken);

        let mut healthy = TcpTransport::new();
        healthy.dial(&addr.to_string()).await.unwrap();
        healthy.open_stream().await.unwrap();
        healthy.send(&reading(2.0)).await.unwrap();
        assert!(healthy.finish().await.unwrap().ok);

        wait_for_len(&inbound, 2).await;
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(observer.count("session_failed"), 1);
        assert_eq!(observer.count("session_ended"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_sessions() {
        let (addr, inbound, observer, cancel, handle) = start(1000).await;

        let mut producers = JoinSet::new();
        for p in 0..4 {
            let addr = addr.to_string();
            producers.spawn(async move {
                let mut t = TcpTransport::new();
                t.dial(&addr).await.unwrap();
                t.open_stream().await.unwrap();
                for i in 0..25 {
                    t.send(&reading((p * 100 + i) as f64)).await.unwrap();
                }
                t.finish().await.unwrap()
            });
        }
        while let Some(ack) = producers.join_next().await {
            assert!(ack.unwrap().ok);
        }

        assert_eq!(inbound.len(), 100);
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(observer.count("session_ended"), 4);
    }

    #[tokio::test]
    async fn test_cancel_forces_open_sessions_closed() {
        let (addr, _inbound, observer, cancel, handle) = start(10).await;

        let mut idle = TcpTransport::new();
        idle.dial(&addr.to_string()).await.unwrap();
        idle.open_stream().await.unwrap();

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("serve should return once sessions are closed")
            .unwrap();
        assert_eq!(observer.count("session_failed"), 1);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_fatal() {
        let (addr, inbound, observer, cancel, handle) = start(10).await;
        let second = IngressServer::bind(&addr.to_string(), inbound, observer).await;
        assert!(matches!(second, Err(TransportError::Bind { .. })));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn test_accept_backoff_doubles_up_to_cap() {
        let mut backoff = AcceptBackoff::default();
        let delays: Vec<u64> = (0..10)
            .map(|_| backoff.next_delay().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 80, 160, 320, 640, 1000, 1000]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(5));
    }
}
