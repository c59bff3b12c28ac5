//! BoundedBuffer - lossy bounded FIFO between a producer and a consumer
//!
//! `offer` never blocks: on a full buffer the newest item is discarded and
//! counted. `take` waits for an item and yields `None` once the buffer is
//! closed and drained. Safe for any number of concurrent producers/consumers.

use std::fmt;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use metrics::gauge;
use tracing::trace;

use crate::error::BufferError;
use crate::metrics::BufferMetrics;

/// Result of a non-blocking offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Item was enqueued
    Accepted,
    /// Buffer was full; the item was discarded
    Dropped,
    /// Buffer was closed; the item was discarded
    Closed,
}

impl Offer {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Bounded drop-on-full queue
///
/// Cloning yields another handle to the same queue.
pub struct BoundedBuffer<T> {
    name: Arc<str>,
    capacity: usize,
    tx: Sender<T>,
    rx: Receiver<T>,
    metrics: Arc<BufferMetrics>,
}

impl<T> BoundedBuffer<T> {
    /// Create a buffer holding at most `capacity` items
    ///
    /// For fixed capacities; sizes that come from configuration go through
    /// [`BoundedBuffer::try_new`].
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        match Self::try_new(name, capacity) {
            Ok(buffer) => buffer,
            Err(e) => panic!("{e}"),
        }
    }

    /// Create a buffer holding at most `capacity` items
    ///
    /// # Errors
    /// `BufferError::ZeroCapacity` if `capacity` is zero.
    pub fn try_new(name: impl Into<String>, capacity: usize) -> Result<Self, BufferError> {
        let name = name.into();
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity { name });
        }
        let (tx, rx) = bounded(capacity);
        Ok(Self {
            name: Arc::from(name),
            capacity,
            tx,
            rx,
            metrics: Arc::new(BufferMetrics::new()),
        })
    }

    /// Buffer name (used for logging/metrics)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn metrics(&self) -> &Arc<BufferMetrics> {
        &self.metrics
    }

    /// Enqueue without waiting
    pub fn offer(&self, item: T) -> Offer {
        match self.tx.try_send(item) {
            Ok(()) => {
                self.metrics.record_accepted();
                self.update_depth();
                Offer::Accepted
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.record_dropped();
                trace!(buffer = %self.name, capacity = self.capacity, "buffer full, item dropped");
                Offer::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                trace!(buffer = %self.name, "buffer closed, item discarded");
                Offer::Closed
            }
        }
    }

    /// Wait for the next item
    ///
    /// Returns `None` only when the buffer is closed and empty.
    pub async fn take(&self) -> Option<T> {
        let item = self.rx.recv().await.ok()?;
        self.metrics.record_taken();
        self.update_depth();
        Some(item)
    }

    /// Take an item if one is immediately available
    pub fn try_take(&self) -> Option<T> {
        let item = self.rx.try_recv().ok()?;
        self.metrics.record_taken();
        self.update_depth();
        Some(item)
    }

    /// Close the buffer for new items
    ///
    /// Items already enqueued can still be taken. Returns `true` if this call
    /// closed the buffer, `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    fn update_depth(&self) {
        gauge!("sensor_relay_buffer_depth", "buffer" => self.name.to_string())
            .set(self.rx.len() as f64);
    }
}

impl<T> Clone for BoundedBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            capacity: self.capacity,
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<T> fmt::Debug for BoundedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedBuffer")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_offer_never_exceeds_capacity() {
        let buffer = BoundedBuffer::new("outbound", 3);

        let outcomes: Vec<Offer> = (0..10).map(|i| buffer.offer(i)).collect();

        assert_eq!(outcomes.iter().filter(|o| o.is_accepted()).count(), 3);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.metrics().dropped(), 7);
        // the oldest items survive, the newest are discarded
        assert_eq!(buffer.try_take(), Some(0));
        assert_eq!(buffer.try_take(), Some(1));
        assert_eq!(buffer.try_take(), Some(2));
        assert_eq!(buffer.try_take(), None);
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let buffer = BoundedBuffer::new("inbound", 4);
        buffer.offer("a");
        buffer.offer("b");

        assert!(buffer.close());
        assert!(!buffer.close(), "second close is a no-op");
        assert_eq!(buffer.offer("c"), Offer::Closed);

        assert_eq!(buffer.take().await, Some("a"));
        assert_eq!(buffer.take().await, Some("b"));
        assert_eq!(buffer.take().await, None);
    }

    #[tokio::test]
    async fn test_take_waits_for_item() {
        let buffer = BoundedBuffer::new("inbound", 1);
        let consumer = buffer.clone();

        let handle = tokio::spawn(async move { consumer.take().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        buffer.offer(7u32);
        let taken = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(taken, Some(7));
    }

    #[tokio::test]
    async fn test_multiple_consumers_share_items() {
        let buffer = BoundedBuffer::new("inbound", 100);
        for i in 0..100u32 {
            buffer.offer(i);
        }
        buffer.close();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let consumer = buffer.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(item) = consumer.take().await {
                    seen.push(item);
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
        assert_eq!(buffer.metrics().taken(), 100);
    }

    #[test]
    fn test_zero_capacity_is_an_error() {
        let result = BoundedBuffer::<u8>::try_new("outbound", 0);
        assert_eq!(
            result.err(),
            Some(BufferError::ZeroCapacity {
                name: "outbound".to_string()
            })
        );
        assert_eq!(BoundedBuffer::<u8>::try_new("outbound", 1).unwrap().capacity(), 1);
    }

    #[test]
    #[should_panic(expected = "capacity of at least 1")]
    fn test_zero_capacity_panics_in_new() {
        let _ = BoundedBuffer::<u8>::new("bad", 0);
    }
}
