//! WorkerPool - N workers draining the inbound buffer into a repository

use std::sync::Arc;

use buffer::BoundedBuffer;
use contracts::{PipelineEvent, Reading, ReadingRepository, SharedObserver};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, trace};

use crate::error::{PersistenceError, Result};
use crate::metrics::PoolMetrics;

/// Fixed-size set of persistence workers
pub struct WorkerPool {
    inbound: BoundedBuffer<Reading>,
    worker_count: usize,
    workers: Mutex<JoinSet<()>>,
    metrics: Arc<PoolMetrics>,
}

impl WorkerPool {
    /// Launch `worker_count` workers taking from `inbound`
    ///
    /// Must be called inside a Tokio runtime.
    #[instrument(
        name = "worker_pool_start",
        skip(repository, inbound, observer),
        fields(repository = %repository.name())
    )]
    pub fn start<R>(
        repository: Arc<R>,
        worker_count: usize,
        inbound: BoundedBuffer<Reading>,
        observer: SharedObserver,
    ) -> Result<Self>
    where
        R: ReadingRepository + Sync + 'static,
    {
        if worker_count == 0 {
            return Err(PersistenceError::NoWorkers);
        }

        let metrics = Arc::new(PoolMetrics::new());
        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            workers.spawn(worker(
                id,
                repository.clone(),
                inbound.clone(),
                metrics.clone(),
                observer.clone(),
            ));
        }
        info!(workers = worker_count, "worker pool started");

        Ok(Self {
            inbound,
            worker_count,
            workers: Mutex::new(workers),
            metrics,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Readings taken by a worker and not yet saved
    pub fn in_flight(&self) -> usize {
        self.metrics.in_flight()
    }

    pub fn metrics(&self) -> &Arc<PoolMetrics> {
        &self.metrics
    }

    /// Close the inbound buffer and wait for every worker to drain and exit
    ///
    /// Idempotent. Concurrent callers all return only once the workers are gone.
    #[instrument(name = "worker_pool_stop", skip(self))]
    pub async fn stop(&self) {
        if self.inbound.close() {
            debug!(pending = self.inbound.len(), "inbound closed, draining");
        }

        let mut workers = self.workers.lock().await;
        while let Some(done) = workers.join_next().await {
            if let Err(e) = done {
                error!(error = ?e, "worker task panicked");
            }
        }

        info!(
            saved = self.metrics.saved(),
            failed = self.metrics.failed(),
            "worker pool stopped"
        );
    }

    /// Abandon the workers, losing whatever they still hold
    pub async fn abort(&self) {
        self.inbound.close();
        self.workers.lock().await.abort_all();
        debug!(in_flight = self.metrics.in_flight(), "worker pool aborted");
    }
}

/// take → save → report failures, until the buffer is closed and empty
#[instrument(name = "persistence_worker", skip_all, fields(worker = id))]
async fn worker<R>(
    id: usize,
    repository: Arc<R>,
    inbound: BoundedBuffer<Reading>,
    metrics: Arc<PoolMetrics>,
    observer: SharedObserver,
) where
    R: ReadingRepository + Sync,
{
    trace!("worker started");

    while let Some(reading) = inbound.take().await {
        metrics.begin();
        match repository.save(&reading).await {
            Ok(()) => metrics.record_saved(),
            Err(e) => {
                metrics.record_failed();
                observer.on_event(&PipelineEvent::PersistFailed {
                    repository: repository.name().to_string(),
                    error: e.to_string(),
                });
            }
        }
        metrics.end();
    }

    trace!("worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryRepository;
    use contracts::{ContractError, NoopObserver, RecordingObserver, SensorLabels};
    use std::time::Duration;

    fn reading(value: f64) -> Reading {
        Reading::now(value, &SensorLabels::new("Temperature", "A", "1"))
    }

    /// Fails every reading with a negative value
    struct RejectNegative;

    impl ReadingRepository for RejectNegative {
        fn name(&self) -> &str {
            "reject_negative"
        }

        async fn save(&self, reading: &Reading) -> std::result::Result<(), ContractError> {
            if reading.value < 0.0 {
                Err(ContractError::repository_save("reject_negative", "negative value"))
            } else {
                Ok(())
            }
        }
    }

    /// Slow repository to keep workers busy
    struct Slow(MemoryRepository);

    impl ReadingRepository for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn save(&self, reading: &Reading) -> std::result::Result<(), ContractError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.0.save(reading).await
        }
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let inbound = BoundedBuffer::new("inbound", 10);
        let result = WorkerPool::start(
            Arc::new(MemoryRepository::new()),
            0,
            inbound,
            Arc::new(NoopObserver),
        );
        assert!(matches!(result, Err(PersistenceError::NoWorkers)));
    }

    #[tokio::test]
    async fn test_stop_drains_everything() {
        let repo = Arc::new(MemoryRepository::new());
        let inbound = BoundedBuffer::new("inbound", 1000);
        for i in 0..500 {
            inbound.offer(reading(i as f64));
        }

        let pool = WorkerPool::start(repo.clone(), 10, inbound.clone(), Arc::new(NoopObserver))
            .unwrap();
        pool.stop().await;

        assert_eq!(repo.len(), 500);
        assert_eq!(pool.metrics().saved(), 500);
        assert_eq!(pool.in_flight(), 0);
        assert!(inbound.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_reported_and_workers_continue() {
        let observer = Arc::new(RecordingObserver::new());
        let inbound = BoundedBuffer::new("inbound", 100);
        for v in [1.0, -1.0, 2.0, -2.0, 3.0] {
            inbound.offer(reading(v));
        }

        let pool =
            WorkerPool::start(Arc::new(RejectNegative), 2, inbound, observer.clone()).unwrap();
        pool.stop().await;

        // every enqueued reading is either saved or reported
        assert_eq!(pool.metrics().saved(), 3);
        assert_eq!(pool.metrics().failed(), 2);
        assert_eq!(observer.count("persist_failed"), 2);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_concurrent() {
        let repo = Arc::new(Slow(MemoryRepository::new()));
        let inbound = BoundedBuffer::new("inbound", 100);
        for i in 0..20 {
            inbound.offer(reading(i as f64));
        }
        let pool = Arc::new(
            WorkerPool::start(repo.clone(), 4, inbound, Arc::new(NoopObserver)).unwrap(),
        );

        let a = tokio::spawn({
            let pool = pool.clone();
            async move { pool.stop().await }
        });
        let b = tokio::spawn({
            let pool = pool.clone();
            async move { pool.stop().await }
        });
        a.await.unwrap();
        // whichever caller finishes, the workers are gone
        assert_eq!(repo.0.len(), 20);
        b.await.unwrap();
        assert_eq!(repo.0.len(), 20);

        pool.stop().await;
        assert_eq!(pool.metrics().saved(), 20);
    }

    #[tokio::test]
    async fn test_workers_process_concurrently() {
        let repo = Arc::new(Slow(MemoryRepository::new()));
        let inbound = BoundedBuffer::new("inbound", 100);
        for i in 0..10 {
            inbound.offer(reading(i as f64));
        }

        let started = tokio::time::Instant::now();
        let pool = WorkerPool::start(repo.clone(), 10, inbound, Arc::new(NoopObserver)).unwrap();
        pool.stop().await;

        // 10 x 20ms sequentially would take 200ms
        assert!(started.elapsed() < Duration::from_millis(150));
        assert_eq!(repo.0.len(), 10);
    }
}
