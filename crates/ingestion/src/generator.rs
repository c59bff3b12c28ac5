//! Reading generator
//!
//! One background task that emits a reading per tick into the outbound buffer.
//! Each loop iteration waits on three things: the stop signal, the frequency
//! mailbox and the tick. A full outbound buffer drops the reading.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use buffer::{BoundedBuffer, Offer};
use contracts::{PipelineEvent, Reading, SensorLabels, SharedObserver};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::error::{IngestionError, Result};
use crate::metrics::GeneratorMetrics;
use crate::rate::{RateController, FREQUENCY_MAILBOX};
use crate::simulator::{UniformSimulator, ValueSimulator};

/// Smallest tick period; shorter requests (including zero) are clamped to it
pub const MIN_TICK: Duration = Duration::from_millis(1);

/// Largest tick period; longer requests are clamped to it so the first
/// deadline stays representable
pub const MAX_TICK: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Generator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    Idle,
    Running,
    /// Terminal
    Stopped,
}

/// Periodic reading producer
pub struct ReadingGenerator {
    outbound: BoundedBuffer<Reading>,
    mailbox: BoundedBuffer<Duration>,
    initial_interval: Duration,
    simulator: Mutex<Option<Box<dyn ValueSimulator>>>,
    state: Arc<Mutex<GeneratorState>>,
    stop: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<GeneratorMetrics>,
    observer: SharedObserver,
}

impl ReadingGenerator {
    /// Create an idle generator feeding `outbound`
    pub fn new(
        outbound: BoundedBuffer<Reading>,
        initial_interval: Duration,
        observer: SharedObserver,
    ) -> Self {
        Self {
            outbound,
            mailbox: BoundedBuffer::new(FREQUENCY_MAILBOX, 1),
            initial_interval,
            simulator: Mutex::new(Some(Box::new(UniformSimulator::default()))),
            state: Arc::new(Mutex::new(GeneratorState::Idle)),
            stop: CancellationToken::new(),
            task: Mutex::new(None),
            metrics: Arc::new(GeneratorMetrics::new()),
            observer,
        }
    }

    /// Replace the value source (before `start`)
    pub fn with_simulator(self, simulator: impl ValueSimulator) -> Self {
        *lock(&self.simulator) = Some(Box::new(simulator));
        self
    }

    /// Handle for changing the cadence while running
    pub fn rate_controller(&self) -> RateController {
        RateController::new(self.mailbox.clone(), self.observer.clone())
    }

    pub fn state(&self) -> GeneratorState {
        *lock(&self.state)
    }

    pub fn metrics(&self) -> &Arc<GeneratorMetrics> {
        &self.metrics
    }

    /// Begin producing readings tagged with the given labels
    ///
    /// # Errors
    /// `AlreadyRunning` if started twice, `Stopped` after `stop()`.
    #[instrument(name = "generator_start", skip(self, sensor_type, id1, id2))]
    pub fn start(
        &self,
        sensor_type: impl Into<String>,
        id1: impl Into<String>,
        id2: impl Into<String>,
    ) -> Result<()> {
        let labels = SensorLabels::new(sensor_type, id1, id2);

        {
            let mut state = lock(&self.state);
            match *state {
                GeneratorState::Idle => *state = GeneratorState::Running,
                GeneratorState::Running => return Err(IngestionError::AlreadyRunning),
                GeneratorState::Stopped => return Err(IngestionError::Stopped),
            }
        }

        let simulator = lock(&self.simulator)
            .take()
            .unwrap_or_else(|| Box::new(UniformSimulator::default()));

        info!(
            sensor_type = %labels.sensor_type,
            id1 = %labels.id1,
            id2 = %labels.id2,
            interval_ms = self.initial_interval.as_millis() as u64,
            "generator started"
        );

        let task = GenerationLoop {
            labels,
            simulator,
            outbound: self.outbound.clone(),
            mailbox: self.mailbox.clone(),
            state: self.state.clone(),
            stop: self.stop.clone(),
            metrics: self.metrics.clone(),
            observer: self.observer.clone(),
        };
        let interval = self.initial_interval;
        *lock(&self.task) = Some(tokio::spawn(task.run(interval)));
        Ok(())
    }

    /// Stop producing; the generator cannot be restarted
    pub fn stop(&self) {
        let mut state = lock(&self.state);
        if *state != GeneratorState::Stopped {
            *state = GeneratorState::Stopped;
            self.stop.cancel();
            debug!("generator stop requested");
        }
    }

    /// Wait for the generation task to exit (after `stop`)
    pub async fn join(&self) {
        let task = lock(&self.task).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = ?e, "generator task panicked");
            }
        }
    }
}

impl Drop for ReadingGenerator {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// State owned by the spawned generation task
struct GenerationLoop {
    labels: SensorLabels,
    simulator: Box<dyn ValueSimulator>,
    outbound: BoundedBuffer<Reading>,
    mailbox: BoundedBuffer<Duration>,
    state: Arc<Mutex<GeneratorState>>,
    stop: CancellationToken,
    metrics: Arc<GeneratorMetrics>,
    observer: SharedObserver,
}

impl GenerationLoop {
    #[instrument(
        name = "generator_loop",
        skip(self, interval),
        fields(sensor_type = %self.labels.sensor_type, id1 = %self.labels.id1, id2 = %self.labels.id2)
    )]
    async fn run(mut self, interval: Duration) {
        let mut ticker = new_ticker(interval);

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                Some(next) = self.mailbox.take() => {
                    ticker = new_ticker(next);
                    self.metrics.record_frequency_change();
                    self.observer.on_event(&PipelineEvent::FrequencyChanged { interval: next });
                }
                _ = ticker.tick() => {
                    if !self.emit() {
                        break;
                    }
                }
            }
        }

        // the loop also ends on its own when the outbound buffer closes
        *lock(&self.state) = GeneratorState::Stopped;
        info!(produced = self.metrics.produced(), "generator stopped");
    }

    /// Produce one reading; returns false once the outbound buffer is closed
    fn emit(&mut self) -> bool {
        let reading = Reading::now(self.simulator.next_value(), &self.labels);
        self.metrics.record_produced();

        match self.outbound.offer(reading) {
            Offer::Accepted => {
                trace!("reading buffered");
                true
            }
            Offer::Dropped => {
                self.metrics.record_dropped();
                self.observer.on_event(&PipelineEvent::ReadingDropped {
                    buffer: self.outbound.name().to_string(),
                    capacity: self.outbound.capacity(),
                });
                true
            }
            Offer::Closed => {
                debug!("outbound buffer closed, generation ends");
                false
            }
        }
    }
}

/// Ticker whose first tick fires one full period from now
fn new_ticker(period: Duration) -> Interval {
    let period = period.clamp(MIN_TICK, MAX_TICK);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{NoopObserver, RecordingObserver};

    fn generator(capacity: usize, interval_ms: u64) -> (ReadingGenerator, BoundedBuffer<Reading>) {
        let outbound = BoundedBuffer::new("outbound", capacity);
        let generator = ReadingGenerator::new(
            outbound.clone(),
            Duration::from_millis(interval_ms),
            Arc::new(NoopObserver),
        );
        (generator, outbound)
    }

    fn drain(buffer: &BoundedBuffer<Reading>) -> Vec<Reading> {
        std::iter::from_fn(|| buffer.try_take()).collect()
    }

    #[tokio::test]
    async fn test_state_machine() {
        let (generator, _outbound) = generator(10, 50);
        assert_eq!(generator.state(), GeneratorState::Idle);

        generator.start("Temperature", "A", "1").unwrap();
        assert_eq!(generator.state(), GeneratorState::Running);
        assert!(matches!(
            generator.start("Temperature", "A", "1"),
            Err(IngestionError::AlreadyRunning)
        ));

        generator.stop();
        generator.join().await;
        assert_eq!(generator.state(), GeneratorState::Stopped);
        assert!(matches!(
            generator.start("Temperature", "A", "1"),
            Err(IngestionError::Stopped)
        ));
    }

    #[tokio::test]
    async fn test_readings_carry_labels() {
        let (generator, outbound) = generator(100, 10);
        generator.start("Temperature", "A", "1").unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        generator.stop();
        generator.join().await;

        let readings = drain(&outbound);
        assert!(readings.len() >= 5, "got {}", readings.len());
        for r in &readings {
            assert_eq!(r.sensor_type, "Temperature");
            assert_eq!(r.id1, "A");
            assert_eq!(r.id2, "1");
            assert!((0.0..100.0).contains(&r.value));
        }
    }

    #[tokio::test]
    async fn test_full_buffer_drops_newest() {
        let outbound = BoundedBuffer::new("outbound", 3);
        let observer = Arc::new(RecordingObserver::new());
        let mut n = 0.0;
        let generator = ReadingGenerator::new(
            outbound.clone(),
            Duration::from_millis(5),
            observer.clone(),
        )
        .with_simulator(move || {
            n += 1.0;
            n
        });
        generator.start("Temperature", "A", "1").unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(outbound.len() <= 3);
        generator.stop();
        generator.join().await;

        let values: Vec<f64> = drain(&outbound).iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert!(generator.metrics().dropped() > 0);
        assert_eq!(
            observer.count("reading_dropped") as u64,
            generator.metrics().dropped()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_frequency_change_resets_ticker() {
        let (generator, outbound) = generator(1000, 1000);
        let rate = generator.rate_controller();
        generator.start("Temperature", "A", "1").unwrap();

        // let the task register its first timer
        tokio::task::yield_now().await;
        rate.update_frequency(Duration::from_millis(100));
        tokio::task::yield_now().await;

        tokio::time::sleep(Duration::from_millis(550)).await;
        generator.stop();
        generator.join().await;

        // 100ms cadence from the moment of the change, not the initial 1s
        let produced = drain(&outbound).len();
        assert_eq!(produced, 5, "got {produced}");
        assert_eq!(generator.metrics().frequency_changes(), 1);
    }

    #[tokio::test]
    async fn test_stop_before_start_is_terminal() {
        let (generator, outbound) = generator(10, 10);
        generator.stop();
        assert_eq!(generator.state(), GeneratorState::Stopped);
        assert!(generator.start("Temperature", "A", "1").is_err());
        generator.join().await;
        assert!(outbound.is_empty());
    }

    #[tokio::test]
    async fn test_closed_outbound_ends_generation() {
        let (generator, outbound) = generator(10, 5);
        outbound.close();
        generator.start("Temperature", "A", "1").unwrap();

        tokio::time::timeout(Duration::from_secs(1), generator.join())
            .await
            .expect("generator should exit once the buffer is closed");

        assert_eq!(generator.state(), GeneratorState::Stopped);
        assert!(matches!(
            generator.start("Temperature", "A", "1"),
            Err(IngestionError::Stopped)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_is_clamped() {
        let (generator, outbound) = generator(1000, 10);
        let rate = generator.rate_controller();
        generator.start("Temperature", "A", "1").unwrap();
        tokio::task::yield_now().await;

        rate.update_frequency(Duration::MAX);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(generator.metrics().frequency_changes(), 1);
        drain(&outbound);

        // the task survived the huge period and still takes commands
        rate.update_frequency(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(105)).await;
        assert_eq!(generator.state(), GeneratorState::Running);

        generator.stop();
        generator.join().await;

        assert_eq!(generator.metrics().frequency_changes(), 2);
        let produced = drain(&outbound).len();
        assert!(produced >= 9, "got {produced}");
    }
}
