//! Value simulators
//!
//! The generator asks a `ValueSimulator` for each measurement, so the
//! synthetic source can be swapped for a real one or a fixed sequence in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of measurement values
pub trait ValueSimulator: Send + 'static {
    fn next_value(&mut self) -> f64;
}

impl<F> ValueSimulator for F
where
    F: FnMut() -> f64 + Send + 'static,
{
    fn next_value(&mut self) -> f64 {
        self()
    }
}

/// Uniformly distributed values in `[low, high)`
#[derive(Debug, Clone)]
pub struct UniformSimulator {
    low: f64,
    high: f64,
    rng: StdRng,
}

impl UniformSimulator {
    /// # Panics
    /// Panics if `low >= high`.
    pub fn new(low: f64, high: f64) -> Self {
        assert!(low < high, "empty value range [{low}, {high})");
        Self {
            low,
            high,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sequence for reproducible runs
    pub fn seeded(low: f64, high: f64, seed: u64) -> Self {
        assert!(low < high, "empty value range [{low}, {high})");
        Self {
            low,
            high,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformSimulator {
    /// Reference behavior: uniform in `[0, 100)`
    fn default() -> Self {
        Self::new(0.0, 100.0)
    }
}

impl ValueSimulator for UniformSimulator {
    fn next_value(&mut self) -> f64 {
        self.rng.random_range(self.low..self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_stays_in_range() {
        let mut sim = UniformSimulator::default();
        for _ in 0..1000 {
            let v = sim.next_value();
            assert!((0.0..100.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = UniformSimulator::seeded(0.0, 100.0, 42);
        let mut b = UniformSimulator::seeded(0.0, 100.0, 42);
        for _ in 0..10 {
            assert_eq!(a.next_value(), b.next_value());
        }
    }

    #[test]
    fn test_closure_simulator() {
        let mut n = 0.0;
        let mut sim = move || {
            n += 1.0;
            n
        };
        assert_eq!(ValueSimulator::next_value(&mut sim), 1.0);
        assert_eq!(ValueSimulator::next_value(&mut sim), 2.0);
    }
}
