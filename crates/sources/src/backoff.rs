//! Exponential backoff with full jitter
//!
//! The ceiling doubles on every failure, starting at `initial` and capped at
//! `max`. Each delay is drawn uniformly from `[0, ceiling]`.

use std::time::Duration;

use rand::Rng;

use crate::settings::BackoffSettings;

/// Delay generator for one supervising loop
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    /// Create a backoff from settings
    pub fn new(settings: &BackoffSettings) -> Self {
        Self {
            initial: settings.initial,
            max: settings.max.max(settings.initial),
            attempt: 0,
        }
    }

    /// Current delay ceiling
    pub fn ceiling(&self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Failures since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Next delay, drawn from the thread-local generator
    pub fn next_delay(&mut self) -> Duration {
        self.next_delay_with(&mut rand::thread_rng())
    }

    /// Next delay, drawn from `rng`
    pub fn next_delay_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let ceiling = self.ceiling();
        self.attempt = self.attempt.saturating_add(1);

        let nanos = u64::try_from(ceiling.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(rng.gen_range(0..=nanos))
    }

    /// Forget previous failures
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn backoff(initial_ms: u64, max_ms: u64) -> Backoff {
        Backoff::new(&BackoffSettings {
            initial: Duration::from_millis(initial_ms),
            max: Duration::from_millis(max_ms),
        })
    }

    #[test]
    fn test_ceiling_grows_exponentially() {
        let mut backoff = backoff(100, 10_000);
        let mut rng = StdRng::seed_from_u64(7);

        let mut ceilings = Vec::new();
        for _ in 0..5 {
            ceilings.push(backoff.ceiling());
            backoff.next_delay_with(&mut rng);
        }

        assert_eq!(
            ceilings,
            [100, 200, 400, 800, 1600].map(Duration::from_millis).to_vec()
        );
    }

    #[test]
    fn test_delay_never_exceeds_max() {
        let mut backoff = backoff(100, 1_000);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let delay = backoff.next_delay_with(&mut rng);
            assert!(delay <= Duration::from_secs(1), "{delay:?} exceeds max");
        }
        assert_eq!(backoff.ceiling(), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_within_current_ceiling() {
        let mut backoff = backoff(100, 10_000);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..10 {
            let ceiling = backoff.ceiling();
            assert!(backoff.next_delay_with(&mut rng) <= ceiling);
        }
    }

    #[test]
    fn test_reset() {
        let mut backoff = backoff(100, 10_000);
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.ceiling(), Duration::from_millis(100));
    }

    #[test]
    fn test_huge_attempt_count_saturates() {
        let mut backoff = backoff(100, 10_000);
        for _ in 0..100 {
            backoff.next_delay();
        }
        assert_eq!(backoff.ceiling(), Duration::from_secs(10));
    }
}
