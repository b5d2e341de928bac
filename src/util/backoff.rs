use std::time::Duration;

use rand::Rng;

pub const RANDOM_FACTOR: f64 = 0.5;

/// Exponential delay used by polling listeners after consecutive failures.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub interval: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl BackoffConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Delay before the next attempt after `failures` consecutive errors.
    /// Zero failures means the plain polling interval.
    pub fn delay_after(&self, failures: u32) -> Duration {
        self.delay_with_rng(failures, &mut rand::thread_rng())
    }

    fn delay_with_rng<R: Rng + ?Sized>(&self, failures: u32, rng: &mut R) -> Duration {
        if failures == 0 {
            return self.interval;
        }
        let base = self.interval.as_millis() as f64 * self.backoff_factor.powi(failures as i32);
        let jitter = RANDOM_FACTOR * base * rng.gen_range(-1.0..=1.0);
        let millis = (base + jitter)
            .round()
            .clamp(0.0, self.max_delay.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5 * 60),
        }
    }
}
