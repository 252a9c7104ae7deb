pub mod store;
pub mod worker;

pub use store::{JobStore, QueueCounts};
pub use worker::WorkerPool;

use rand::Rng;
use std::time::Duration;

/// Upper bound on the jitter added to a backoff delay, as a fraction of the
/// delay. Kept below 1.0 so a jittered delay never overtakes the next
/// attempt's doubled floor.
const JITTER_FRACTION: f64 = 0.1;

/// Retry behavior for failed sends.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay floor before retrying after `attempt` failures (attempt >= 1):
    /// base × 2^(attempt-1), capped at max_delay.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let delay = self.base_delay.saturating_mul(1u32 << shift);
        delay.min(self.max_delay)
    }

    /// [`backoff_delay`] plus up to 10% upward jitter, still capped at
    /// max_delay, so simultaneous failures do not retry in lockstep.
    ///
    /// [`backoff_delay`]: RetryPolicy::backoff_delay
    pub fn backoff_delay_jittered(&self, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        let jitter = delay.mul_f64(rand::rng().random_range(0.0..JITTER_FRACTION));
        delay.saturating_add(jitter).min(self.max_delay)
    }
}
