use backoff::backoff::Backoff;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Retry settings for `ensure_ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessConfig {
    /// Total initialization attempts, including the first.
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl ReadinessConfig {
    pub(crate) fn backoff(&self) -> FixedRetry {
        FixedRetry::new(self.retry_delay, self.max_attempts)
    }
}

/// Flat delay between attempts, giving up once `max_attempts` have failed.
#[derive(Debug, Clone)]
pub struct FixedRetry {
    interval: Duration,
    max_attempts: u32,
    failures: u32,
}

impl FixedRetry {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            failures: 0,
        }
    }
}

impl Backoff for FixedRetry {
    fn next_backoff(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= self.max_attempts {
            None
        } else {
            Some(self.interval)
        }
    }

    fn reset(&mut self) {
        self.failures = 0;
    }
}
