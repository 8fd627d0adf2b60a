use crate::constants::{DEFAULT_EMBED_TIMEOUTS_SECS, DEFAULT_RETRY_PAUSE_MS};
use std::time::Duration;

/// Declarative retry schedule for provider calls.
///
/// Carries one timeout per attempt (the timeout escalates as attempts burn
/// down) and a fixed pause between attempts. The same policy object is shared
/// by the embedding generator and the answer path so both retry identically.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    timeouts: Vec<Duration>,
    pause: Duration,
}

impl RetryPolicy {
    /// Build a policy from an explicit timeout schedule. An empty schedule is
    /// promoted to a single 30s attempt so a misconfigured policy still makes
    /// progress.
    pub fn new(timeouts: Vec<Duration>, pause: Duration) -> Self {
        let timeouts = if timeouts.is_empty() {
            vec![Duration::from_secs(30)]
        } else {
            timeouts
        };
        Self { timeouts, pause }
    }

    pub fn from_secs(timeouts_secs: &[u64], pause_ms: u64) -> Self {
        Self::new(
            timeouts_secs.iter().map(|s| Duration::from_secs(*s)).collect(),
            Duration::from_millis(pause_ms),
        )
    }

    /// Total number of attempts, including the first.
    pub fn attempts(&self) -> usize {
        self.timeouts.len()
    }

    /// Timeout for the given zero-based attempt; attempts past the end of the
    /// schedule reuse the last (largest) timeout.
    pub fn timeout_for(&self, attempt: usize) -> Duration {
        self.timeouts[attempt.min(self.timeouts.len() - 1)]
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    pub fn is_last_attempt(&self, attempt: usize) -> bool {
        attempt + 1 >= self.attempts()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_secs(DEFAULT_EMBED_TIMEOUTS_SECS, DEFAULT_RETRY_PAUSE_MS)
    }
}
