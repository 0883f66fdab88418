//! Reconciler configuration from environment variables.

use std::env;
use std::time::Duration;

/// Fixed-interval polling bounded by wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each probe
    pub interval: Duration,
    /// Total time budget, measured from the start of the wait
    pub timeout: Duration,
}

/// Fixed-delay retry bounded by attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before each attempt
    pub delay: Duration,
    /// Number of attempts
    pub attempts: u32,
}

/// Wait bounds used by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Scheduler polling for Instance/Function creation
    pub allocation_poll: PollPolicy,

    /// Index lookups after a volume upload
    pub index_lookup: RetryPolicy,

    /// When set, Volume Create also waits for the STORE message to be confirmed
    pub confirmation: Option<PollPolicy>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            allocation_poll: PollPolicy {
                interval: Duration::from_secs(10),
                timeout: Duration::from_secs(1800),
            },
            index_lookup: RetryPolicy {
                delay: Duration::from_secs(5),
                attempts: 12,
            },
            confirmation: None,
        }
    }
}

impl ReconcilerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TS_ALLOCATION_POLL_SECS`: Scheduler poll interval (default: 10)
    /// - `TS_ALLOCATION_TIMEOUT_SECS`: Scheduler wait budget (default: 1800)
    /// - `TS_INDEX_RETRY_DELAY_SECS`: Delay between index lookups (default: 5)
    /// - `TS_INDEX_RETRY_ATTEMPTS`: Index lookup attempts (default: 12)
    /// - `TS_CONFIRMATION_TIMEOUT_SECS`: Enables confirmation waits with this budget
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let allocation_poll = PollPolicy {
            interval: env_secs("TS_ALLOCATION_POLL_SECS").unwrap_or(defaults.allocation_poll.interval),
            timeout: env_secs("TS_ALLOCATION_TIMEOUT_SECS")
                .unwrap_or(defaults.allocation_poll.timeout),
        };

        let index_lookup = RetryPolicy {
            delay: env_secs("TS_INDEX_RETRY_DELAY_SECS").unwrap_or(defaults.index_lookup.delay),
            attempts: env::var("TS_INDEX_RETRY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.index_lookup.attempts),
        };

        let confirmation = env_secs("TS_CONFIRMATION_TIMEOUT_SECS").map(|timeout| PollPolicy {
            interval: allocation_poll.interval,
            timeout,
        });

        Self {
            allocation_poll,
            index_lookup,
            confirmation,
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
