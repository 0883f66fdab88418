//! # Cancellable Waits
//!
//! The only suspension points of the reconciler. Both primitives sleep on
//! the tokio clock so tests can run them under a paused runtime.

use super::config::{PollPolicy, RetryPolicy};
use super::errors::ReconcileError;
use std::future::Future;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Probe every `policy.interval` until it yields a value or
/// `policy.timeout` has elapsed since the call.
///
/// The first probe runs after one interval. A probe returning `Ok(None)`
/// means "not yet"; an `Err` aborts the wait. Timing out fails with
/// `ProvisioningTimeout`, cancellation with `Cancelled`.
pub async fn poll_until<T, F, Fut>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    what: &str,
    mut probe: F,
) -> Result<T, ReconcileError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, ReconcileError>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReconcileError::Cancelled),
            _ = sleep(policy.interval) => {}
        }

        attempt += 1;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReconcileError::Cancelled),
            outcome = probe(attempt) => outcome?,
        };

        if let Some(value) = outcome {
            debug!(what, attempt, elapsed_ms = started.elapsed().as_millis() as u64, "Wait satisfied");
            return Ok(value);
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.timeout {
            return Err(ReconcileError::ProvisioningTimeout {
                what: what.to_string(),
                waited_secs: elapsed.as_secs(),
            });
        }
    }
}

/// Try `probe` up to `policy.attempts` times, sleeping `policy.delay`
/// before each attempt. `Ok(None)` after the last attempt means the value
/// never appeared.
pub async fn retry_until<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    what: &str,
    mut probe: F,
) -> Result<Option<T>, ReconcileError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, ReconcileError>>,
{
    for attempt in 1..=policy.attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReconcileError::Cancelled),
            _ = sleep(policy.delay) => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReconcileError::Cancelled),
            outcome = probe(attempt) => outcome?,
        };
        if outcome.is_some() {
            return Ok(outcome);
        }
        debug!(what, attempt, attempts = policy.attempts, "Not there yet");
    }
    Ok(None)
}
