//! Conflict retry with backoff
//!
//! Optimistic transactions fail with a conflict when another writer
//! committed first, and remote refreshes additionally back off while the
//! database has unsaved edits. Both are transient: the combinator here
//! retries the transactional call under a bounded exponential backoff,
//! re-checking cancellation between attempts, until it succeeds, hits a
//! non-transient error, or is cancelled. The concrete delays are
//! tunables, not correctness constants.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::{BookmarksError, Result};

/// Bounded exponential backoff schedule
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Growth factor applied after every retry
    pub multiplier: u32,
    /// Upper bound on the delay between attempts
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            multiplier: 2,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep before retry number `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Cooperative cancellation flag shared between a caller and its workflows
///
/// Clones observe the same flag. Cancellation is checked between retry
/// attempts; it does not interrupt an edit function already running.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Run `operation` until it stops failing with a conflict
///
/// Conflict errors (`OptimisticLock`, `Dirty`) trigger a backoff sleep
/// and another attempt; every other error, and success, pass straight
/// through. Returns `BookmarksError::Cancelled` when the token trips.
pub fn retry_on_conflict<T>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    mut operation: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut attempt: u32 = 0;
    loop {
        if token.is_cancelled() {
            return Err(BookmarksError::Cancelled);
        }
        match operation() {
            Err(error) if error.is_conflict() => {
                let delay = policy.delay_for(attempt);
                debug!(attempt, ?delay, %error, "conflict, retrying after backoff");
                thread::sleep(delay);
                attempt = attempt.saturating_add(1);
            }
            result => return result,
        }
    }
}
