//! Quarantine backoff and active-count policies.

use std::sync::Arc;
use std::time::Duration;

/// Maps the quarantine count of an endpoint to the delay before the next
/// connect attempt.
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Maps the total endpoint count to the desired number of acquired
/// (connecting or connected) endpoints.
pub type ActiveCountFn = Arc<dyn Fn(usize) -> usize + Send + Sync>;

/// Constant backoff regardless of the quarantine count.
#[must_use]
pub fn fixed_delay(delay: Duration) -> BackoffFn {
    Arc::new(move |_count| delay)
}

/// Backoff growing by `step` per consecutive failure, capped at `max`.
#[must_use]
pub fn linear_delay(step: Duration, max: Duration) -> BackoffFn {
    Arc::new(move |count| step.saturating_mul(count).min(max))
}

/// Backoff doubling per consecutive failure starting at `base`, capped at
/// `max`. A count of 0 or 1 yields `base`.
#[must_use]
pub fn exponential_delay(base: Duration, max: Duration) -> BackoffFn {
    Arc::new(move |count| {
        let exponent = count.saturating_sub(1).min(16);
        base.saturating_mul(1_u32 << exponent).min(max)
    })
}

/// Keep every known endpoint acquired (default).
#[must_use]
pub fn all_endpoints() -> ActiveCountFn {
    Arc::new(|total| total)
}

/// Acquire at most `limit` endpoints regardless of pool size.
#[must_use]
pub fn at_most(limit: usize) -> ActiveCountFn {
    Arc::new(move |total| total.min(limit))
}
