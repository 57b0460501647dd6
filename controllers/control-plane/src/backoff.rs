//! # Fibonacci Backoff
//!
//! Requeue delays for failed reconciliations. The sequence grows more slowly
//! than exponential backoff, so a key that keeps conflicting is retried often
//! enough to converge without hammering the store.
//!
//! Sequence for min = 100ms, max = 10s: 100ms, 100ms, 200ms, 300ms, 500ms,
//! 800ms, 1.3s, ... capped at 10s.

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, starting at `min` twice.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Previous backoff in milliseconds
    prev_millis: u64,
    /// Current backoff in milliseconds
    current_millis: u64,
    /// Maximum backoff in milliseconds
    max_millis: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff bounded by `min` and `max`.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let min_millis = duration_millis(min);
        Self {
            prev_millis: 0,
            current_millis: min_millis,
            max_millis: duration_millis(max).max(min_millis),
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_millis;

        let next_millis = self.prev_millis.saturating_add(self.current_millis);
        self.prev_millis = self.current_millis;
        self.current_millis = next_millis.min(self.max_millis);

        Duration::from_millis(result)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
