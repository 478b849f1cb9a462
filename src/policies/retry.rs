//! # Attempt budget for retried operations.
//!
//! [`RetryPolicy`] bounds how many times an operation runs and delegates the
//! delay between two attempts to a [`BackoffPolicy`]. `N` attempts sleep
//! `N - 1` times: there is no delay before the first attempt or after the last.

use std::time::Duration;

use crate::policies::backoff::BackoffPolicy;
use crate::policies::jitter::JitterPolicy;

/// Attempt budget plus delay schedule.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, first one included (`0` is treated as `1`).
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    /// Returns a policy with 10 attempts and a constant 1s delay.
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: BackoffPolicy {
                first: Duration::from_secs(1),
                max: Duration::from_secs(1),
                factor: 1.0,
                jitter: JitterPolicy::None,
            },
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn never() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Effective attempt budget (at least one).
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after the failed `attempt` (1-based), or `None` when the
    /// budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.attempts() {
            return None;
        }
        Some(self.backoff.next(attempt.saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sleeps_nine_times_for_ten_attempts() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..=policy.attempts())
            .filter_map(|a| policy.delay_after(a))
            .collect();
        assert_eq!(delays.len(), 9);
        assert!(delays.iter().all(|d| *d == Duration::from_secs(1)));
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.delay_after(1), None);
    }

    #[test]
    fn never_has_no_delay() {
        assert_eq!(RetryPolicy::never().delay_after(1), None);
    }
}
