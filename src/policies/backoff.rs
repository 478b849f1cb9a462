//! # Backoff policy between start attempts.
//!
//! [`BackoffPolicy`] computes the pause after a failed attempt from:
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the delay cap.
//!
//! The delay for retry `n` (0-indexed) is `first × factor^n`, clamped to `max`,
//! then jitter is applied. The base is derived from `n` alone, so jitter never
//! feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use scmvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(1),
//!     max: Duration::from_secs(8),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_secs(1));
//! assert_eq!(backoff.next(2), Duration::from_secs(4));
//! assert_eq!(backoff.next(10), Duration::from_secs(8));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delay schedule for retries.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`1.0` = constant).
    pub factor: f64,
    /// Randomization applied to the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Constant one second, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(1),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for retry number `retry` (0-indexed).
    ///
    /// Non-finite or negative intermediate values collapse to [`BackoffPolicy::max`].
    pub fn next(&self, retry: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = retry.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(first_ms: u64, max_ms: u64, factor: f64, jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor,
            jitter,
        }
    }

    #[test]
    fn default_is_constant_one_second() {
        let p = BackoffPolicy::default();
        for retry in 0..20 {
            assert_eq!(p.next(retry), Duration::from_secs(1));
        }
    }

    #[test]
    fn exponential_growth_is_capped() {
        let p = policy(100, 1_000, 2.0, JitterPolicy::None);
        assert_eq!(p.next(0), Duration::from_millis(100));
        assert_eq!(p.next(1), Duration::from_millis(200));
        assert_eq!(p.next(3), Duration::from_millis(800));
        assert_eq!(p.next(4), Duration::from_millis(1_000));
    }

    #[test]
    fn first_above_max_is_clamped() {
        let p = policy(10_000, 5_000, 2.0, JitterPolicy::None);
        assert_eq!(p.next(0), Duration::from_millis(5_000));
    }

    #[test]
    fn overflow_collapses_to_max() {
        let p = policy(100, 10_000, 2.0, JitterPolicy::None);
        assert_eq!(p.next(u32::MAX), Duration::from_millis(10_000));
    }

    #[test]
    fn equal_jitter_stays_within_half_and_full_base() {
        let p = policy(1_000, 30_000, 1.0, JitterPolicy::Equal);
        for retry in 0..50 {
            let d = p.next(retry);
            assert!(d >= Duration::from_millis(500), "retry {retry}: {d:?}");
            assert!(d <= Duration::from_millis(1_000), "retry {retry}: {d:?}");
        }
    }

    #[test]
    fn full_jitter_never_exceeds_base() {
        let p = policy(1_000, 30_000, 1.0, JitterPolicy::Full);
        for retry in 0..50 {
            assert!(p.next(retry) <= Duration::from_millis(1_000));
        }
    }
}
