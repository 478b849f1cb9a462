//! # Manager configuration.
//!
//! [`ManagerConfig`] centralizes every timing knob of the lifecycles: polling
//! bounds, ceilings, the start retry budget and the load heuristic.
//!
//! ## Field groups
//! - **Transition waits**: `transition_timeout`, `default_wait_hint`, `min_poll`, `max_poll`
//! - **Load heuristic**: `high_load_threshold`, `grace_cycles`, `load_sample_interval`
//! - **Start**: `start_retry`, `settle_checks`, `settle_interval`
//! - **Stop / delete**: `stop_timeout`, `delete_*`
//! - **Events**: `bus_capacity`

use std::time::Duration;

use crate::policies::RetryPolicy;

/// Timing and policy configuration for a [`Manager`](crate::Manager).
///
/// All fields are public; the defaults follow the host vendor's guidance for
/// polling pending services (one tenth of the wait hint, between 1 and 10 seconds).
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Absolute ceiling for leaving a pending state, whatever the checkpoint does.
    pub transition_timeout: Duration,

    /// Wait hint assumed when the host reports none.
    pub default_wait_hint: Duration,

    /// Lower bound of the poll interval.
    pub min_poll: Duration,

    /// Upper bound of the poll interval.
    pub max_poll: Duration,

    /// Host load (percent) above which a stalled checkpoint is forgiven.
    pub high_load_threshold: f64,

    /// Maximum number of consecutive stalled polls forgiven because of load.
    pub grace_cycles: u32,

    /// Attempt budget and delay for starting a service.
    ///
    /// Only start failures where the service did not end up running are retried.
    pub start_retry: RetryPolicy,

    /// Number of post-start polls that must all observe `Running`.
    pub settle_checks: u32,

    /// Pause before each settle poll.
    pub settle_interval: Duration,

    /// Ceiling for confirming a stop once the stop request was sent.
    pub stop_timeout: Duration,

    /// Ceiling for a deleted service to disappear from the host.
    pub delete_timeout: Duration,

    /// Pause between marking for deletion and the first re-open.
    pub delete_first_check: Duration,

    /// First pause between two re-open polls.
    pub delete_poll_first: Duration,

    /// Growth of the re-open pause after each poll.
    pub delete_poll_step: Duration,

    /// Cap of the re-open pause.
    pub delete_poll_max: Duration,

    /// Capacity of the event bus ring buffer (min 1).
    pub bus_capacity: usize,

    /// Sampling period of the built-in CPU monitor.
    pub load_sample_interval: Duration,
}

impl ManagerConfig {
    /// Poll interval bounds, with `max` never below `min`.
    #[inline]
    pub fn poll_bounds(&self) -> (Duration, Duration) {
        (self.min_poll, self.max_poll.max(self.min_poll))
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Pause following a delete poll that still found the service.
    #[inline]
    pub fn next_delete_poll(&self, current: Duration) -> Duration {
        (current + self.delete_poll_step).min(self.delete_poll_max.max(self.delete_poll_first))
    }
}

impl Default for ManagerConfig {
    /// Defaults:
    ///
    /// - transitions: 2 min ceiling, 10s default hint, poll in `[1s, 10s]`
    /// - load: forgive stalls above 90% for up to 10 polls
    /// - start: 10 attempts 1s apart, 5 settle polls 100ms apart
    /// - stop: 30s; delete: 60s, first check after 100ms, polls 1s..10s by 1s
    fn default() -> Self {
        Self {
            transition_timeout: Duration::from_secs(120),
            default_wait_hint: Duration::from_secs(10),
            min_poll: Duration::from_secs(1),
            max_poll: Duration::from_secs(10),
            high_load_threshold: 90.0,
            grace_cycles: 10,
            start_retry: RetryPolicy::default(),
            settle_checks: 5,
            settle_interval: Duration::from_millis(100),
            stop_timeout: Duration::from_secs(30),
            delete_timeout: Duration::from_secs(60),
            delete_first_check: Duration::from_millis(100),
            delete_poll_first: Duration::from_secs(1),
            delete_poll_step: Duration::from_secs(1),
            delete_poll_max: Duration::from_secs(10),
            bus_capacity: 1024,
            load_sample_interval: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_poll_grows_by_step_up_to_cap() {
        let cfg = ManagerConfig::default();
        let mut d = cfg.delete_poll_first;
        let mut seen = vec![d];
        for _ in 0..12 {
            d = cfg.next_delete_poll(d);
            seen.push(d);
        }
        assert_eq!(seen[1], Duration::from_secs(2));
        assert_eq!(seen[9], Duration::from_secs(10));
        assert_eq!(*seen.last().unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn inverted_poll_bounds_are_repaired() {
        let cfg = ManagerConfig {
            min_poll: Duration::from_secs(5),
            max_poll: Duration::from_secs(1),
            ..ManagerConfig::default()
        };
        assert_eq!(
            cfg.poll_bounds(),
            (Duration::from_secs(5), Duration::from_secs(5))
        );
    }
}
