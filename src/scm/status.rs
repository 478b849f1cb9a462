//! # Service status snapshot and configuration values.
//!
//! [`ServiceStatus`] is what the host reports on every query: the current
//! [`ServiceState`], a progress checkpoint and a wait hint. It is a snapshot;
//! callers re-query instead of caching it across polls.

use std::fmt;
use std::time::Duration;

/// Run state of a service.
///
/// Only [`ServiceState::StartPending`] and [`ServiceState::StopPending`] are
/// transitional for the manager; the rest are treated as terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceState {
    #[default]
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
}

impl ServiceState {
    /// True for the two states a transition wait can be asked to leave.
    #[inline]
    pub fn is_pending(self) -> bool {
        matches!(self, ServiceState::StartPending | ServiceState::StopPending)
    }

    /// Job-style label (`stopped`, `starting`, `stop_pending`, ...).
    pub fn as_label(self) -> &'static str {
        match self {
            ServiceState::Stopped => "stopped",
            ServiceState::StartPending => "starting",
            ServiceState::StopPending => "stop_pending",
            ServiceState::Running => "running",
            ServiceState::ContinuePending => "continue_pending",
            ServiceState::PausePending => "pause_pending",
            ServiceState::Paused => "paused",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Stopped => "Stopped",
            ServiceState::StartPending => "StartPending",
            ServiceState::StopPending => "StopPending",
            ServiceState::Running => "Running",
            ServiceState::ContinuePending => "ContinuePending",
            ServiceState::PausePending => "PausePending",
            ServiceState::Paused => "Paused",
        };
        f.write_str(s)
    }
}

/// Status snapshot returned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceStatus {
    /// Current run state.
    pub state: ServiceState,
    /// Progress counter bumped by the service while in a pending state.
    pub checkpoint: u32,
    /// Host estimate of how long the pending operation takes, in milliseconds.
    pub wait_hint_ms: u32,
}

impl ServiceStatus {
    /// Status in `state` with no checkpoint and no wait hint.
    pub const fn new(state: ServiceState) -> Self {
        Self {
            state,
            checkpoint: 0,
            wait_hint_ms: 0,
        }
    }

    /// Returns a copy with the given checkpoint.
    pub const fn with_checkpoint(mut self, checkpoint: u32) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// Returns a copy with the given wait hint.
    pub const fn with_wait_hint_ms(mut self, wait_hint_ms: u32) -> Self {
        self.wait_hint_ms = wait_hint_ms;
        self
    }

    /// The reported wait hint as a duration (zero when unset).
    #[inline]
    pub fn wait_hint(&self) -> Duration {
        Duration::from_millis(u64::from(self.wait_hint_ms))
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (checkpoint={} wait_hint={}ms)",
            self.state, self.checkpoint, self.wait_hint_ms
        )
    }
}

/// Persistent start type of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartType {
    Manual,
    Automatic,
    Disabled,
}

impl fmt::Display for StartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StartType::Manual => "StartManual",
            StartType::Automatic => "StartAutomatic",
            StartType::Disabled => "StartDisabled",
        };
        f.write_str(s)
    }
}

/// Control requests the manager sends to a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Start,
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_start_and_stop_pending_are_pending() {
        let pending: Vec<_> = [
            ServiceState::Stopped,
            ServiceState::StartPending,
            ServiceState::StopPending,
            ServiceState::Running,
            ServiceState::ContinuePending,
            ServiceState::PausePending,
            ServiceState::Paused,
        ]
        .into_iter()
        .filter(|s| s.is_pending())
        .collect();
        assert_eq!(
            pending,
            vec![ServiceState::StartPending, ServiceState::StopPending]
        );
    }

    #[test]
    fn labels_match_job_states() {
        assert_eq!(ServiceState::StartPending.as_label(), "starting");
        assert_eq!(ServiceState::StopPending.as_label(), "stop_pending");
        assert_eq!(ServiceState::Running.as_label(), "running");
    }

    #[test]
    fn status_display_includes_progress() {
        let st = ServiceStatus::new(ServiceState::StartPending)
            .with_checkpoint(3)
            .with_wait_hint_ms(500);
        assert_eq!(
            st.to_string(),
            "StartPending (checkpoint=3 wait_hint=500ms)"
        );
        assert_eq!(st.wait_hint(), Duration::from_millis(500));
    }
}
