//! # Events emitted while driving services through their lifecycle.
//!
//! [`EventKind`] classifies events in three groups:
//! - **Discovery**: services skipped while enumerating the host
//! - **Lifecycle**: start attempts, retries, stalls, terminal states reached
//! - **Subscriber**: delivery problems inside the subscriber set
//!
//! [`Event`] carries the metadata: timestamps, service name, state, attempt,
//! delays and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique, monotonically increasing `seq`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use scmvisor::{Event, EventKind, ServiceState};
//!
//! let ev = Event::new(EventKind::StartRetryScheduled)
//!     .with_service("web")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(1))
//!     .with_state(ServiceState::Stopped)
//!     .with_reason("failed to start");
//!
//! assert_eq!(ev.kind, EventKind::StartRetryScheduled);
//! assert_eq!(ev.service.as_deref(), Some("web"));
//! assert_eq!(ev.delay_ms, Some(1000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::scm::{ServiceState, StartType};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Discovery ===
    /// A listed service could not be opened or described and was ignored.
    ///
    /// Sets: `service`, `reason`.
    ServiceSkipped,

    // === Lifecycle ===
    /// A start attempt begins.
    ///
    /// Sets: `service`, `attempt` (1-based).
    StartAttempt,

    /// A start attempt failed with a retryable error; the next one is scheduled.
    ///
    /// Sets: `service`, `attempt` (the failed one), `delay_ms`, `reason`, `state`.
    StartRetryScheduled,

    /// A pending transition made no progress within its wait hint.
    ///
    /// Sets: `service`, `state`, `elapsed_ms`, `reason`.
    TransitionStalled,

    /// A stall was forgiven because the host is under heavy load.
    ///
    /// Sets: `service`, `state`, `load`, `attempt` (consecutive forgiven polls).
    LoadGrace,

    /// The configured start type was changed.
    ///
    /// Sets: `service`, `start_type`.
    StartTypeChanged,

    /// The service is confirmed running.
    ///
    /// Sets: `service`, `attempt`.
    ServiceRunning,

    /// The service is confirmed stopped.
    ///
    /// Sets: `service`.
    ServiceStopped,

    /// A service marked for deletion can still be opened.
    ///
    /// Sets: `service`, `attempt` (poll number), `delay_ms` (next poll).
    DeletePending,

    /// The service is gone from the host.
    ///
    /// Sets: `service`, `elapsed_ms`.
    ServiceDeleted,

    /// A lifecycle operation failed for one service.
    ///
    /// Sets: `service`, `reason`.
    OperationFailed,

    // === Subscribers ===
    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `service` (subscriber name), `reason`.
    SubscriberOverflow,

    /// A subscriber panicked while processing an event.
    ///
    /// Sets: `service` (subscriber name), `reason`.
    SubscriberPanicked,
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Service name (or subscriber name for subscriber events).
    pub service: Option<Arc<str>>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Attempt or poll counter (starting from 1).
    pub attempt: Option<u32>,
    /// Delay before the next step, in milliseconds.
    pub delay_ms: Option<u32>,
    /// Time spent so far, in milliseconds.
    pub elapsed_ms: Option<u32>,
    /// Service state observed.
    pub state: Option<ServiceState>,
    /// Start type applied.
    pub start_type: Option<StartType>,
    /// Host load in percent.
    pub load: Option<f64>,
}

fn millis(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            reason: None,
            attempt: None,
            delay_ms: None,
            elapsed_ms: None,
            state: None,
            start_type: None,
            load: None,
        }
    }

    #[inline]
    pub fn with_service(mut self, name: impl Into<Arc<str>>) -> Self {
        self.service = Some(name.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(millis(d));
        self
    }

    /// Attaches an elapsed time (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(millis(d));
        self
    }

    #[inline]
    pub fn with_state(mut self, state: ServiceState) -> Self {
        self.state = Some(state);
        self
    }

    #[inline]
    pub fn with_start_type(mut self, start_type: StartType) -> Self {
        self.start_type = Some(start_type);
        self
    }

    #[inline]
    pub fn with_load(mut self, load: f64) -> Self {
        self.load = Some(load);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
