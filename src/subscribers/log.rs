//! # LogWriter: events rendered through `tracing`.
//!
//! ## Example output (with a fmt subscriber)
//! ```text
//! INFO  service starting service="web" attempt=1
//! WARN  start failed, retrying service="web" attempt=1 delay_ms=1000 reason="failed to start service web: ..."
//! WARN  transition stalled service="web" state=StartPending elapsed_ms=1000
//! INFO  service running service="web" attempt=2
//! ERROR operation failed service="db" reason="stopping service db: timed out after 30.5s (limit 30s)"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that logs every event through `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ServiceSkipped => {
                tracing::debug!(service, reason, "service skipped");
            }
            EventKind::StartAttempt => {
                tracing::info!(service, attempt = ?e.attempt, "service starting");
            }
            EventKind::StartRetryScheduled => {
                tracing::warn!(
                    service,
                    attempt = ?e.attempt,
                    delay_ms = ?e.delay_ms,
                    reason,
                    "start failed, retrying"
                );
            }
            EventKind::TransitionStalled => {
                tracing::warn!(service, state = ?e.state, elapsed_ms = ?e.elapsed_ms, reason, "transition stalled");
            }
            EventKind::LoadGrace => {
                tracing::info!(service, load = ?e.load, grace = ?e.attempt, "stall forgiven under load");
            }
            EventKind::StartTypeChanged => {
                tracing::debug!(service, start_type = ?e.start_type, "start type changed");
            }
            EventKind::ServiceRunning => {
                tracing::info!(service, attempt = ?e.attempt, "service running");
            }
            EventKind::ServiceStopped => {
                tracing::info!(service, "service stopped");
            }
            EventKind::DeletePending => {
                tracing::debug!(service, poll = ?e.attempt, delay_ms = ?e.delay_ms, "service still present");
            }
            EventKind::ServiceDeleted => {
                tracing::info!(service, elapsed_ms = ?e.elapsed_ms, "service deleted");
            }
            EventKind::OperationFailed => {
                tracing::error!(service, reason, "operation failed");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = service, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(subscriber = service, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::events::Bus;
    use crate::scm::{ServiceState, StartType};
    use crate::subscribers::SubscriberSet;

    const ALL_KINDS: [EventKind; 13] = [
        EventKind::ServiceSkipped,
        EventKind::StartAttempt,
        EventKind::StartRetryScheduled,
        EventKind::TransitionStalled,
        EventKind::LoadGrace,
        EventKind::StartTypeChanged,
        EventKind::ServiceRunning,
        EventKind::ServiceStopped,
        EventKind::DeletePending,
        EventKind::ServiceDeleted,
        EventKind::OperationFailed,
        EventKind::SubscriberOverflow,
        EventKind::SubscriberPanicked,
    ];

    fn full(kind: EventKind) -> Event {
        Event::new(kind)
            .with_service("web")
            .with_reason("boom")
            .with_attempt(2)
            .with_delay(Duration::from_secs(1))
            .with_elapsed(Duration::from_millis(1500))
            .with_state(ServiceState::StartPending)
            .with_start_type(StartType::Manual)
            .with_load(0.95)
    }

    #[tokio::test]
    async fn renders_every_kind() {
        let writer = LogWriter::new();
        for kind in ALL_KINDS {
            writer.on_event(&full(kind)).await;
            writer.on_event(&Event::new(kind)).await;
        }
        assert_eq!(writer.name(), "log");
    }

    #[tokio::test]
    async fn runs_inside_subscriber_set() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>], bus);
        for kind in ALL_KINDS {
            set.emit(&full(kind));
        }
        set.shutdown().await;

        assert!(rx.try_recv().is_err(), "log writer must not panic or overflow");
    }
}
