//! # Deleting one service.
//!
//! The host only removes a service once every handle to it is closed, so the
//! handle is released right after the delete mark and completion is observed
//! by re-opening the service by name until that fails.
//!
//! ```text
//! stop (unless Stopped) ─► mark ─► close ─► sleep(first_check)
//!     └─► loop: open ── fails ─────────────► gone
//!                 └─ succeeds ─► close ─► over limit? ─► Timeout
//!                                  └─► sleep(poll), poll += step (capped)
//! ```

use tokio::time::{self, Instant};

use crate::core::context::Context;
use crate::core::stop::stop;
use crate::error::{ManagerError, ScmError};
use crate::events::{Event, EventKind};
use crate::scm::{Service, ServiceState};

/// Stops (if needed) and deletes `svc`, returning once the host has removed it.
pub(crate) async fn delete(svc: Service, ctx: &Context) -> Result<(), ManagerError> {
    if svc.query()?.state != ServiceState::Stopped {
        stop(&svc, ctx).await?;
    }

    svc.mark_for_deletion()?;
    let name = svc.name().to_string();
    if let Err(e) = svc.close() {
        tracing::debug!(service = %name, error = %e, "closing deleted service failed");
    }

    let cfg = &ctx.cfg;
    let limit = cfg.delete_timeout;
    let mut interval = cfg.delete_poll_first;
    let mut poll = 0u32;

    time::sleep(cfg.delete_first_check).await;
    let started = Instant::now();
    loop {
        poll += 1;
        match Service::open(ctx.scm.as_ref(), &name) {
            Err(ManagerError::Service {
                source: ScmError::NotFound,
                ..
            }) => break,
            Err(e) => {
                tracing::debug!(service = %name, error = %e, "re-open failed, treating as deleted");
                break;
            }
            Ok(probe) => drop(probe),
        }

        let elapsed = started.elapsed();
        if elapsed > limit {
            return Err(ManagerError::Timeout {
                op: "deleting service",
                name,
                limit,
                elapsed,
            });
        }

        ctx.publish(
            Event::new(EventKind::DeletePending)
                .with_service(name.as_str())
                .with_attempt(poll)
                .with_delay(interval),
        );
        time::sleep(interval).await;
        interval = cfg.next_delete_poll(interval);
    }

    ctx.publish(
        Event::new(EventKind::ServiceDeleted)
            .with_service(name.as_str())
            .with_elapsed(started.elapsed()),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::core::context::testing::{context, open};
    use crate::scm::Control;
    use crate::scm::memory::{MemoryScm, Operation, ServiceSpec};

    #[tokio::test(start_paused = true)]
    async fn stopped_service_is_deleted_on_first_check() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("web", ServiceState::Stopped));
        let ctx = context(&scm, 10.0);

        let t0 = Instant::now();
        delete(open(&scm, "web"), &ctx).await.expect("delete");
        assert_eq!(t0.elapsed(), Duration::from_millis(100));
        assert!(!scm.exists("web"));
        assert_eq!(scm.controls("web", Control::Stop), 0);
        assert_eq!(scm.open_handles("web"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn running_service_is_stopped_first() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("web", ServiceState::Running));
        let ctx = context(&scm, 10.0);

        delete(open(&scm, "web"), &ctx).await.expect("delete");
        assert_eq!(scm.controls("web", Control::Stop), 1);
        assert!(!scm.exists("web"));
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_the_host_lets_go() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("web", ServiceState::Stopped).deleted_after(3));
        let ctx = context(&scm, 10.0);
        let mut rx = ctx.bus.subscribe();

        let t0 = Instant::now();
        delete(open(&scm, "web"), &ctx).await.expect("delete");
        // 100ms, then 1s + 2s + 3s between the four re-opens
        assert_eq!(t0.elapsed(), Duration::from_millis(6_100));
        assert_eq!(scm.open_attempts("web"), 5);
        assert_eq!(scm.opens("web"), scm.closes("web"));

        let pending = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|e| e.kind == EventKind::DeletePending)
            .count();
        assert_eq!(pending, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn service_that_never_goes_away_times_out() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("web", ServiceState::Stopped).deleted_after(u32::MAX));
        let ctx = context(&scm, 10.0);

        let err = delete(open(&scm, "web"), &ctx)
            .await
            .expect_err("timeout");
        assert!(matches!(
            err,
            ManagerError::Timeout {
                op: "deleting service",
                ..
            }
        ));
        assert_eq!(scm.open_handles("web"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mark_failure_is_reported() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("web", ServiceState::Stopped).failing(Operation::Delete));
        let ctx = context(&scm, 10.0);

        let err = delete(open(&scm, "web"), &ctx)
            .await
            .expect_err("mark fails");
        assert!(matches!(
            err,
            ManagerError::Service {
                op: "deleting service",
                ..
            }
        ));
        assert!(scm.exists("web"));
        assert_eq!(scm.open_handles("web"), 0);
    }
}
