//! # Starting one service.
//!
//! [`start`] wraps [`start_once`] in the configured [`RetryPolicy`](crate::RetryPolicy):
//! only [`ManagerError::Start`] (the service was started but not confirmed
//! running) is retried; anything else ends the loop on the spot.
//!
//! One attempt:
//! 1. set the start type to `Manual` (a disabled service cannot start);
//! 2. wait out any pending transition;
//! 3. `Running` already? done;
//! 4. send the start request (an "already running" race is fine);
//! 5. wait out `StartPending`; anything but `Running` is a start failure;
//! 6. settle: the service must be seen `Running` on every settle poll.
//!
//! A stall while waiting counts as a start failure, so it is retried too.

use tokio::time;

use crate::core::context::Context;
use crate::core::wait::wait_pending;
use crate::error::{ManagerError, ScmError};
use crate::events::{Event, EventKind};
use crate::scm::{Control, Service, ServiceState, ServiceStatus, StartType};

/// Starts `svc`, retrying start failures.
pub(crate) async fn start(svc: &Service, ctx: &Context) -> Result<(), ManagerError> {
    let policy = ctx.cfg.start_retry;
    let mut attempt = 1u32;
    loop {
        ctx.publish(
            Event::new(EventKind::StartAttempt)
                .with_service(svc.name())
                .with_attempt(attempt),
        );

        let err = match start_once(svc, ctx).await {
            Ok(()) => {
                ctx.publish(
                    Event::new(EventKind::ServiceRunning)
                        .with_service(svc.name())
                        .with_attempt(attempt),
                );
                return Ok(());
            }
            Err(e) if e.is_retryable() => e,
            Err(e) => return Err(e),
        };

        let Some(delay) = policy.delay_after(attempt) else {
            return Err(err);
        };

        let mut ev = Event::new(EventKind::StartRetryScheduled)
            .with_service(svc.name())
            .with_attempt(attempt)
            .with_delay(delay)
            .with_reason(err.to_string());
        if let ManagerError::Start { status, .. } = &err {
            ev = ev.with_state(status.state);
        }
        ctx.publish(ev);

        time::sleep(delay).await;
        attempt += 1;
    }
}

/// One start attempt, without retries.
pub(crate) async fn start_once(svc: &Service, ctx: &Context) -> Result<(), ManagerError> {
    ctx.set_start_type(svc, StartType::Manual)?;

    let mut status = svc.query()?;
    if status.state.is_pending() {
        status = wait_start(svc, status.state, ctx).await?;
    }
    if status.state == ServiceState::Running {
        return Ok(());
    }

    match svc.control(Control::Start) {
        Ok(_) | Err(ScmError::AlreadyRunning) => {}
        Err(e) => return Err(ManagerError::service("starting service", svc.name(), e)),
    }

    let status = wait_start(svc, ServiceState::StartPending, ctx).await?;
    if status.state != ServiceState::Running {
        return Err(start_failed(svc, status));
    }

    // Services may report running before their process has proven stable.
    for _ in 0..ctx.cfg.settle_checks {
        time::sleep(ctx.cfg.settle_interval).await;
        let status = svc.query()?;
        if status.state != ServiceState::Running {
            return Err(start_failed(svc, status));
        }
    }
    Ok(())
}

async fn wait_start(
    svc: &Service,
    pending: ServiceState,
    ctx: &Context,
) -> Result<ServiceStatus, ManagerError> {
    wait_pending(svc, pending, ctx).await.map_err(|e| match e {
        ManagerError::NoProgress { name, status, .. } => ManagerError::Start { name, status },
        other => other,
    })
}

fn start_failed(svc: &Service, status: ServiceStatus) -> ManagerError {
    ManagerError::Start {
        name: svc.name().to_string(),
        status,
    }
}
