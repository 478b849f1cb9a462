//! # Stopping one service.
//!
//! The start type is set to `Disabled` first so that a host recovery policy
//! cannot restart the service behind our back. Stops are not retried.
//!
//! Some hosts answer the stop request with an all-zero status, which reads
//! like `Stopped`; such replies are replaced by an explicit query.

use tokio::time::{self, Instant};

use crate::core::context::Context;
use crate::core::wait::{wait_hint, wait_pending};
use crate::error::ManagerError;
use crate::events::{Event, EventKind};
use crate::scm::{Control, Service, ServiceState, ServiceStatus, StartType};

/// Stops `svc` and waits until the host reports it `Stopped`.
pub(crate) async fn stop(svc: &Service, ctx: &Context) -> Result<(), ManagerError> {
    ctx.set_start_type(svc, StartType::Disabled)?;

    let mut status = svc.query()?;
    if status.state.is_pending() {
        status = wait_pending(svc, status.state, ctx).await?;
    }
    if status.state == ServiceState::Stopped {
        return Ok(());
    }

    let reply = svc
        .control(Control::Stop)
        .map_err(|e| ManagerError::service("stopping service", svc.name(), e))?;
    status = match reply {
        Some(st) if st != ServiceStatus::default() => st,
        _ => svc.query()?,
    };

    if status.state == ServiceState::StopPending {
        status = wait_pending(svc, ServiceState::StopPending, ctx).await?;
    }

    let started = Instant::now();
    let limit = ctx.cfg.stop_timeout;
    while status.state != ServiceState::Stopped {
        let (_, interval) = wait_hint(&ctx.cfg, &status);
        time::sleep(interval).await;

        status = svc.query()?;
        if status.state == ServiceState::Stopped {
            break;
        }
        let elapsed = started.elapsed();
        if elapsed > limit {
            return Err(ManagerError::Timeout {
                op: "stopping service",
                name: svc.name().to_string(),
                limit,
                elapsed,
            });
        }
    }

    ctx.publish(Event::new(EventKind::ServiceStopped).with_service(svc.name()));
    Ok(())
}
