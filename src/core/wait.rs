//! # Waiting out a pending transition.
//!
//! A service in `StartPending` or `StopPending` has no completion callback; the
//! only signal is its status, polled. Progress is judged from two host fields:
//! - `checkpoint`, bumped by the service while it works;
//! - `wait_hint`, how long the host may go without a checkpoint bump.
//!
//! ```text
//! query ─► not pending? ─► done
//!   │
//!   └─► loop:
//!         sleep(interval from hint)
//!         query ─► state changed ─────────────► Ok(status)
//!           ├─ elapsed > transition_timeout ──► TransitionTimeout
//!           ├─ checkpoint moved ──────────────► reset stall timer
//!           ├─ stalled ≤ wait_hint ───────────► keep polling
//!           ├─ host busy (grace left) ────────► LoadGrace, keep polling
//!           └─ otherwise ─────────────────────► TransitionStalled, NoProgress
//! ```
//!
//! ## Load grace
//! A reading above `high_load_threshold` refills the grace counter to
//! `grace_cycles`; each forgiven stall spends one unit. Forgiven stalls are
//! also capped at `grace_cycles` in a row, so a host that stays saturated
//! cannot hold a hung service until the absolute ceiling. Any checkpoint
//! progress resets the run.

use std::time::Duration;

use tokio::time::{self, Instant};

use crate::core::config::ManagerConfig;
use crate::core::context::Context;
use crate::error::ManagerError;
use crate::events::{Event, EventKind};
use crate::scm::{Service, ServiceState, ServiceStatus};

/// Effective wait hint and poll interval for `status`.
///
/// A zero hint falls back to [`ManagerConfig::default_wait_hint`]; the poll
/// interval is a tenth of the hint, clamped to `[min_poll, max_poll]`.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use scmvisor::{wait_hint, ManagerConfig, ServiceState, ServiceStatus};
///
/// let cfg = ManagerConfig::default();
/// let status = ServiceStatus::new(ServiceState::StartPending).with_wait_hint_ms(30_000);
/// assert_eq!(wait_hint(&cfg, &status), (Duration::from_secs(30), Duration::from_secs(3)));
/// ```
pub fn wait_hint(cfg: &ManagerConfig, status: &ServiceStatus) -> (Duration, Duration) {
    let hint = match status.wait_hint() {
        Duration::ZERO => cfg.default_wait_hint,
        d => d,
    };
    let (lo, hi) = cfg.poll_bounds();
    (hint, (hint / 10).clamp(lo, hi))
}

/// Polls `svc` until it leaves `pending`, returning the first status outside it.
///
/// Returns immediately when the service is not in `pending` on the first query.
pub(crate) async fn wait_pending(
    svc: &Service,
    pending: ServiceState,
    ctx: &Context,
) -> Result<ServiceStatus, ManagerError> {
    if !pending.is_pending() {
        return Err(ManagerError::InvalidPendingState { state: pending });
    }
    let cfg = &ctx.cfg;

    let mut status = svc.query()?;
    let started = Instant::now();
    let mut progress_at = started;
    let mut checkpoint = status.checkpoint;
    let mut grace_left = 0u32;
    let mut forgiven = 0u32;

    while status.state == pending {
        let (hint, interval) = wait_hint(cfg, &status);
        time::sleep(interval).await;

        status = svc.query()?;
        if status.state != pending {
            break;
        }

        let elapsed = started.elapsed();
        if elapsed > cfg.transition_timeout {
            return Err(ManagerError::TransitionTimeout {
                name: svc.name().to_string(),
                status,
                wait_hint: hint,
                elapsed,
            });
        }

        if status.checkpoint > checkpoint {
            checkpoint = status.checkpoint;
            progress_at = Instant::now();
            forgiven = 0;
            continue;
        }

        if progress_at.elapsed() <= hint {
            continue;
        }

        let load = ctx.load.current_load();
        if load > cfg.high_load_threshold {
            grace_left = cfg.grace_cycles;
        }
        if grace_left > 0 && forgiven < cfg.grace_cycles {
            grace_left -= 1;
            forgiven += 1;
            ctx.publish(
                Event::new(EventKind::LoadGrace)
                    .with_service(svc.name())
                    .with_state(status.state)
                    .with_load(load)
                    .with_attempt(forgiven),
            );
            continue;
        }

        ctx.publish(
            Event::new(EventKind::TransitionStalled)
                .with_service(svc.name())
                .with_state(status.state)
                .with_elapsed(elapsed)
                .with_reason(format!("checkpoint {checkpoint} unchanged past wait hint {hint:?}")),
        );
        return Err(ManagerError::NoProgress {
            name: svc.name().to_string(),
            status,
            wait_hint: hint,
            elapsed,
        });
    }

    Ok(status)
}
