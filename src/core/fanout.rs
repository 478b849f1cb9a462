//! # Concurrent fan-out over discovered services.
//!
//! One tokio task per service, all spawned up front in a [`JoinSet`]. Tasks
//! never cancel each other: a failing or slow service does not hold back its
//! siblings, and the caller waits for all of them.
//!
//! The first error joined is returned. Every failure is published as
//! [`EventKind::OperationFailed`]; the ones after the first are only logged.
//! Each task owns its [`Service`], so the handle is closed when the task ends,
//! panics included.

use std::future::Future;

use tokio::task::JoinSet;

use crate::error::ManagerError;
use crate::events::{Bus, Event, EventKind};
use crate::scm::Service;

/// Runs `op` on every service concurrently and returns the first error.
pub(crate) async fn for_each<F, Fut>(
    services: Vec<Service>,
    bus: &Bus,
    op: F,
) -> Result<(), ManagerError>
where
    F: Fn(Service) -> Fut,
    Fut: Future<Output = Result<(), ManagerError>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for svc in services {
        let name = svc.name().to_string();
        let fut = op(svc);
        set.spawn(async move { (name, fut.await) });
    }

    let mut first: Option<ManagerError> = None;
    while let Some(joined) = set.join_next().await {
        let (name, err) = match joined {
            Ok((_, Ok(()))) => continue,
            Ok((name, Err(e))) => (Some(name), e),
            Err(e) => (
                None,
                ManagerError::Worker {
                    reason: e.to_string(),
                },
            ),
        };

        let mut ev = Event::new(EventKind::OperationFailed).with_reason(err.to_string());
        if let Some(name) = name {
            ev = ev.with_service(name);
        }
        bus.publish(ev);

        match first {
            None => first = Some(err),
            Some(_) => {
                tracing::debug!(error = %err, label = err.as_label(), "additional service failure")
            }
        }
    }

    match first {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::time::{self, Instant};

    use crate::error::ScmError;
    use crate::scm::ServiceState;
    use crate::scm::memory::{MemoryScm, ServiceSpec};

    fn services(scm: &MemoryScm, names: &[&str]) -> Vec<Service> {
        names
            .iter()
            .map(|n| {
                scm.register(ServiceSpec::new(*n, ServiceState::Running));
                Service::open(scm, n).expect("open")
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn runs_services_concurrently_and_closes_every_handle() {
        let scm = MemoryScm::new();
        let svcs = services(&scm, &["a", "b", "c"]);

        let t0 = Instant::now();
        for_each(svcs, &Bus::new(16), |svc| async move {
            time::sleep(Duration::from_secs(5)).await;
            drop(svc);
            Ok(())
        })
        .await
        .expect("all succeed");

        assert_eq!(t0.elapsed(), Duration::from_secs(5));
        for n in ["a", "b", "c"] {
            assert_eq!(scm.open_handles(n), 0);
            assert_eq!(scm.closes(n), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failure_does_not_cancel_siblings() {
        let scm = MemoryScm::new();
        let svcs = services(&scm, &["a", "b", "c"]);
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();

        let err = for_each(svcs, &bus, |svc| async move {
            if svc.name() == "b" {
                return Err(ManagerError::service(
                    "starting service",
                    svc.name(),
                    ScmError::AccessDenied,
                ));
            }
            time::sleep(Duration::from_secs(3)).await;
            svc.query().map(|_| ())
        })
        .await
        .expect_err("b fails");

        assert_eq!(err.service_name(), Some("b"));
        assert_eq!(scm.queries("a"), 1);
        assert_eq!(scm.queries("c"), 1);

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::OperationFailed);
        assert_eq!(ev.service.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn panicking_worker_becomes_an_error_and_still_closes() {
        let scm = MemoryScm::new();
        let svcs = services(&scm, &["a"]);

        let err = for_each(svcs, &Bus::new(16), |svc| async move {
            if svc.name() == "a" {
                panic!("boom");
            }
            Ok(())
        })
        .await
        .expect_err("panic");

        assert!(matches!(err, ManagerError::Worker { .. }));
        assert_eq!(scm.open_handles("a"), 0);
    }

    #[tokio::test]
    async fn empty_set_is_ok() {
        for_each(Vec::new(), &Bus::new(1), |_svc| async { Ok(()) })
            .await
            .expect("nothing to do");
    }
}
