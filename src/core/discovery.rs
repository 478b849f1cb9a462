//! # Finding the services to manage.
//!
//! Every lifecycle operation starts by listing the host's services, opening
//! each one and keeping those whose description satisfies a [`Matcher`].
//!
//! - A failed listing aborts the operation ([`ManagerError::Listing`]).
//! - A service that cannot be opened or described is skipped and reported
//!   as [`EventKind::ServiceSkipped`]; access restrictions on unrelated
//!   services are expected.
//! - Rejected services are closed right away; survivors are returned open.

use std::fmt;
use std::sync::Arc;

use crate::error::ManagerError;
use crate::events::{Bus, Event, EventKind};
use crate::scm::{Service, ServiceControlManager};

/// Predicate over a service description.
///
/// # Example
/// ```rust
/// use scmvisor::Matcher;
///
/// let vcap = Matcher::description("vcap");
/// assert!(vcap.matches("vcap"));
/// assert!(!vcap.matches("Windows Update"));
///
/// assert!(Matcher::all().matches("anything"));
/// assert!(Matcher::new(|d| d.starts_with("job-")).matches("job-web"));
/// ```
#[derive(Clone)]
pub struct Matcher(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl Matcher {
    /// Accepts every service.
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    /// Accepts services whose description satisfies `f`.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Accepts services whose description equals `text` exactly.
    pub fn description(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |d| d == text)
    }

    #[inline]
    pub fn matches(&self, description: &str) -> bool {
        (self.0)(description)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Matcher(..)")
    }
}

/// Opens every service whose description satisfies `matcher`.
pub(crate) fn discover(
    scm: &dyn ServiceControlManager,
    matcher: &Matcher,
    bus: &Bus,
) -> Result<Vec<Service>, ManagerError> {
    let names = scm
        .list_services()
        .map_err(|source| ManagerError::Listing { source })?;

    let mut matched = Vec::new();
    for name in names {
        let svc = match Service::open(scm, &name) {
            Ok(svc) => svc,
            Err(e) => {
                skipped(bus, &name, &e.to_string());
                continue;
            }
        };
        match svc.describe() {
            Ok(desc) if matcher.matches(&desc) => matched.push(svc),
            Ok(_) => {}
            Err(e) => skipped(bus, &name, &format!("reading description: {e}")),
        }
    }
    Ok(matched)
}

fn skipped(bus: &Bus, name: &str, reason: &str) {
    tracing::debug!(service = name, reason, "skipping service");
    bus.publish(
        Event::new(EventKind::ServiceSkipped)
            .with_service(name)
            .with_reason(reason),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScmError;
    use crate::scm::ServiceState;
    use crate::scm::memory::{MemoryScm, Operation, ServiceSpec};

    fn host() -> MemoryScm {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("a", ServiceState::Running).with_description("vcap"));
        scm.register(ServiceSpec::new("b", ServiceState::Running).with_description("other"));
        scm.register(
            ServiceSpec::new("c", ServiceState::Running)
                .with_description("vcap")
                .failing(Operation::Open),
        );
        scm.register(
            ServiceSpec::new("d", ServiceState::Running)
                .with_description("vcap")
                .failing(Operation::Describe),
        );
        scm
    }

    #[test]
    fn keeps_matching_services_open_and_closes_the_rest() {
        let scm = host();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();

        let found = discover(&scm, &Matcher::description("vcap"), &bus).expect("discover");
        let names: Vec<_> = found.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["a"]);
        assert_eq!(scm.open_handles("a"), 1);
        assert_eq!(scm.open_handles("b"), 0);
        assert_eq!(scm.open_handles("d"), 0);

        let mut skipped = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            assert_eq!(ev.kind, EventKind::ServiceSkipped);
            skipped.push(ev.service.as_deref().unwrap_or_default().to_string());
        }
        assert_eq!(skipped, vec!["c", "d"]);

        drop(found);
        assert_eq!(scm.open_handles("a"), 0);
    }

    #[test]
    fn match_all_keeps_every_openable_service() {
        let scm = host();
        let found = discover(&scm, &Matcher::default(), &Bus::new(16)).expect("discover");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn listing_failure_is_fatal() {
        let scm = host();
        scm.fail_listing(ScmError::AccessDenied);
        let err = discover(&scm, &Matcher::all(), &Bus::new(16)).expect_err("listing");
        assert!(matches!(
            err,
            ManagerError::Listing {
                source: ScmError::AccessDenied
            }
        ));
    }
}
