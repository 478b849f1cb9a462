//! # Manager: the public facade.
//!
//! Every bulk operation follows the same path:
//!
//! ```text
//! Manager::start()/stop()/delete()/unmonitor()
//!     └─► discover(scm, matcher)        (list, open, describe, filter)
//!           └─► for_each(services)       (one tokio task per service)
//!                 └─► lifecycle(svc)     (start / stop / delete / config)
//!                       └─► wait_pending (poll until the state settles)
//! ```
//!
//! Discovery runs once per call; nothing is cached between calls. The caller
//! gets a single error (the first one); the others are published as
//! [`EventKind::OperationFailed`](crate::EventKind::OperationFailed).
//!
//! ## Example
//! ```rust
//! use scmvisor::{Manager, Matcher, MemoryScm, ServiceSpec, ServiceState, StaticLoad};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), scmvisor::ManagerError> {
//!     let scm = MemoryScm::new();
//!     scm.register(ServiceSpec::new("web", ServiceState::Stopped).with_description("vcap"));
//!
//!     let manager = Manager::builder(scm.clone())
//!         .with_matcher(Matcher::description("vcap"))
//!         .with_load_monitor(Arc::new(StaticLoad(0.0)))
//!         .build();
//!
//!     manager.start().await?;
//!     assert_eq!(scm.state("web"), Some(ServiceState::Running));
//!
//!     manager.stop().await?;
//!     assert_eq!(scm.state("web"), Some(ServiceState::Stopped));
//!     Ok(())
//! }
//! ```

use std::future::Future;

use tokio::sync::broadcast;
use tokio_util::sync::DropGuard;

use crate::core::builder::ManagerBuilder;
use crate::core::config::ManagerConfig;
use crate::core::context::Context;
use crate::core::discovery::{Matcher, discover};
use crate::core::fanout::for_each;
use crate::core::{delete, start, stop};
use crate::error::ManagerError;
use crate::events::Event;
use crate::scm::{Service, ServiceControlManager, ServiceState, StartType};

/// Name and state of one managed service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSnapshot {
    pub name: String,
    pub state: ServiceState,
}

impl ServiceSnapshot {
    /// Job-style state label (`running`, `starting`, ...).
    pub fn label(&self) -> &'static str {
        self.state.as_label()
    }
}

/// Roll-up of the managed services' states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Every managed service is running (or there are none).
    Running,
    /// At least one service is not running, or the status could not be read.
    Failing,
}

/// Drives the services selected by a [`Matcher`] through their lifecycle.
pub struct Manager {
    ctx: Context,
    matcher: Matcher,
    _listener: Option<DropGuard>,
}

impl Manager {
    /// Starts building a manager over `scm`.
    pub fn builder<S: ServiceControlManager>(scm: S) -> ManagerBuilder {
        ManagerBuilder::new(scm)
    }

    pub(crate) fn new_internal(ctx: Context, matcher: Matcher, listener: Option<DropGuard>) -> Self {
        Self {
            ctx,
            matcher,
            _listener: listener,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.ctx.cfg
    }

    /// Receiver for the events published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.ctx.bus.subscribe()
    }

    /// Names of the services currently selected by the matcher.
    pub fn services(&self) -> Result<Vec<String>, ManagerError> {
        Ok(self
            .discover()?
            .iter()
            .map(|svc| svc.name().to_string())
            .collect())
    }

    /// Starts every managed service, retrying start failures per service.
    ///
    /// Services end with start type `Manual`.
    pub async fn start(&self) -> Result<(), ManagerError> {
        self.run(|svc, ctx| async move { start::start(&svc, &ctx).await })
            .await
    }

    /// Stops every managed service.
    ///
    /// Services end with start type `Disabled`.
    pub async fn stop(&self) -> Result<(), ManagerError> {
        self.run(|svc, ctx| async move { stop::stop(&svc, &ctx).await })
            .await
    }

    /// Stops and deletes every managed service, waiting until the host has
    /// removed them.
    pub async fn delete(&self) -> Result<(), ManagerError> {
        self.run(|svc, ctx| async move { delete::delete(svc, &ctx).await })
            .await
    }

    /// Sets every managed service to `Disabled` without touching its run state.
    pub async fn unmonitor(&self) -> Result<(), ManagerError> {
        self.run(|svc, ctx| async move { ctx.set_start_type(&svc, StartType::Disabled) })
            .await
    }

    /// Sets the named service (managed or not) to `Manual` so the host no
    /// longer starts it at boot.
    pub fn disable_auto_start(&self, name: &str) -> Result<(), ManagerError> {
        let svc = Service::open(self.ctx.scm.as_ref(), name)?;
        self.ctx.set_start_type(&svc, StartType::Manual)
    }

    /// Current state of every managed service, in listing order.
    ///
    /// The first failed query aborts the snapshot.
    pub fn status(&self) -> Result<Vec<ServiceSnapshot>, ManagerError> {
        self.discover()?
            .iter()
            .map(|svc| -> Result<ServiceSnapshot, ManagerError> {
                Ok(ServiceSnapshot {
                    name: svc.name().to_string(),
                    state: svc.query()?.state,
                })
            })
            .collect()
    }

    /// [`Health::Running`] when every managed service is running.
    pub fn health(&self) -> Health {
        match self.status() {
            Ok(all) if all.iter().all(|s| s.state == ServiceState::Running) => Health::Running,
            Ok(_) => Health::Failing,
            Err(e) => {
                tracing::debug!(error = %e, "reading service status failed");
                Health::Failing
            }
        }
    }

    fn discover(&self) -> Result<Vec<Service>, ManagerError> {
        discover(self.ctx.scm.as_ref(), &self.matcher, &self.ctx.bus)
    }

    async fn run<F, Fut>(&self, op: F) -> Result<(), ManagerError>
    where
        F: Fn(Service, Context) -> Fut,
        Fut: Future<Output = Result<(), ManagerError>> + Send + 'static,
    {
        let services = self.discover()?;
        for_each(services, &self.ctx.bus, |svc| op(svc, self.ctx.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::load::StaticLoad;
    use crate::scm::memory::{MemoryScm, Operation, ServiceSpec};

    fn manager(scm: &MemoryScm) -> Manager {
        Manager::builder(scm.clone())
            .with_matcher(Matcher::description("vcap"))
            .with_load_monitor(Arc::new(StaticLoad(10.0)))
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn health_rolls_up_states() {
        let scm = MemoryScm::new();
        let m = manager(&scm);
        assert_eq!(m.health(), Health::Running, "no services is healthy");

        scm.register(ServiceSpec::new("a", ServiceState::Running).with_description("vcap"));
        scm.register(ServiceSpec::new("b", ServiceState::Stopped).with_description("other"));
        assert_eq!(m.health(), Health::Running);

        scm.register(ServiceSpec::new("c", ServiceState::StartPending).with_description("vcap"));
        assert_eq!(m.health(), Health::Failing);
        let labels: Vec<_> = m.status().expect("status").iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["running", "starting"]);
    }

    #[tokio::test(start_paused = true)]
    async fn query_failure_makes_health_failing() {
        let scm = MemoryScm::new();
        scm.register(
            ServiceSpec::new("a", ServiceState::Running)
                .with_description("vcap")
                .failing(Operation::Query),
        );
        let m = manager(&scm);
        assert!(m.status().is_err());
        assert_eq!(m.health(), Health::Failing);
        assert_eq!(scm.open_handles("a"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disable_auto_start_targets_one_named_service() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("agent", ServiceState::Running));
        let m = manager(&scm);

        m.disable_auto_start("agent").expect("disable");
        assert_eq!(scm.start_type("agent"), Some(StartType::Manual));
        assert_eq!(scm.open_handles("agent"), 0);

        let err = m.disable_auto_start("ghost").expect_err("missing");
        assert!(matches!(
            err,
            ManagerError::Service {
                op: "opening service",
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unmonitor_disables_without_stopping() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("a", ServiceState::Running).with_description("vcap"));
        let m = manager(&scm);

        m.unmonitor().await.expect("unmonitor");
        assert_eq!(scm.start_type("a"), Some(StartType::Disabled));
        assert_eq!(scm.state("a"), Some(ServiceState::Running));
    }
}
