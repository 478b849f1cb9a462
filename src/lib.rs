//! # scmvisor
//!
//! **scmvisor** drives services registered with a host service control manager
//! (SCM) through start, stop and deletion, one or many at a time, on top of a
//! poll-only state protocol that is known to misbehave.
//!
//! It does not supervise processes itself: the host runs the services, and
//! scmvisor orchestrates their state transitions through a small capability
//! interface ([`ServiceControlManager`] / [`ServiceHandle`]).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                 ┌──────────────────────────────────────────┐
//!                 │  Manager (facade)                        │
//!                 │  - Matcher (description predicate)       │
//!                 │  - ManagerConfig (timings, retry budget) │
//!                 │  - LoadMonitor (CPU load heuristic)      │
//!                 │  - Bus (broadcast events)                │
//!                 └─────────────────┬────────────────────────┘
//!                                   ▼
//!                     discover(): list ─► open ─► describe ─► match
//!                                   ▼
//!                 for_each(): one tokio task per matched service
//!        ┌──────────────────────────┼──────────────────────────┐
//!        ▼                          ▼                          ▼
//!  ┌────────────┐            ┌────────────┐             ┌────────────┐
//!  │   start    │            │    stop    │             │   delete   │
//!  │ retry loop │            │  disable,  │             │ stop, mark,│
//!  │ + settle   │            │  confirm   │             │ poll reopen│
//!  └─────┬──────┘            └─────┬──────┘             └─────┬──────┘
//!        └─────────────────► wait_pending() ◄─────────────────┘
//!                      (checkpoint / wait hint / load grace)
//!                                   │
//!                                   ▼
//!                   ServiceControlManager (host capability)
//! ```
//!
//! ### Events
//! ```text
//! workers ── publish ──► Bus ──► subscriber listener ──► SubscriberSet ──► Subscribe impls
//!                          └───► Manager::events() receivers
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                          |
//! |-------------------|-----------------------------------------------------------------|---------------------------------------------|
//! | **Lifecycle**     | Start/stop/delete/unmonitor every matched service concurrently. | [`Manager`], [`ManagerBuilder`], [`Matcher`] |
//! | **Host boundary** | The SCM operations the manager calls into.                      | [`ServiceControlManager`], [`ServiceHandle`], [`Service`] |
//! | **Testing host**  | Scriptable in-memory SCM with open/close accounting.            | [`MemoryScm`], [`ServiceSpec`]              |
//! | **Load**          | Host load used to forgive stalls on a saturated machine.        | [`LoadMonitor`], [`CpuMonitor`], [`StaticLoad`] |
//! | **Policies**      | Attempt budget and delay for start retries.                     | [`RetryPolicy`], [`BackoffPolicy`]          |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).          | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for host calls and lifecycle outcomes.             | [`ScmError`], [`ManagerError`]              |
//! | **Configuration** | Centralize timing settings.                                     | [`ManagerConfig`]                           |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber rendering events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use scmvisor::{Health, Manager, Matcher, MemoryScm, ServiceSpec, ServiceState, StaticLoad};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scm = MemoryScm::new();
//!     scm.register(ServiceSpec::new("web", ServiceState::Stopped).with_description("vcap"));
//!     scm.register(ServiceSpec::new("db", ServiceState::Stopped).with_description("vcap"));
//!     scm.register(ServiceSpec::new("spooler", ServiceState::Running));
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn scmvisor::Subscribe>> = vec![Arc::new(scmvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn scmvisor::Subscribe>> = Vec::new();
//!
//!     let manager = Manager::builder(scm.clone())
//!         .with_matcher(Matcher::description("vcap"))
//!         .with_load_monitor(Arc::new(StaticLoad(0.0)))
//!         .with_subscribers(subs)
//!         .build();
//!
//!     manager.start().await?;
//!     assert_eq!(manager.health(), Health::Running);
//!
//!     manager.delete().await?;
//!     assert!(!scm.exists("web") && !scm.exists("db"));
//!     assert!(scm.exists("spooler"));
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod load;
mod policies;
mod scm;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    Health, Manager, ManagerBuilder, ManagerConfig, Matcher, ServiceSnapshot, wait_hint,
};
pub use error::{ManagerError, ScmError};
pub use events::{Bus, Event, EventKind};
pub use load::{CpuMonitor, LoadMonitor, StaticLoad};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use scm::memory::{MemoryScm, Operation, ServiceSpec};
pub use scm::{
    Control, Service, ServiceControlManager, ServiceHandle, ServiceState, ServiceStatus, StartType,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
