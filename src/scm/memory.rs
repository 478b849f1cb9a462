//! # In-memory service control manager.
//!
//! [`MemoryScm`] implements [`ServiceControlManager`] over a map of scripted
//! services. It models the host behaviors the manager has to cope with:
//! - pending states that resolve over several polls (status scripts);
//! - checkpoints that keep advancing while a transition never finishes;
//! - control calls that return no status;
//! - deletion that the host only completes some polls later;
//! - per-operation failures (access denied and friends).
//!
//! It also keeps open/close accounting so callers can check that every handle
//! was released exactly once.
//!
//! ## Example
//! ```rust
//! use scmvisor::{MemoryScm, ServiceSpec, ServiceState, ServiceStatus};
//!
//! let scm = MemoryScm::new();
//! scm.register(
//!     ServiceSpec::new("web", ServiceState::Stopped)
//!         .with_description("vcap")
//!         .on_start(
//!             Some(ServiceStatus::new(ServiceState::StartPending)),
//!             [ServiceStatus::new(ServiceState::Running)],
//!         ),
//! );
//! assert_eq!(scm.state("web"), Some(ServiceState::Stopped));
//! ```

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ScmError;
use crate::scm::handle::{ServiceControlManager, ServiceHandle};
use crate::scm::status::{Control, ServiceState, ServiceStatus, StartType};

/// Host operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Open,
    Query,
    Describe,
    StartType,
    SetStartType,
    Control,
    Delete,
    Close,
}

/// Reply of a service to a control request.
#[derive(Debug, Clone, Default)]
struct Reaction {
    /// Status returned by the control call (and adopted as current).
    reply: Option<ServiceStatus>,
    /// Statuses returned by the following queries, in order.
    then: Vec<ServiceStatus>,
}

/// Description of one scripted service.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    name: String,
    description: String,
    start_type: StartType,
    status: ServiceStatus,
    script: Vec<ServiceStatus>,
    on_start: Reaction,
    on_stop: Reaction,
    advancing: bool,
    delete_after: u32,
    failing: HashSet<Operation>,
    rejections: HashMap<Control, ScmError>,
}

impl ServiceSpec {
    /// A service in `state` that starts and stops instantly.
    pub fn new(name: impl Into<String>, state: ServiceState) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            start_type: StartType::Automatic,
            status: ServiceStatus::new(state),
            script: Vec::new(),
            on_start: Reaction {
                reply: Some(ServiceStatus::new(ServiceState::Running)),
                then: Vec::new(),
            },
            on_stop: Reaction {
                reply: Some(ServiceStatus::new(ServiceState::Stopped)),
                then: Vec::new(),
            },
            advancing: false,
            delete_after: 0,
            failing: HashSet::new(),
            rejections: HashMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_start_type(mut self, start_type: StartType) -> Self {
        self.start_type = start_type;
        self
    }

    /// Replaces the initial status (checkpoint and wait hint included).
    pub fn with_status(mut self, status: ServiceStatus) -> Self {
        self.status = status;
        self
    }

    /// Statuses returned by the first queries, before any control request.
    pub fn with_script(mut self, statuses: impl IntoIterator<Item = ServiceStatus>) -> Self {
        self.script = statuses.into_iter().collect();
        self
    }

    /// How the service answers a start request.
    pub fn on_start(
        mut self,
        reply: Option<ServiceStatus>,
        then: impl IntoIterator<Item = ServiceStatus>,
    ) -> Self {
        self.on_start = Reaction {
            reply,
            then: then.into_iter().collect(),
        };
        self
    }

    /// How the service answers a stop request.
    pub fn on_stop(
        mut self,
        reply: Option<ServiceStatus>,
        then: impl IntoIterator<Item = ServiceStatus>,
    ) -> Self {
        self.on_stop = Reaction {
            reply,
            then: then.into_iter().collect(),
        };
        self
    }

    /// Bumps the checkpoint on every unscripted query while pending.
    pub fn advancing(mut self) -> Self {
        self.advancing = true;
        self
    }

    /// Number of re-opens that still succeed after the service was marked
    /// for deletion.
    pub fn deleted_after(mut self, reopens: u32) -> Self {
        self.delete_after = reopens;
        self
    }

    /// Makes `op` fail for this service.
    pub fn failing(mut self, op: Operation) -> Self {
        self.failing.insert(op);
        self
    }

    /// Answers every `control` request with `err`, leaving the state untouched.
    pub fn rejecting(mut self, control: Control, err: ScmError) -> Self {
        self.rejections.insert(control, err);
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    open_attempts: u32,
    opens: u32,
    closes: u32,
    queries: u32,
    controls: HashMap<Control, u32>,
}

#[derive(Debug)]
struct Entry {
    spec: ServiceSpec,
    current: ServiceStatus,
    pending: VecDeque<ServiceStatus>,
    marked: Option<u32>,
    removed: bool,
    open_handles: u32,
    counters: Counters,
}

impl Entry {
    fn fail(&self, op: Operation) -> Result<(), ScmError> {
        if self.spec.failing.contains(&op) {
            let err = match op {
                Operation::Open | Operation::Describe => ScmError::AccessDenied,
                other => ScmError::Host(format!("{other:?} failed")),
            };
            return Err(err);
        }
        Ok(())
    }

    fn react(&mut self, control: Control) -> Option<ServiceStatus> {
        let reaction = match control {
            Control::Start => self.spec.on_start.clone(),
            Control::Stop => self.spec.on_stop.clone(),
        };
        if let Some(st) = reaction.reply {
            self.current = st;
        }
        self.pending = reaction.then.into();
        reaction.reply
    }
}

type Shared = Arc<Mutex<Entry>>;

/// Scriptable in-memory host.
///
/// Cloning is cheap; clones share the same services.
#[derive(Clone, Default)]
pub struct MemoryScm {
    services: Arc<Mutex<BTreeMap<String, Shared>>>,
    listing_error: Arc<Mutex<Option<ScmError>>>,
}

impl MemoryScm {
    /// Empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a service.
    pub fn register(&self, spec: ServiceSpec) {
        let entry = Entry {
            current: spec.status,
            pending: spec.script.iter().copied().collect(),
            spec,
            marked: None,
            removed: false,
            open_handles: 0,
            counters: Counters::default(),
        };
        self.services
            .lock()
            .insert(entry.spec.name.clone(), Arc::new(Mutex::new(entry)));
    }

    /// Makes [`ServiceControlManager::list_services`] fail.
    pub fn fail_listing(&self, err: ScmError) {
        *self.listing_error.lock() = Some(err);
    }

    fn with<T>(&self, name: &str, f: impl FnOnce(&Entry) -> T) -> Option<T> {
        let entry = self.services.lock().get(name).cloned()?;
        let guard = entry.lock();
        Some(f(&guard))
    }

    /// True while the service is registered and not yet deleted.
    pub fn exists(&self, name: &str) -> bool {
        self.with(name, |e| !e.removed).unwrap_or(false)
    }

    /// Current state, if the service exists.
    pub fn state(&self, name: &str) -> Option<ServiceState> {
        self.with(name, |e| (!e.removed).then_some(e.current.state))
            .flatten()
    }

    /// Configured start type.
    pub fn start_type(&self, name: &str) -> Option<StartType> {
        self.with(name, |e| e.spec.start_type)
    }

    /// Handles currently open.
    pub fn open_handles(&self, name: &str) -> u32 {
        self.with(name, |e| e.open_handles).unwrap_or(0)
    }

    /// Open calls, successful or not.
    pub fn open_attempts(&self, name: &str) -> u32 {
        self.with(name, |e| e.counters.open_attempts).unwrap_or(0)
    }

    /// Successful opens.
    pub fn opens(&self, name: &str) -> u32 {
        self.with(name, |e| e.counters.opens).unwrap_or(0)
    }

    /// Handle closes.
    pub fn closes(&self, name: &str) -> u32 {
        self.with(name, |e| e.counters.closes).unwrap_or(0)
    }

    /// Status queries.
    pub fn queries(&self, name: &str) -> u32 {
        self.with(name, |e| e.counters.queries).unwrap_or(0)
    }

    /// Control requests of the given kind.
    pub fn controls(&self, name: &str, control: Control) -> u32 {
        self.with(name, |e| e.counters.controls.get(&control).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl ServiceControlManager for MemoryScm {
    fn list_services(&self) -> Result<Vec<String>, ScmError> {
        if let Some(err) = self.listing_error.lock().clone() {
            return Err(err);
        }
        let services = self.services.lock();
        Ok(services
            .iter()
            .filter(|(_, e)| !e.lock().removed)
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn open(&self, name: &str) -> Result<Box<dyn ServiceHandle>, ScmError> {
        let entry = self
            .services
            .lock()
            .get(name)
            .cloned()
            .ok_or(ScmError::NotFound)?;
        {
            let mut e = entry.lock();
            e.counters.open_attempts += 1;
            if e.removed {
                return Err(ScmError::NotFound);
            }
            match e.marked {
                Some(0) => {
                    e.removed = true;
                    return Err(ScmError::NotFound);
                }
                Some(n) => e.marked = Some(n - 1),
                None => {}
            }
            e.fail(Operation::Open)?;
            e.counters.opens += 1;
            e.open_handles += 1;
        }
        Ok(Box::new(MemoryHandle {
            name: name.to_string(),
            entry,
            open: true,
        }))
    }
}

struct MemoryHandle {
    name: String,
    entry: Shared,
    open: bool,
}

impl MemoryHandle {
    fn live(&self) -> Result<(), ScmError> {
        if self.open {
            Ok(())
        } else {
            Err(ScmError::InvalidHandle)
        }
    }
}

impl ServiceHandle for MemoryHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self) -> Result<ServiceStatus, ScmError> {
        self.live()?;
        let mut e = self.entry.lock();
        e.counters.queries += 1;
        e.fail(Operation::Query)?;
        if let Some(next) = e.pending.pop_front() {
            e.current = next;
        } else if e.spec.advancing && e.current.state.is_pending() {
            e.current.checkpoint = e.current.checkpoint.wrapping_add(1);
        }
        Ok(e.current)
    }

    fn describe(&self) -> Result<String, ScmError> {
        self.live()?;
        let e = self.entry.lock();
        e.fail(Operation::Describe)?;
        Ok(e.spec.description.clone())
    }

    fn start_type(&self) -> Result<StartType, ScmError> {
        self.live()?;
        let e = self.entry.lock();
        e.fail(Operation::StartType)?;
        Ok(e.spec.start_type)
    }

    fn set_start_type(&self, start_type: StartType) -> Result<(), ScmError> {
        self.live()?;
        let mut e = self.entry.lock();
        e.fail(Operation::SetStartType)?;
        if e.marked.is_some() {
            return Err(ScmError::MarkedForDelete);
        }
        e.spec.start_type = start_type;
        Ok(())
    }

    fn control(&self, control: Control) -> Result<Option<ServiceStatus>, ScmError> {
        self.live()?;
        let mut e = self.entry.lock();
        *e.counters.controls.entry(control).or_default() += 1;
        e.fail(Operation::Control)?;
        if let Some(err) = e.spec.rejections.get(&control) {
            return Err(err.clone());
        }
        match control {
            Control::Start => {
                if e.spec.start_type == StartType::Disabled {
                    return Err(ScmError::Disabled);
                }
                if e.current.state == ServiceState::Running {
                    return Err(ScmError::AlreadyRunning);
                }
            }
            Control::Stop => {
                if e.current.state == ServiceState::Stopped {
                    return Err(ScmError::Host("the service has not been started".into()));
                }
            }
        }
        Ok(e.react(control))
    }

    fn mark_for_deletion(&self) -> Result<(), ScmError> {
        self.live()?;
        let mut e = self.entry.lock();
        e.fail(Operation::Delete)?;
        if e.marked.is_some() {
            return Err(ScmError::MarkedForDelete);
        }
        e.marked = Some(e.spec.delete_after);
        Ok(())
    }

    fn close(&mut self) -> Result<(), ScmError> {
        self.live()?;
        self.open = false;
        let mut e = self.entry.lock();
        e.open_handles = e.open_handles.saturating_sub(1);
        e.counters.closes += 1;
        e.fail(Operation::Close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_reaction_replays_script_then_holds_last_status() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("web", ServiceState::Stopped).on_start(
            Some(ServiceStatus::new(ServiceState::StartPending)),
            [
                ServiceStatus::new(ServiceState::StartPending),
                ServiceStatus::new(ServiceState::Running),
            ],
        ));

        let h = scm.open("web").expect("open");
        let reply = h.control(Control::Start).expect("start");
        assert_eq!(reply.map(|s| s.state), Some(ServiceState::StartPending));
        assert_eq!(h.query().expect("q1").state, ServiceState::StartPending);
        assert_eq!(h.query().expect("q2").state, ServiceState::Running);
        assert_eq!(h.query().expect("q3").state, ServiceState::Running);
        assert_eq!(scm.controls("web", Control::Start), 1);
    }

    #[test]
    fn advancing_service_bumps_checkpoint_while_pending() {
        let scm = MemoryScm::new();
        scm.register(
            ServiceSpec::new("web", ServiceState::StartPending).advancing(),
        );
        let h = scm.open("web").expect("open");
        let a = h.query().expect("q1").checkpoint;
        let b = h.query().expect("q2").checkpoint;
        assert!(b > a);
    }

    #[test]
    fn deletion_completes_after_configured_reopens() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("web", ServiceState::Stopped).deleted_after(2));

        let mut h = scm.open("web").expect("open");
        h.mark_for_deletion().expect("mark");
        h.close().expect("close");

        assert!(scm.open("web").is_ok());
        assert!(scm.open("web").is_ok());
        assert!(matches!(scm.open("web"), Err(ScmError::NotFound)));
        assert!(!scm.exists("web"));
        assert!(scm.list_services().expect("list").is_empty());
        assert_eq!(scm.open_attempts("web"), 4);
    }

    #[test]
    fn closed_handle_rejects_calls() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("web", ServiceState::Stopped));
        let mut h = scm.open("web").expect("open");
        h.close().expect("close");
        assert_eq!(h.query(), Err(ScmError::InvalidHandle));
        assert_eq!(h.close(), Err(ScmError::InvalidHandle));
        assert_eq!(scm.closes("web"), 1);
    }

    #[test]
    fn disabled_service_cannot_start() {
        let scm = MemoryScm::new();
        scm.register(
            ServiceSpec::new("web", ServiceState::Stopped).with_start_type(StartType::Disabled),
        );
        let h = scm.open("web").expect("open");
        assert_eq!(h.control(Control::Start), Err(ScmError::Disabled));
    }
}
