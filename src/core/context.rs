//! Shared state handed to every per-service worker.

use std::sync::Arc;

use crate::core::config::ManagerConfig;
use crate::error::ManagerError;
use crate::events::{Bus, Event, EventKind};
use crate::load::LoadMonitor;
use crate::scm::{Service, ServiceControlManager, StartType};

/// Cloned into each worker; everything inside is shared and read-only.
#[derive(Clone)]
pub(crate) struct Context {
    pub cfg: Arc<ManagerConfig>,
    pub scm: Arc<dyn ServiceControlManager>,
    pub load: Arc<dyn LoadMonitor>,
    pub bus: Bus,
}

impl Context {
    pub fn publish(&self, ev: Event) {
        self.bus.publish(ev);
    }

    /// Sets the start type and reports an actual change on the bus.
    pub fn set_start_type(&self, svc: &Service, start_type: StartType) -> Result<(), ManagerError> {
        if svc.set_start_type(start_type)? {
            self.publish(
                Event::new(EventKind::StartTypeChanged)
                    .with_service(svc.name())
                    .with_start_type(start_type),
            );
        }
        Ok(())
    }
}
