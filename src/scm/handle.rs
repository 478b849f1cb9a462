//! # Host capability traits and the owned service handle.
//!
//! The manager never talks to the host directly; it consumes two traits:
//! - [`ServiceControlManager`] lists and opens services;
//! - [`ServiceHandle`] is one open service.
//!
//! [`Service`] owns a boxed handle and guarantees it is closed exactly once,
//! either through [`Service::close`] or on drop. Its methods wrap host errors
//! into [`ManagerError::Service`] with the operation and service name attached.

use std::fmt;

use crate::error::{ManagerError, ScmError};
use crate::scm::status::{Control, ServiceStatus, StartType};

/// Connection to the host service control manager.
pub trait ServiceControlManager: Send + Sync + 'static {
    /// Names of every service registered with the host.
    fn list_services(&self) -> Result<Vec<String>, ScmError>;

    /// Opens the named service.
    fn open(&self, name: &str) -> Result<Box<dyn ServiceHandle>, ScmError>;
}

/// One open service.
///
/// Implementations are called from concurrent workers but each handle is only
/// ever used by one worker at a time.
pub trait ServiceHandle: Send + Sync {
    /// Name the handle was opened with.
    fn name(&self) -> &str;

    /// Current status.
    fn query(&self) -> Result<ServiceStatus, ScmError>;

    /// Configured description text.
    fn describe(&self) -> Result<String, ScmError>;

    /// Configured start type.
    fn start_type(&self) -> Result<StartType, ScmError>;

    /// Updates the configured start type.
    fn set_start_type(&self, start_type: StartType) -> Result<(), ScmError>;

    /// Sends a control request.
    ///
    /// Some hosts return no status for this call; that is `Ok(None)`.
    fn control(&self, control: Control) -> Result<Option<ServiceStatus>, ScmError>;

    /// Marks the service for deletion. The host removes it once every handle
    /// to it is closed.
    fn mark_for_deletion(&self) -> Result<(), ScmError>;

    /// Releases the handle.
    fn close(&mut self) -> Result<(), ScmError>;
}

/// Open service owned by exactly one caller.
pub struct Service {
    handle: Box<dyn ServiceHandle>,
    name: String,
    closed: bool,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Service {
    /// Opens `name` on `scm`.
    pub fn open(scm: &dyn ServiceControlManager, name: &str) -> Result<Self, ManagerError> {
        scm.open(name)
            .map(Self::from_handle)
            .map_err(|e| ManagerError::service("opening service", name, e))
    }

    /// Takes ownership of an already open handle.
    pub fn from_handle(handle: Box<dyn ServiceHandle>) -> Self {
        let name = handle.name().to_string();
        Self {
            handle,
            name,
            closed: false,
        }
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queries the current status.
    pub fn query(&self) -> Result<ServiceStatus, ManagerError> {
        self.handle
            .query()
            .map_err(|e| ManagerError::service("querying status of service", &self.name, e))
    }

    /// Reads the description, without wrapping the host error.
    pub(crate) fn describe(&self) -> Result<String, ScmError> {
        self.handle.describe()
    }

    /// Sets the start type, skipping the update when it already matches.
    ///
    /// Returns `true` when the host configuration was changed.
    pub fn set_start_type(&self, start_type: StartType) -> Result<bool, ManagerError> {
        let current = self
            .handle
            .start_type()
            .map_err(|e| ManagerError::service("querying config for service", &self.name, e))?;
        if current == start_type {
            return Ok(false);
        }
        self.handle
            .set_start_type(start_type)
            .map_err(|e| ManagerError::service("updating config for service", &self.name, e))?;
        Ok(true)
    }

    /// Sends a control request, returning the raw host result.
    pub(crate) fn control(&self, control: Control) -> Result<Option<ServiceStatus>, ScmError> {
        self.handle.control(control)
    }

    /// Marks the service for deletion.
    pub(crate) fn mark_for_deletion(&self) -> Result<(), ManagerError> {
        self.handle
            .mark_for_deletion()
            .map_err(|e| ManagerError::service("deleting service", &self.name, e))
    }

    /// Closes the handle now and reports the host result.
    pub fn close(mut self) -> Result<(), ScmError> {
        self.closed = true;
        self.handle.close()
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.handle.close() {
            tracing::debug!(service = %self.name, error = %e, "closing service handle failed");
        }
    }
}
