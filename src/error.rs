//! Error types used by the service manager and the host capability.
//!
//! This module defines two error enums:
//!
//! - [`ScmError`]: failures reported by the host service control manager.
//! - [`ManagerError`]: failures of a lifecycle operation on one service
//!   (or of discovery), carrying enough context to be logged on its own.
//!
//! Both provide `as_label` for logs/metrics; [`ManagerError::is_retryable`]
//! tells the start loop which failures deserve another attempt.

use std::time::Duration;
use thiserror::Error;

use crate::scm::{ServiceState, ServiceStatus};

/// # Errors reported by the host service control manager.
///
/// The variants cover the conditions the manager reacts to explicitly;
/// everything else is carried verbatim in [`ScmError::Host`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScmError {
    /// The named service does not exist (or no longer exists).
    #[error("service does not exist")]
    NotFound,

    /// The caller is not allowed to open or change the service.
    #[error("access denied")]
    AccessDenied,

    /// A start was requested for a service that is already running.
    #[error("an instance of the service is already running")]
    AlreadyRunning,

    /// The service cannot be started because its start type is disabled.
    #[error("the service is disabled")]
    Disabled,

    /// The service has been marked for deletion.
    #[error("the service has been marked for deletion")]
    MarkedForDelete,

    /// The handle was already closed.
    #[error("the handle is invalid")]
    InvalidHandle,

    /// Any other host failure.
    #[error("{0}")]
    Host(String),
}

impl ScmError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ScmError::NotFound => "scm_not_found",
            ScmError::AccessDenied => "scm_access_denied",
            ScmError::AlreadyRunning => "scm_already_running",
            ScmError::Disabled => "scm_disabled",
            ScmError::MarkedForDelete => "scm_marked_for_delete",
            ScmError::InvalidHandle => "scm_invalid_handle",
            ScmError::Host(_) => "scm_host",
        }
    }
}

/// # Errors produced by lifecycle operations.
///
/// Only [`ManagerError::Start`] is retried (by the start loop); every other
/// variant is fatal for the service it concerns.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ManagerError {
    /// A host call failed.
    #[error("{op} {name}: {source}")]
    Service {
        /// What was being done, e.g. `"querying status of service"`.
        op: &'static str,
        /// Service name.
        name: String,
        /// The host error.
        #[source]
        source: ScmError,
    },

    /// The absolute ceiling for a state transition was exceeded.
    #[error(
        "timeout waiting for state transition: service {name} status {status} wait hint {wait_hint:?} after {elapsed:?}"
    )]
    TransitionTimeout {
        /// Service name.
        name: String,
        /// Last observed status.
        status: ServiceStatus,
        /// Wait hint in effect at the time of failure.
        wait_hint: Duration,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// The checkpoint did not advance within the wait hint.
    #[error(
        "no progress waiting for state transition: service {name} status {status} wait hint {wait_hint:?} after {elapsed:?}"
    )]
    NoProgress {
        /// Service name.
        name: String,
        /// Last observed status.
        status: ServiceStatus,
        /// Wait hint in effect at the time of failure.
        wait_hint: Duration,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// The service was started but could not be confirmed running.
    #[error("failed to start service {name}: status {status}")]
    Start {
        /// Service name.
        name: String,
        /// Status observed when the start was given up.
        status: ServiceStatus,
    },

    /// A stop or delete confirmation ceiling was exceeded.
    #[error("{op} {name}: timed out after {elapsed:?} (limit {limit:?})")]
    Timeout {
        /// What was being done.
        op: &'static str,
        /// Service name.
        name: String,
        /// Configured ceiling.
        limit: Duration,
        /// Time actually spent.
        elapsed: Duration,
    },

    /// Listing the services known to the host failed.
    #[error("listing services: {source}")]
    Listing {
        /// The host error.
        #[source]
        source: ScmError,
    },

    /// A transition wait was requested for a state that is not pending.
    #[error("invalid pending state: {state}")]
    InvalidPendingState {
        /// The offending state.
        state: ServiceState,
    },

    /// A fan-out worker panicked or was aborted.
    #[error("service worker failed: {reason}")]
    Worker {
        /// Panic or join failure description.
        reason: String,
    },
}

impl ManagerError {
    pub(crate) fn service(op: &'static str, name: impl Into<String>, source: ScmError) -> Self {
        ManagerError::Service {
            op,
            name: name.into(),
            source,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use scmvisor::{ManagerError, ServiceStatus};
    ///
    /// let err = ManagerError::Start { name: "web".into(), status: ServiceStatus::default() };
    /// assert_eq!(err.as_label(), "service_start");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ManagerError::Service { .. } => "service_call",
            ManagerError::TransitionTimeout { .. } => "service_transition_timeout",
            ManagerError::NoProgress { .. } => "service_no_progress",
            ManagerError::Start { .. } => "service_start",
            ManagerError::Timeout { .. } => "service_timeout",
            ManagerError::Listing { .. } => "service_listing",
            ManagerError::InvalidPendingState { .. } => "service_invalid_pending_state",
            ManagerError::Worker { .. } => "service_worker",
        }
    }

    /// Name of the service the error concerns, if any.
    pub fn service_name(&self) -> Option<&str> {
        match self {
            ManagerError::Service { name, .. }
            | ManagerError::TransitionTimeout { name, .. }
            | ManagerError::NoProgress { name, .. }
            | ManagerError::Start { name, .. }
            | ManagerError::Timeout { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Indicates whether the start loop may try again.
    ///
    /// Returns `true` only for [`ManagerError::Start`].
    ///
    /// # Example
    /// ```
    /// use scmvisor::{ManagerError, ScmError, ServiceStatus};
    ///
    /// let retry = ManagerError::Start { name: "web".into(), status: ServiceStatus::default() };
    /// assert!(retry.is_retryable());
    ///
    /// let fatal = ManagerError::Listing { source: ScmError::AccessDenied };
    /// assert!(!fatal.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, ManagerError::Start { .. })
    }
}
