//! Host service control manager capability.
//!
//! ## Contents
//! - [`ServiceControlManager`], [`ServiceHandle`] the host surface the manager calls into
//! - [`Service`] owned handle, closed exactly once
//! - [`ServiceStatus`], [`ServiceState`], [`StartType`], [`Control`] value types
//! - [`memory`] scriptable in-memory host

mod handle;
pub mod memory;
mod status;

pub use handle::{Service, ServiceControlManager, ServiceHandle};
pub use status::{Control, ServiceState, ServiceStatus, StartType};
