//! Lifecycle core: discovery, fan-out and the per-service state machines.
//!
//! The public API from this module is [`Manager`] (built with
//! [`ManagerBuilder`]), its [`ManagerConfig`], the [`Matcher`] predicate and
//! the [`wait_hint`] helper.
//!
//! Internal modules:
//! - [`wait`]: polls a service out of a pending state;
//! - [`discovery`]: lists, opens and filters services;
//! - [`fanout`]: runs one operation on every service concurrently;
//! - [`start`], [`stop`], [`delete`]: per-service lifecycles;
//! - [`context`]: shared state handed to every worker.

mod builder;
mod config;
mod context;
mod delete;
mod discovery;
mod fanout;
mod manager;
mod start;
mod stop;
mod wait;

pub use builder::ManagerBuilder;
pub use config::ManagerConfig;
pub use discovery::Matcher;
pub use manager::{Health, Manager, ServiceSnapshot};
pub use wait::wait_hint;
