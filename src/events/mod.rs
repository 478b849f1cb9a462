//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by discovery, the per-service
//! lifecycles and the subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `core::discovery`, `core::start`, `core::stop`,
//!   `core::delete`, `core::wait`, `core::fanout`, `SubscriberSet` workers.
//! - **Consumers**: the manager's subscriber listener (fans out to
//!   `SubscriberSet`) and any receiver obtained from `Manager::events`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
