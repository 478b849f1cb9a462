//! # Event subscribers.
//!
//! ```text
//! lifecycle worker ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                               │
//!                                                  ┌────────────┼────────────┐
//!                                                  ▼            ▼            ▼
//!                                              LogWriter     Metrics      Custom
//! ```
//!
//! - [`Subscribe`] trait for custom handlers
//! - [`SubscriberSet`] per-subscriber queues and workers
//! - `LogWriter` (feature `logging`) renders events through `tracing`

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
