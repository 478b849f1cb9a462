//! Retry policies.
//!
//! This module groups the knobs that control **how often** a service start is
//! attempted and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RetryPolicy`]   attempt budget plus backoff
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized retries
//!
//! ## Quick wiring
//! ```text
//! ManagerConfig { start_retry: RetryPolicy, .. }
//!      └─► core::start::start uses:
//!           - max_attempts to bound the loop
//!           - backoff.next(attempt) to sleep between attempts
//! ```
//!
//! ## Defaults
//! - `RetryPolicy::default()` → 10 attempts, constant 1s between them.
//! - `JitterPolicy::None` by default.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
