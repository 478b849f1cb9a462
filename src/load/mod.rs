//! # Host load sampling.
//!
//! Transition waits forgive a stalled checkpoint while the host is saturated.
//! The load figure comes from a [`LoadMonitor`]:
//! - [`StaticLoad`] a fixed value (tests, or to switch the heuristic off);
//! - [`CpuMonitor`] global CPU usage sampled with `sysinfo` on a background task.
//!
//! ## Lifecycle
//! ```text
//! CpuMonitor::spawn(interval)
//!     └─► tokio task: loop { refresh_cpu(); store usage; sleep(interval) }
//!                      └─ exits on stop() or when the monitor is dropped
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use sysinfo::System;
use tokio::time;
use tokio_util::sync::{CancellationToken, DropGuard};

/// sysinfo needs this much time between refreshes for a meaningful reading.
const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Source of the current host load, in percent (`0.0..=100.0`).
pub trait LoadMonitor: Send + Sync + 'static {
    fn current_load(&self) -> f64;
}

/// Constant load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticLoad(pub f64);

impl LoadMonitor for StaticLoad {
    fn current_load(&self) -> f64 {
        self.0
    }
}

/// Periodically sampled global CPU usage.
pub struct CpuMonitor {
    load: Arc<AtomicU32>,
    token: CancellationToken,
    _guard: DropGuard,
}

impl CpuMonitor {
    /// Starts sampling every `interval` on the current tokio runtime.
    ///
    /// The first value is `0.0` until two samples have been taken.
    pub fn spawn(interval: Duration) -> Arc<Self> {
        let load = Arc::new(AtomicU32::new(0f32.to_bits()));
        let token = CancellationToken::new();
        let interval = interval.max(MIN_SAMPLE_INTERVAL);

        let cell = Arc::clone(&load);
        let stop = token.clone();
        tokio::spawn(async move {
            let mut sys = System::new();
            loop {
                sys.refresh_cpu();
                let usage = sys.global_cpu_info().cpu_usage();
                cell.store(usage.to_bits(), Ordering::Relaxed);

                tokio::select! {
                    _ = time::sleep(interval) => {}
                    _ = stop.cancelled() => break,
                }
            }
            tracing::trace!("cpu monitor stopped");
        });

        Arc::new(Self {
            load,
            _guard: token.clone().drop_guard(),
            token,
        })
    }

    /// Stops the sampler; the last value stays readable.
    pub fn stop(&self) {
        self.token.cancel();
    }
}

impl LoadMonitor for CpuMonitor {
    fn current_load(&self) -> f64 {
        f64::from(f32::from_bits(self.load.load(Ordering::Relaxed)))
    }
}
