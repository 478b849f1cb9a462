use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{
    core::{ManagerConfig, context::Context, discovery::Matcher, manager::Manager},
    events::Bus,
    load::{CpuMonitor, LoadMonitor},
    scm::ServiceControlManager,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Manager`].
pub struct ManagerBuilder {
    scm: Arc<dyn ServiceControlManager>,
    cfg: ManagerConfig,
    matcher: Matcher,
    load: Option<Arc<dyn LoadMonitor>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ManagerBuilder {
    /// Creates a builder over `scm` with default configuration, managing every service.
    pub fn new<S: ServiceControlManager>(scm: S) -> Self {
        Self {
            scm: Arc::new(scm),
            cfg: ManagerConfig::default(),
            matcher: Matcher::all(),
            load: None,
            subscribers: Vec::new(),
        }
    }

    pub fn with_config(mut self, cfg: ManagerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Selects the services to manage by description.
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Replaces the built-in CPU sampler.
    ///
    /// A [`StaticLoad`](crate::StaticLoad) makes the stall heuristic deterministic.
    pub fn with_load_monitor(mut self, load: Arc<dyn LoadMonitor>) -> Self {
        self.load = Some(load);
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the manager.
    ///
    /// Must be called from within a tokio runtime: the CPU sampler (unless a
    /// load monitor was injected) and the subscriber workers are spawned here.
    /// Both stop when the manager is dropped.
    pub fn build(self) -> Manager {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let load: Arc<dyn LoadMonitor> = match self.load {
            Some(load) => load,
            None => CpuMonitor::spawn(self.cfg.load_sample_interval),
        };

        let listener = (!self.subscribers.is_empty()).then(|| {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            subscriber_listener(&bus, subs)
        });

        let ctx = Context {
            cfg: Arc::new(self.cfg),
            scm: self.scm,
            load,
            bus,
        };
        Manager::new_internal(ctx, self.matcher, listener)
    }
}

/// Forwards bus events to the subscriber set until the returned guard drops.
///
/// Overflow and panic events stay on the bus; feeding them back to the
/// subscribers that caused them would loop.
fn subscriber_listener(bus: &Bus, subs: SubscriberSet) -> DropGuard {
    let token = CancellationToken::new();
    let stop = token.clone();
    let mut rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) if ev.is_subscriber_event() => {}
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged, events lost");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        subs.shutdown().await;
    });
    token.drop_guard()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::events::{Event, EventKind};
    use crate::load::StaticLoad;
    use crate::scm::ServiceState;
    use crate::scm::memory::{MemoryScm, ServiceSpec};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn subscribers_see_lifecycle_events() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("web", ServiceState::Running));
        let rec = Arc::new(Recorder::default());

        let manager = ManagerBuilder::new(scm)
            .with_load_monitor(Arc::new(StaticLoad(0.0)))
            .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
            .build();
        manager.stop().await.expect("stop");

        for _ in 0..100 {
            if rec.seen.lock().contains(&EventKind::ServiceStopped) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let seen = rec.seen.lock().clone();
        assert!(seen.contains(&EventKind::StartTypeChanged), "{seen:?}");
        assert!(seen.contains(&EventKind::ServiceStopped), "{seen:?}");
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn panicking_subscriber_reports_once_per_event() {
        let scm = MemoryScm::new();
        scm.register(ServiceSpec::new("web", ServiceState::Running));

        let manager = ManagerBuilder::new(scm)
            .with_load_monitor(Arc::new(StaticLoad(0.0)))
            .with_subscribers(vec![Arc::new(Panicky) as Arc<dyn Subscribe>])
            .build();
        let mut rx = manager.events();
        manager.stop().await.expect("stop");
        tokio::time::sleep(Duration::from_millis(300)).await;

        let mut lifecycle = 0;
        let mut panics = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::SubscriberPanicked {
                panics += 1;
            } else {
                lifecycle += 1;
            }
        }
        // StartTypeChanged and ServiceStopped, one panic each.
        assert_eq!(lifecycle, 2);
        assert_eq!(panics, 2);
    }

    #[tokio::test]
    async fn config_is_exposed() {
        let cfg = ManagerConfig {
            grace_cycles: 3,
            ..ManagerConfig::default()
        };
        let manager = ManagerBuilder::new(MemoryScm::new())
            .with_config(cfg)
            .with_load_monitor(Arc::new(StaticLoad(0.0)))
            .build();
        assert_eq!(manager.config().grace_cycles, 3);
    }
}
