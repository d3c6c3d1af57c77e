use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

use crate::coordinator::{FetchCoordinator, RefreshOptions};
use crate::debounce::FilterDebouncer;
use crate::types::RefreshReason;

struct SchedulerTasks {
    core: JoinHandle<()>,
    heatmap: JoinHandle<()>,
}

/// Drives the two periodic refresh cadences: a cheap core-metrics refresh
/// and an expensive standalone heat-map refresh. `start` is idempotent;
/// `stop` cancels both cadences plus any pending debounce timer and is safe
/// to call when not started.
pub struct AutoRefreshScheduler {
    coordinator: Arc<FetchCoordinator>,
    debouncer: Arc<FilterDebouncer>,
    core_interval: Duration,
    heatmap_interval: Duration,
    tasks: Mutex<Option<SchedulerTasks>>,
}

impl AutoRefreshScheduler {
    pub fn new(
        coordinator: Arc<FetchCoordinator>,
        debouncer: Arc<FilterDebouncer>,
        core_interval: Duration,
        heatmap_interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            debouncer,
            core_interval,
            heatmap_interval,
            tasks: Mutex::new(None),
        }
    }

    /// Start both cadences. A second call while running is a no-op, so
    /// duplicate timers cannot exist.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if tasks.is_some() {
            debug!("Auto-refresh already running");
            return;
        }

        let coordinator = Arc::clone(&self.coordinator);
        let core_interval = self.core_interval;
        let core = tokio::spawn(async move {
            // First tick lands one full interval out; the initial load is the
            // caller's job.
            let mut ticks = interval_at(Instant::now() + core_interval, core_interval);
            loop {
                ticks.tick().await;
                coordinator
                    .refresh(RefreshOptions {
                        include_heatmap: false,
                        reason: RefreshReason::AutoRefreshCore,
                    })
                    .await;
            }
        });

        let coordinator = Arc::clone(&self.coordinator);
        let heatmap_interval = self.heatmap_interval;
        let heatmap = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + heatmap_interval, heatmap_interval);
            loop {
                ticks.tick().await;
                coordinator
                    .refresh_heatmap(RefreshReason::AutoRefreshHeatmap)
                    .await;
            }
        });

        *tasks = Some(SchedulerTasks { core, heatmap });
        info!(
            core_secs = self.core_interval.as_secs(),
            heatmap_secs = self.heatmap_interval.as_secs(),
            "Auto-refresh started"
        );
    }

    /// Cancel all owned timers: both cadences and any armed debounce timer.
    /// No refresh fires after this returns, even if an interval was due.
    pub fn stop(&self) {
        if let Some(tasks) = self.tasks.lock().take() {
            tasks.core.abort();
            tasks.heatmap.abort();
            info!("Auto-refresh stopped");
        }
        self.debouncer.cancel_pending();
    }

    pub fn is_running(&self) -> bool {
        self.tasks.lock().is_some()
    }
}
