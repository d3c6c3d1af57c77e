use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::LoadingFlagPolicy;
use crate::emitter::MetricEmitter;
use crate::source::{RemoteSource, SourceError};
use crate::types::{
    DashboardPayload, DashboardSnapshot, FetchKey, FilterState, RefreshReason,
};

/// Options for one coordinated refresh.
#[derive(Debug, Clone, Copy)]
pub struct RefreshOptions {
    pub include_heatmap: bool,
    pub reason: RefreshReason,
}

/// Which endpoint shape a refresh uses. Selected once at construction from
/// the capability flag so `refresh` stays linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchStrategy {
    /// One combined dashboard call.
    Combined,
    /// Four concurrent split calls, plus a fifth for the heat-map.
    Split,
}

impl FetchStrategy {
    /// Execute the refresh against the source. Returns the merged payload
    /// and the number of network calls made (1 combined, 4 or 5 split).
    async fn execute(
        &self,
        source: &dyn RemoteSource,
        filter: &FilterState,
        include_heatmap: bool,
        heatmap_days: u32,
    ) -> Result<(DashboardPayload, u32), SourceError> {
        match self {
            FetchStrategy::Combined => source
                .fetch_dashboard(filter, heatmap_days, include_heatmap)
                .await
                .map(|payload| (payload, 1)),
            FetchStrategy::Split => {
                let (summary, trends, model_stats, project_stats) = tokio::join!(
                    source.fetch_summary(filter),
                    source.fetch_trends(filter),
                    source.fetch_model_stats(filter),
                    source.fetch_project_stats(filter),
                );
                let mut payload = DashboardPayload {
                    summary: summary?,
                    trends: trends?,
                    model_stats: model_stats?,
                    project_stats: project_stats?,
                    heatmap: None,
                };
                let mut calls = 4;
                if include_heatmap {
                    payload.heatmap =
                        Some(source.fetch_heatmap(filter.platform, heatmap_days).await?);
                    calls += 1;
                }
                Ok((payload, calls))
            }
        }
    }
}

struct CoordinatorInner {
    source: Arc<dyn RemoteSource>,
    strategy: FetchStrategy,
    loading_flag_policy: LoadingFlagPolicy,
    heatmap_days: u32,
    filter: Arc<RwLock<FilterState>>,
    /// Monotonic id handed to each started refresh; a completion whose id is
    /// no longer current is discarded.
    serial: AtomicU64,
    /// At most one pending operation per key. Duplicate callers wait on the
    /// stored receiver; the leader's sender drops when the operation
    /// settles, waking them.
    inflight: Mutex<HashMap<FetchKey, watch::Receiver<()>>>,
    snapshot: RwLock<DashboardSnapshot>,
    loading: AtomicBool,
    error: RwLock<Option<String>>,
    emitter: MetricEmitter,
}

/// Removes the in-flight registry entry when the fetch settles, success,
/// failure or panic, independent of staleness.
struct InflightGuard<'a> {
    inner: &'a CoordinatorInner,
    key: &'a FetchKey,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.inner.inflight.lock().remove(self.key);
    }
}

/// De-duplicates concurrent identical dashboard fetches and discards
/// responses that are stale by the time they arrive.
pub struct FetchCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl FetchCoordinator {
    pub fn new(
        source: Arc<dyn RemoteSource>,
        filter: Arc<RwLock<FilterState>>,
        combined_dashboard: bool,
        heatmap_days: u32,
        loading_flag_policy: LoadingFlagPolicy,
        emitter: MetricEmitter,
    ) -> Self {
        let strategy = if combined_dashboard {
            FetchStrategy::Combined
        } else {
            FetchStrategy::Split
        };
        Self {
            inner: Arc::new(CoordinatorInner {
                source,
                strategy,
                loading_flag_policy,
                heatmap_days,
                filter,
                serial: AtomicU64::new(0),
                inflight: Mutex::new(HashMap::new()),
                snapshot: RwLock::new(DashboardSnapshot::default()),
                loading: AtomicBool::new(false),
                error: RwLock::new(None),
                emitter,
            }),
        }
    }

    /// Refresh the dashboard snapshot for the current filter.
    ///
    /// If an identical request (same filter, same heat-map inclusion) is
    /// already in flight, this awaits that pending operation instead of
    /// issuing a new one. Completion does not imply the result was applied:
    /// a refresh superseded by a newer one is silently discarded.
    pub async fn refresh(&self, options: RefreshOptions) {
        let inner = &self.inner;
        let mut done_rx = {
            let filter = inner.filter.read().clone();
            let key = FetchKey::new(&filter, options.include_heatmap);
            let mut inflight = inner.inflight.lock();
            if let Some(rx) = inflight.get(&key) {
                debug!(reason = %options.reason, "Refresh joined in-flight request");
                inner.emitter.dedup_hit();
                rx.clone()
            } else {
                // Registering, bumping the serial and raising the loading
                // flag happen atomically under the registry lock; the fetch
                // itself runs detached so caller cancellation cannot strand
                // the registry entry.
                let (done_tx, done_rx) = watch::channel(());
                inflight.insert(key.clone(), done_rx.clone());
                let id = inner.serial.fetch_add(1, Ordering::SeqCst) + 1;
                inner.loading.store(true, Ordering::SeqCst);
                debug!(reason = %options.reason, id, "Refresh started");
                let task_inner = Arc::clone(inner);
                tokio::spawn(async move {
                    run_refresh(task_inner, key, filter, options, id).await;
                    drop(done_tx);
                });
                done_rx
            }
        };
        // Wait for the leader's sender to drop; Err is the completion signal.
        let _ = done_rx.changed().await;
    }

    /// Standalone heat-map refresh, outside the serial/dedup machinery: the
    /// heat-map cadence always issues exactly this one call and its failure
    /// must not disturb the dashboard error surface.
    pub async fn refresh_heatmap(&self, reason: RefreshReason) {
        let inner = &self.inner;
        let platform = inner.filter.read().platform;
        let started = Instant::now();
        match inner
            .source
            .fetch_heatmap(platform, inner.heatmap_days)
            .await
        {
            Ok(heatmap) => {
                inner.snapshot.write().heatmap = Some(heatmap);
                inner.emitter.heatmap_applied(started.elapsed());
                debug!(reason = %reason, "Heat-map refreshed");
            }
            Err(error) => {
                warn!(reason = %reason, "Heat-map refresh failed: {}", error);
            }
        }
    }

    /// Cheap cloned view of the current snapshot.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.inner.snapshot.read().clone()
    }

    pub fn loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    pub fn error(&self) -> Option<String> {
        self.inner.error.read().clone()
    }

    /// Number of pending operations in the in-flight registry.
    pub fn inflight_count(&self) -> usize {
        self.inner.inflight.lock().len()
    }

    pub fn current_serial(&self) -> u64 {
        self.inner.serial.load(Ordering::SeqCst)
    }
}

async fn run_refresh(
    inner: Arc<CoordinatorInner>,
    key: FetchKey,
    filter: FilterState,
    options: RefreshOptions,
    id: u64,
) {
    let started = Instant::now();
    let result = {
        let _guard = InflightGuard {
            inner: &inner,
            key: &key,
        };
        inner
            .strategy
            .execute(&*inner.source, &filter, options.include_heatmap, inner.heatmap_days)
            .await
        // Registry entry released here, before the result is examined, so a
        // caller arriving during application starts a fresh request.
    };

    let current = inner.serial.load(Ordering::SeqCst) == id;
    match result {
        Ok((payload, calls)) => {
            if !current {
                debug!(id, reason = %options.reason, "Discarding stale refresh result");
                inner.emitter.stale_discard();
                return;
            }
            inner.snapshot.write().apply(payload, calls);
            *inner.error.write() = None;
            inner.loading.store(false, Ordering::SeqCst);
            inner
                .emitter
                .refresh_applied(options.reason, calls, started.elapsed());
            debug!(
                id,
                reason = %options.reason,
                calls,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Refresh applied"
            );
        }
        Err(error) => {
            if current {
                warn!(id, reason = %options.reason, "Refresh failed: {}", error);
                *inner.error.write() = Some(error.to_string());
                inner.emitter.refresh_failed(options.reason);
            } else {
                debug!(id, reason = %options.reason, "Stale refresh failed: {}", error);
                inner.emitter.stale_discard();
            }
            let clear_loading = match inner.loading_flag_policy {
                LoadingFlagPolicy::ClearAlways => true,
                LoadingFlagPolicy::ClearWhenCurrent => current,
            };
            if clear_loading {
                inner.loading.store(false, Ordering::SeqCst);
            }
        }
    }
}
