use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::EngineConfig;
use crate::coordinator::{FetchCoordinator, RefreshOptions};
use crate::debounce::FilterDebouncer;
use crate::emitter::MetricEmitter;
use crate::paginator::{LogDirection, LogPageState, LogPaginator};
use crate::scheduler::AutoRefreshScheduler;
use crate::source::{RemoteSource, SourceError};
use crate::types::{
    DashboardSnapshot, FilterState, ImportResult, Platform, RefreshReason,
};

/// One dashboard session's synchronization engine.
///
/// Owns every piece of mutable state the dashboard needs — filter, snapshot,
/// log page, timers — so multiple independent sessions can coexist and
/// tests get a fresh world per instance. All writes flow through the entry
/// points below; consumers only ever read cloned snapshots.
pub struct UsageEngine {
    source: Arc<dyn RemoteSource>,
    coordinator: Arc<FetchCoordinator>,
    debouncer: Arc<FilterDebouncer>,
    scheduler: AutoRefreshScheduler,
    paginator: LogPaginator,
    filter: Arc<RwLock<FilterState>>,
    emitter: MetricEmitter,
}

impl UsageEngine {
    /// Wire up a session. Must be called from within a tokio runtime; the
    /// debounce and auto-refresh timers spawn onto it.
    pub fn new(source: Arc<dyn RemoteSource>, config: EngineConfig) -> Self {
        let emitter = MetricEmitter::new();
        let filter = Arc::new(RwLock::new(FilterState::default()));
        let coordinator = Arc::new(FetchCoordinator::new(
            Arc::clone(&source),
            Arc::clone(&filter),
            config.combined_dashboard,
            config.heatmap_days,
            config.loading_flag_policy,
            emitter.clone(),
        ));
        let debouncer = Arc::new(FilterDebouncer::new(
            Arc::clone(&filter),
            Arc::clone(&coordinator),
            config.debounce_delay,
        ));
        let scheduler = AutoRefreshScheduler::new(
            Arc::clone(&coordinator),
            Arc::clone(&debouncer),
            config.core_refresh_interval,
            config.heatmap_refresh_interval,
        );
        let paginator = LogPaginator::new(
            Arc::clone(&source),
            Arc::clone(&filter),
            config.cursor_paging,
            config.log_page_size,
            emitter.clone(),
        );
        info!(
            combined = config.combined_dashboard,
            cursor_paging = config.cursor_paging,
            "Usage engine created"
        );
        Self {
            source,
            coordinator,
            debouncer,
            scheduler,
            paginator,
            filter,
            emitter,
        }
    }

    /// Populate the empty snapshot and the first log page. Typically called
    /// once on view mount, before `start_auto_refresh`.
    pub async fn initial_load(&self) {
        self.coordinator
            .refresh(RefreshOptions {
                include_heatmap: true,
                reason: RefreshReason::Manual,
            })
            .await;
        self.paginator.fetch_logs(LogDirection::Reset).await;
    }

    /// Replace the filter immediately and schedule a debounced refresh.
    pub fn set_filters(
        &self,
        platform: Option<Platform>,
        range_start: Option<DateTime<Utc>>,
        range_end: Option<DateTime<Utc>>,
    ) {
        self.debouncer.set_filters(platform, range_start, range_end);
    }

    /// Issue a refresh right now, bypassing the debounce delay.
    pub async fn refresh_now(&self, include_heatmap: bool) {
        self.coordinator
            .refresh(RefreshOptions {
                include_heatmap,
                reason: RefreshReason::Manual,
            })
            .await;
    }

    pub fn start_auto_refresh(&self) {
        self.scheduler.start();
    }

    pub fn stop_auto_refresh(&self) {
        self.scheduler.stop();
    }

    pub fn auto_refresh_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Navigate the log view. See [`LogDirection`].
    pub async fn fetch_logs(&self, direction: LogDirection) {
        self.paginator.fetch_logs(direction).await;
    }

    pub async fn set_log_page_size(&self, page_size: u32) {
        self.paginator.set_page_size(page_size).await;
    }

    pub async fn set_log_model_filter(&self, model: Option<String>) {
        self.paginator.set_model_filter(model).await;
    }

    /// Kick off a server-side import and, on success, refresh the dashboard
    /// so the imported usage is visible without waiting for the next tick.
    pub async fn trigger_import(
        &self,
        platform: Option<Platform>,
    ) -> Result<Vec<ImportResult>, SourceError> {
        let started = Instant::now();
        let results = self.source.trigger_import(platform).await?;
        let imported = results.iter().map(|r| r.imported).sum();
        self.emitter.import_completed(imported, started.elapsed());
        info!(imported, "Import completed");
        self.coordinator
            .refresh(RefreshOptions {
                include_heatmap: true,
                reason: RefreshReason::Import,
            })
            .await;
        Ok(results)
    }

    /// Tear down every owned timer: both auto-refresh cadences and any
    /// pending debounce. Call on view unmount; the engine stays usable
    /// afterwards (a later `start_auto_refresh` restarts the cadences).
    pub fn shutdown(&self) {
        self.scheduler.stop();
        info!("Usage engine shut down");
    }

    // Read-only views.

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.coordinator.snapshot()
    }

    pub fn filters(&self) -> FilterState {
        self.filter.read().clone()
    }

    pub fn loading(&self) -> bool {
        self.coordinator.loading()
    }

    pub fn error(&self) -> Option<String> {
        self.coordinator.error()
    }

    pub fn log_state(&self) -> LogPageState {
        self.paginator.state()
    }

    pub fn logs_loading(&self) -> bool {
        self.paginator.loading()
    }

    pub fn logs_error(&self) -> Option<String> {
        self.paginator.error()
    }

    pub fn can_prev_logs(&self) -> bool {
        self.paginator.can_prev()
    }

    pub fn can_next_logs(&self) -> bool {
        self.paginator.can_next()
    }

    /// Total tokens across the model breakdown, derived on read.
    pub fn total_tokens(&self) -> u64 {
        self.coordinator.snapshot().total_tokens()
    }
}
