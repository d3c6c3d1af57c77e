use std::time::Duration;

use crate::types::RefreshReason;

/// Fire-and-forget observability recorder for refresh and pagination
/// activity. Recording never fails and never blocks the caller; with no
/// recorder installed the `metrics` facade discards everything.
#[derive(Clone)]
pub struct MetricEmitter {
    // Cached handles to avoid per-call registry lookup for unlabeled metrics
    counter_refreshes_applied: metrics::Counter,
    counter_stale_discards: metrics::Counter,
    counter_dedup_hits: metrics::Counter,
    counter_network_calls: metrics::Counter,
}

impl Default for MetricEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricEmitter {
    pub fn new() -> Self {
        Self {
            counter_refreshes_applied: metrics::counter!("dashboard_refreshes_applied"),
            counter_stale_discards: metrics::counter!("dashboard_refreshes_stale_discarded"),
            counter_dedup_hits: metrics::counter!("dashboard_refreshes_deduplicated"),
            counter_network_calls: metrics::counter!("dashboard_refresh_network_calls"),
        }
    }

    /// A refresh completed and its result was applied to the snapshot.
    pub fn refresh_applied(&self, reason: RefreshReason, calls: u32, elapsed: Duration) {
        self.counter_refreshes_applied.increment(1);
        self.counter_network_calls.increment(calls as u64);
        metrics::histogram!("dashboard_refresh_duration_ms", "reason" => reason.as_str())
            .record(elapsed.as_secs_f64() * 1000.0);
    }

    /// A refresh failed while still current.
    pub fn refresh_failed(&self, reason: RefreshReason) {
        metrics::counter!("dashboard_refresh_failures", "reason" => reason.as_str()).increment(1);
    }

    /// A completed refresh was superseded and its result dropped.
    pub fn stale_discard(&self) {
        self.counter_stale_discards.increment(1);
    }

    /// A refresh caller was satisfied by an already in-flight request.
    pub fn dedup_hit(&self) {
        self.counter_dedup_hits.increment(1);
    }

    /// A standalone heat-map refresh completed.
    pub fn heatmap_applied(&self, elapsed: Duration) {
        metrics::histogram!("dashboard_heatmap_refresh_duration_ms")
            .record(elapsed.as_secs_f64() * 1000.0);
    }

    /// A log page fetch completed.
    pub fn logs_fetched(&self, records: usize, elapsed: Duration) {
        metrics::counter!("dashboard_log_records_fetched").increment(records as u64);
        metrics::histogram!("dashboard_log_fetch_duration_ms")
            .record(elapsed.as_secs_f64() * 1000.0);
    }

    /// An import round-trip completed.
    pub fn import_completed(&self, imported: u64, elapsed: Duration) {
        metrics::counter!("dashboard_import_records").increment(imported);
        metrics::histogram!("dashboard_import_duration_ms")
            .record(elapsed.as_secs_f64() * 1000.0);
    }
}
