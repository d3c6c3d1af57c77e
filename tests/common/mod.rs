use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use usage_sync::{
    DashboardPayload, FilterState, Heatmap, ImportResult, LogPage, LogQuery, LogRecord,
    ModelStats, Platform, ProjectStats, RemoteSource, SourceError, TrendPoint, UsageSummary,
};

/// Route test logs through the test harness writer. Safe to call from every
/// test; only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Marker value encoded into every payload so tests can tell which filter a
/// given response was produced for.
pub fn marker(platform: Option<Platform>) -> u64 {
    match platform {
        None => 10,
        Some(Platform::Claude) => 11,
        Some(Platform::Codex) => 12,
        Some(Platform::Gemini) => 13,
        Some(Platform::Qwen) => 14,
    }
}

/// Scripted in-process remote source.
///
/// Latency and failure are injected per filter platform, which lets a test
/// order overlapping fetches deterministically (e.g. make the first-issued
/// request finish last). Log pages are generated from a fixed virtual record
/// count; cursor tokens encode the record offset.
pub struct MockSource {
    pub dashboard_calls: AtomicUsize,
    pub summary_calls: AtomicUsize,
    pub trends_calls: AtomicUsize,
    pub model_calls: AtomicUsize,
    pub project_calls: AtomicUsize,
    pub heatmap_calls: AtomicUsize,
    pub logs_calls: AtomicUsize,
    pub import_calls: AtomicUsize,
    total_logs: u64,
    delays: Mutex<HashMap<Option<Platform>, Duration>>,
    failing: Mutex<HashSet<Option<Platform>>>,
}

#[allow(dead_code)]
impl MockSource {
    pub fn new() -> Arc<Self> {
        Self::with_logs(0)
    }

    pub fn with_logs(total_logs: u64) -> Arc<Self> {
        Arc::new(Self {
            dashboard_calls: AtomicUsize::new(0),
            summary_calls: AtomicUsize::new(0),
            trends_calls: AtomicUsize::new(0),
            model_calls: AtomicUsize::new(0),
            project_calls: AtomicUsize::new(0),
            heatmap_calls: AtomicUsize::new(0),
            logs_calls: AtomicUsize::new(0),
            import_calls: AtomicUsize::new(0),
            total_logs,
            delays: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        })
    }

    /// Inject latency for every call made under the given filter platform.
    pub fn set_delay(&self, platform: Option<Platform>, delay: Duration) {
        self.delays.lock().insert(platform, delay);
    }

    /// Make every call under the given filter platform fail.
    pub fn set_failing(&self, platform: Option<Platform>, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(platform);
        } else {
            set.remove(&platform);
        }
    }

    pub fn dashboard_call_count(&self) -> usize {
        self.dashboard_calls.load(Ordering::SeqCst)
    }

    pub fn logs_call_count(&self) -> usize {
        self.logs_calls.load(Ordering::SeqCst)
    }

    async fn simulate(&self, platform: Option<Platform>) -> Result<(), SourceError> {
        let delay = self.delays.lock().get(&platform).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(&platform) {
            return Err(SourceError::Transport(format!(
                "injected failure for {:?}",
                platform
            )));
        }
        Ok(())
    }

    fn payload(&self, platform: Option<Platform>, include_heatmap: bool) -> DashboardPayload {
        let m = marker(platform);
        DashboardPayload {
            summary: UsageSummary {
                total_requests: m,
                input_tokens: m * 10,
                output_tokens: m * 20,
                total_tokens: m * 30,
                total_cost_usd: m as f64,
                active_days: 7,
            },
            trends: vec![TrendPoint {
                date: Utc::now().date_naive(),
                requests: m,
                tokens: m * 30,
                cost_usd: m as f64,
            }],
            model_stats: vec![ModelStats {
                model: "opus".into(),
                requests: m,
                input_tokens: m * 10,
                output_tokens: m * 20,
                total_tokens: m * 30,
                cost_usd: m as f64,
            }],
            project_stats: vec![ProjectStats {
                project: "workbench".into(),
                requests: m,
                tokens: m * 30,
                cost_usd: m as f64,
            }],
            heatmap: include_heatmap.then(|| Heatmap {
                days: 365,
                cells: HashMap::from([(Utc::now().date_naive(), m)]),
            }),
        }
    }

    fn log_record(&self, index: u64) -> LogRecord {
        LogRecord {
            id: format!("log-{index}"),
            timestamp: Utc::now(),
            platform: Platform::Claude,
            model: "opus".into(),
            project: None,
            input_tokens: 100,
            output_tokens: 200,
            cost_usd: 0.01,
        }
    }
}

#[async_trait]
impl RemoteSource for MockSource {
    async fn fetch_dashboard(
        &self,
        filter: &FilterState,
        _heatmap_days: u32,
        include_heatmap: bool,
    ) -> Result<DashboardPayload, SourceError> {
        self.dashboard_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(filter.platform).await?;
        Ok(self.payload(filter.platform, include_heatmap))
    }

    async fn fetch_summary(&self, filter: &FilterState) -> Result<UsageSummary, SourceError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(filter.platform).await?;
        Ok(self.payload(filter.platform, false).summary)
    }

    async fn fetch_trends(&self, filter: &FilterState) -> Result<Vec<TrendPoint>, SourceError> {
        self.trends_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(filter.platform).await?;
        Ok(self.payload(filter.platform, false).trends)
    }

    async fn fetch_model_stats(
        &self,
        filter: &FilterState,
    ) -> Result<Vec<ModelStats>, SourceError> {
        self.model_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(filter.platform).await?;
        Ok(self.payload(filter.platform, false).model_stats)
    }

    async fn fetch_project_stats(
        &self,
        filter: &FilterState,
    ) -> Result<Vec<ProjectStats>, SourceError> {
        self.project_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(filter.platform).await?;
        Ok(self.payload(filter.platform, false).project_stats)
    }

    async fn fetch_heatmap(
        &self,
        platform: Option<Platform>,
        days: u32,
    ) -> Result<Heatmap, SourceError> {
        self.heatmap_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(platform).await?;
        Ok(Heatmap {
            days,
            cells: HashMap::from([(Utc::now().date_naive(), marker(platform))]),
        })
    }

    async fn fetch_logs(&self, query: &LogQuery) -> Result<LogPage, SourceError> {
        self.logs_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(query.platform).await?;

        let page_size = u64::from(query.page_size.max(1));
        let offset = if query.use_offset {
            u64::from(query.page.saturating_sub(1)) * page_size
        } else {
            // Cursor tokens are "off-<record offset>"; no cursor means the
            // first page.
            query
                .cursor
                .as_deref()
                .and_then(|c| c.strip_prefix("off-"))
                .and_then(|n| n.parse().ok())
                .unwrap_or(0)
        };
        let end = (offset + page_size).min(self.total_logs);
        let records = (offset..end).map(|i| self.log_record(i)).collect();

        Ok(LogPage {
            records,
            total: query.use_offset.then_some(self.total_logs),
            next_cursor: (!query.use_offset && end < self.total_logs)
                .then(|| format!("off-{end}")),
        })
    }

    async fn trigger_import(
        &self,
        platform: Option<Platform>,
    ) -> Result<Vec<ImportResult>, SourceError> {
        self.import_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(platform).await?;
        let platforms = match platform {
            Some(p) => vec![p],
            None => vec![
                Platform::Claude,
                Platform::Codex,
                Platform::Gemini,
                Platform::Qwen,
            ],
        };
        Ok(platforms
            .into_iter()
            .map(|platform| ImportResult {
                platform,
                imported: 42,
                skipped: 3,
            })
            .collect())
    }
}
