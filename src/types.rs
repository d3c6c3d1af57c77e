use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Source platform whose usage data is being aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Claude,
    Codex,
    Gemini,
    Qwen,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Claude => "claude",
            Platform::Codex => "codex",
            Platform::Gemini => "gemini",
            Platform::Qwen => "qwen",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(Platform::Claude),
            "codex" => Ok(Platform::Codex),
            "gemini" => Ok(Platform::Gemini),
            "qwen" => Ok(Platform::Qwen),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// Immutable filter snapshot. Replaced atomically on every filter change so
/// concurrent readers never observe a half-updated filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub platform: Option<Platform>,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
}

/// Deterministic fingerprint of the filter state plus heatmap inclusion.
///
/// Used as the in-flight registry key: two refreshes with equal keys would
/// issue identical network requests, so only one is allowed to run.
/// Timestamps are reduced to epoch milliseconds to keep the key cheap to
/// hash and compare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    platform: Option<Platform>,
    range_start_ms: Option<i64>,
    range_end_ms: Option<i64>,
    include_heatmap: bool,
}

impl FetchKey {
    pub fn new(filter: &FilterState, include_heatmap: bool) -> Self {
        Self {
            platform: filter.platform,
            range_start_ms: filter.range_start.map(|t| t.timestamp_millis()),
            range_end_ms: filter.range_end.map(|t| t.timestamp_millis()),
            include_heatmap,
        }
    }
}

/// Why a refresh was issued. Carried as a metric label and in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Manual,
    Filter,
    AutoRefreshCore,
    AutoRefreshHeatmap,
    Import,
}

impl RefreshReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshReason::Manual => "manual",
            RefreshReason::Filter => "filter",
            RefreshReason::AutoRefreshCore => "auto-refresh-core",
            RefreshReason::AutoRefreshHeatmap => "auto-refresh-heatmap",
            RefreshReason::Import => "import",
        }
    }
}

impl fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate usage totals for the selected filter window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub active_days: u32,
}

/// One point of the daily usage trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub requests: u64,
    pub tokens: u64,
    pub cost_usd: f64,
}

/// Per-model usage breakdown row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub model: String,
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
}

/// Per-project usage breakdown row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub project: String,
    pub requests: u64,
    pub tokens: u64,
    pub cost_usd: f64,
}

/// Calendar heat-map: request count per day over a trailing window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    pub days: u32,
    pub cells: HashMap<NaiveDate, u64>,
}

/// The derived views a single dashboard fetch returns.
///
/// `heatmap` is `None` when the refresh did not include the heat-map; the
/// previous heat-map is kept in that case rather than blanked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardPayload {
    pub summary: UsageSummary,
    pub trends: Vec<TrendPoint>,
    pub model_stats: Vec<ModelStats>,
    pub project_stats: Vec<ProjectStats>,
    pub heatmap: Option<Heatmap>,
}

/// Current dashboard state as observed by UI consumers. Populated by
/// successful, still-current refreshes and never partially overwritten by a
/// stale one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardSnapshot {
    pub summary: Option<UsageSummary>,
    pub trends: Vec<TrendPoint>,
    pub model_stats: Vec<ModelStats>,
    pub project_stats: Vec<ProjectStats>,
    pub heatmap: Option<Heatmap>,
    /// When the last refresh was applied.
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// Network calls made by the last applied refresh (1 combined, 4 or 5 split).
    pub last_refresh_calls: u32,
}

impl DashboardSnapshot {
    /// Merge a completed refresh into the snapshot. An absent heat-map means
    /// the refresh did not request one, so the existing heat-map survives.
    pub fn apply(&mut self, payload: DashboardPayload, calls: u32) {
        self.summary = Some(payload.summary);
        self.trends = payload.trends;
        self.model_stats = payload.model_stats;
        self.project_stats = payload.project_stats;
        if let Some(heatmap) = payload.heatmap {
            self.heatmap = Some(heatmap);
        }
        self.last_refreshed_at = Some(Utc::now());
        self.last_refresh_calls = calls;
    }

    /// Total tokens across the model breakdown, recomputed on read.
    pub fn total_tokens(&self) -> u64 {
        self.model_stats.iter().map(|m| m.total_tokens).sum()
    }
}

/// A single raw usage event in the paginated log view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub platform: Platform,
    pub model: String,
    pub project: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

/// One page of the usage log as returned by the remote source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogPage {
    pub records: Vec<LogRecord>,
    /// Total matching records, when the source reports it (offset protocol).
    pub total: Option<u64>,
    /// Opaque token for the next page, when the cursor protocol is active
    /// and more records exist.
    pub next_cursor: Option<String>,
}

/// Outcome of a triggered import for one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub platform: Platform,
    pub imported: u64,
    pub skipped: u64,
}
