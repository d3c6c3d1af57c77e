use async_trait::async_trait;
use thiserror::Error;

use crate::types::{
    DashboardPayload, FilterState, Heatmap, ImportResult, LogPage, ModelStats, Platform,
    ProjectStats, TrendPoint, UsageSummary,
};

/// Errors surfaced by the remote aggregation source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Parameters of a log-page request.
///
/// `cursor` is only meaningful with the cursor protocol; `page`/`page_size`
/// drive the legacy offset protocol when `use_offset` is set (with the
/// cursor protocol, `page_size` still bounds the page and `page` is
/// informational).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogQuery {
    pub platform: Option<Platform>,
    pub page: u32,
    pub page_size: u32,
    pub model: Option<String>,
    pub cursor: Option<String>,
    pub use_offset: bool,
}

/// Read-only aggregation and log endpoints of the remote source, plus the
/// one write operation (`trigger_import`). All reads are idempotent;
/// timeouts are the source's responsibility, not modeled here.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Combined endpoint: all dashboard views in one call.
    async fn fetch_dashboard(
        &self,
        filter: &FilterState,
        heatmap_days: u32,
        include_heatmap: bool,
    ) -> Result<DashboardPayload, SourceError>;

    /// Split-endpoint compatibility mode.
    async fn fetch_summary(&self, filter: &FilterState) -> Result<UsageSummary, SourceError>;
    async fn fetch_trends(&self, filter: &FilterState) -> Result<Vec<TrendPoint>, SourceError>;
    async fn fetch_model_stats(&self, filter: &FilterState)
        -> Result<Vec<ModelStats>, SourceError>;
    async fn fetch_project_stats(
        &self,
        filter: &FilterState,
    ) -> Result<Vec<ProjectStats>, SourceError>;

    /// Standalone heat-map fetch over a trailing window of days.
    async fn fetch_heatmap(
        &self,
        platform: Option<Platform>,
        days: u32,
    ) -> Result<Heatmap, SourceError>;

    /// One page of the raw usage log.
    async fn fetch_logs(&self, query: &LogQuery) -> Result<LogPage, SourceError>;

    /// Kick off a server-side import for one platform, or all when `None`.
    async fn trigger_import(
        &self,
        platform: Option<Platform>,
    ) -> Result<Vec<ImportResult>, SourceError>;
}
