use std::time::Duration;
use tracing::warn;

/// What to do with the dashboard loading flag when a *stale* refresh fails.
///
/// `ClearAlways` clears the flag on every failure, which lets a slow,
/// superseded request's failure hide the spinner of a newer, still-pending
/// one. `ClearWhenCurrent` gates the clear on the same staleness check used
/// for snapshot mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingFlagPolicy {
    /// Clear the loading flag on any failure, current or stale
    /// (compatibility behavior).
    ClearAlways,
    /// Only the currently-serialed attempt may clear the loading flag.
    ClearWhenCurrent,
}

/// Configuration for one engine session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Use the combined dashboard endpoint instead of four/five split calls.
    pub combined_dashboard: bool,
    /// Use cursor-based log paging instead of legacy page/offset paging.
    pub cursor_paging: bool,
    /// Trailing-edge delay coalescing bursts of filter changes.
    pub debounce_delay: Duration,
    /// Cadence of the cheap core-metrics auto-refresh.
    pub core_refresh_interval: Duration,
    /// Cadence of the expensive heat-map auto-refresh.
    pub heatmap_refresh_interval: Duration,
    /// Trailing window requested for the heat-map.
    pub heatmap_days: u32,
    /// Initial log page size.
    pub log_page_size: u32,
    /// See [`LoadingFlagPolicy`].
    pub loading_flag_policy: LoadingFlagPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            combined_dashboard: true,
            cursor_paging: true,
            debounce_delay: Duration::from_millis(300),
            core_refresh_interval: Duration::from_secs(30),
            heatmap_refresh_interval: Duration::from_secs(600),
            heatmap_days: 365,
            log_page_size: 50,
            loading_flag_policy: LoadingFlagPolicy::ClearAlways,
        }
    }
}

impl EngineConfig {
    /// Build a config from `USAGE_SYNC_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            combined_dashboard: env_bool(
                "USAGE_SYNC_COMBINED_DASHBOARD",
                defaults.combined_dashboard,
            ),
            cursor_paging: env_bool("USAGE_SYNC_CURSOR_PAGING", defaults.cursor_paging),
            debounce_delay: env_millis("USAGE_SYNC_DEBOUNCE_MS", defaults.debounce_delay),
            core_refresh_interval: env_secs(
                "USAGE_SYNC_CORE_REFRESH_SECS",
                defaults.core_refresh_interval,
            ),
            heatmap_refresh_interval: env_secs(
                "USAGE_SYNC_HEATMAP_REFRESH_SECS",
                defaults.heatmap_refresh_interval,
            ),
            heatmap_days: env_u32("USAGE_SYNC_HEATMAP_DAYS", defaults.heatmap_days),
            log_page_size: env_u32("USAGE_SYNC_LOG_PAGE_SIZE", defaults.log_page_size),
            loading_flag_policy: if env_bool("USAGE_SYNC_LEGACY_LOADING_CLEAR", true) {
                LoadingFlagPolicy::ClearAlways
            } else {
                LoadingFlagPolicy::ClearWhenCurrent
            },
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => parse_bool(&raw).unwrap_or_else(|| {
            warn!("Ignoring unparsable {}={}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn env_millis(name: &str, default: Duration) -> Duration {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map(Duration::from_millis).unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn env_secs(name: &str, default: Duration) -> Duration {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map(Duration::from_secs).unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
