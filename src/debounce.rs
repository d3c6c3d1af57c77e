use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::coordinator::{FetchCoordinator, RefreshOptions};
use crate::types::{FilterState, Platform, RefreshReason};

/// Coalesces bursts of filter changes into a single downstream refresh.
///
/// The filter snapshot is replaced immediately on every call, so reads of
/// the current filter are never stale; only the refresh is delayed. Any
/// sequence of calls closer together than the delay produces exactly one
/// refresh, carrying the last-set values.
pub struct FilterDebouncer {
    filter: Arc<RwLock<FilterState>>,
    coordinator: Arc<FetchCoordinator>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl FilterDebouncer {
    pub fn new(
        filter: Arc<RwLock<FilterState>>,
        coordinator: Arc<FetchCoordinator>,
        delay: Duration,
    ) -> Self {
        Self {
            filter,
            coordinator,
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Replace the filter and (re)arm the trailing-edge refresh timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn set_filters(
        &self,
        platform: Option<Platform>,
        range_start: Option<DateTime<Utc>>,
        range_end: Option<DateTime<Utc>>,
    ) {
        *self.filter.write() = FilterState {
            platform,
            range_start,
            range_end,
        };

        let mut pending = self.pending.lock();
        if let Some(timer) = pending.take() {
            timer.abort();
        }
        let coordinator = Arc::clone(&self.coordinator);
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            sleep(delay).await;
            // Aborts only land in the sleep above; once the refresh has been
            // admitted it runs to completion on its own task.
            coordinator
                .refresh(RefreshOptions {
                    include_heatmap: true,
                    reason: RefreshReason::Filter,
                })
                .await;
        }));
        debug!(delay_ms = delay.as_millis() as u64, "Filter updated, refresh debounced");
    }

    /// Cancel a not-yet-fired debounce timer, if any. Part of session
    /// teardown; a refresh that already fired is unaffected.
    pub fn cancel_pending(&self) {
        if let Some(timer) = self.pending.lock().take() {
            timer.abort();
            debug!("Pending debounced refresh cancelled");
        }
    }

    /// Whether a debounce timer is currently armed (or its refresh still
    /// awaited).
    pub fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|timer| !timer.is_finished())
            .unwrap_or(false)
    }
}
