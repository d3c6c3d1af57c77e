use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::emitter::MetricEmitter;
use crate::source::{LogQuery, RemoteSource};
use crate::types::{FilterState, LogRecord};

/// Navigation direction over the paginated log view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDirection {
    /// Back to the first page, clearing cursor history.
    Reset,
    /// Forward one page.
    Next,
    /// Back one page.
    Prev,
    /// Re-issue the last-used parameters without moving position.
    Same,
}

/// Position and contents of the log view.
///
/// `cursor_history` holds one entry per forward transition not yet undone
/// by a backward one; `page` is informational when the cursor protocol is
/// active and authoritative in offset mode.
#[derive(Debug, Clone)]
pub struct LogPageState {
    pub records: Vec<LogRecord>,
    pub total: Option<u64>,
    pub page: u32,
    pub page_size: u32,
    pub model_filter: Option<String>,
    /// Cursor the current position was fetched with (`None` on page one).
    pub cursor: Option<String>,
    /// Cursor for the page after this one, from the last response.
    pub next_cursor: Option<String>,
    cursor_history: Vec<Option<String>>,
}

impl LogPageState {
    fn new(page_size: u32) -> Self {
        Self {
            records: Vec::new(),
            total: None,
            page: 1,
            page_size,
            model_filter: None,
            cursor: None,
            next_cursor: None,
            cursor_history: Vec::new(),
        }
    }

    /// Number of forward transitions that can be undone.
    pub fn history_depth(&self) -> usize {
        self.cursor_history.len()
    }
}

/// Manages forward/back navigation over the raw-event log, speaking either
/// the opaque-cursor protocol or the legacy page/offset protocol behind the
/// capability flag. Log fetches are independent of the dashboard
/// coordinator: no de-duplication, own loading/error surface.
pub struct LogPaginator {
    source: Arc<dyn RemoteSource>,
    filter: Arc<RwLock<FilterState>>,
    cursor_mode: bool,
    state: RwLock<LogPageState>,
    loading: AtomicBool,
    error: RwLock<Option<String>>,
    emitter: MetricEmitter,
}

impl LogPaginator {
    pub fn new(
        source: Arc<dyn RemoteSource>,
        filter: Arc<RwLock<FilterState>>,
        cursor_mode: bool,
        page_size: u32,
        emitter: MetricEmitter,
    ) -> Self {
        Self {
            source,
            filter,
            cursor_mode,
            state: RwLock::new(LogPageState::new(page_size)),
            loading: AtomicBool::new(false),
            error: RwLock::new(None),
            emitter,
        }
    }

    /// Move in the given direction and fetch that page.
    ///
    /// Position bookkeeping is committed synchronously before the network
    /// call; empty-boundary moves (`Next` with no next cursor, cursor-mode
    /// `Prev` on page one) are no-ops that issue no request.
    pub async fn fetch_logs(&self, direction: LogDirection) {
        let query = {
            let mut state = self.state.write();
            match direction {
                LogDirection::Reset => {
                    state.cursor = None;
                    state.next_cursor = None;
                    state.cursor_history.clear();
                    state.page = 1;
                }
                LogDirection::Next if self.cursor_mode => {
                    let Some(next) = state.next_cursor.clone() else {
                        debug!("No next cursor, staying put");
                        return;
                    };
                    let previous = state.cursor.take();
                    state.cursor_history.push(previous);
                    state.cursor = Some(next);
                    state.page += 1;
                }
                LogDirection::Prev if self.cursor_mode => {
                    let Some(restored) = state.cursor_history.pop() else {
                        debug!("Already at the first page");
                        return;
                    };
                    state.cursor = restored;
                    if state.page > 1 {
                        state.page -= 1;
                    }
                }
                LogDirection::Next => {
                    state.page += 1;
                }
                LogDirection::Prev => {
                    // Floored at 1; the page-1 request is still issued.
                    if state.page > 1 {
                        state.page -= 1;
                    }
                }
                LogDirection::Same => {}
            }

            let filter = self.filter.read();
            LogQuery {
                platform: filter.platform,
                page: state.page,
                page_size: state.page_size,
                model: state.model_filter.clone(),
                cursor: if self.cursor_mode {
                    state.cursor.clone()
                } else {
                    None
                },
                use_offset: !self.cursor_mode,
            }
        };

        self.loading.store(true, Ordering::SeqCst);
        let started = Instant::now();
        match self.source.fetch_logs(&query).await {
            Ok(page) => {
                let records = page.records.len();
                {
                    let mut state = self.state.write();
                    // Page-at-a-time: records replaced, never appended.
                    state.records = page.records;
                    state.total = page.total;
                    state.next_cursor = page.next_cursor;
                }
                *self.error.write() = None;
                self.emitter.logs_fetched(records, started.elapsed());
                debug!(
                    page = query.page,
                    records,
                    cursor = query.cursor.as_deref().unwrap_or("-"),
                    "Log page fetched"
                );
            }
            Err(error) => {
                warn!(page = query.page, "Log fetch failed: {}", error);
                *self.error.write() = Some(error.to_string());
            }
        }
        self.loading.store(false, Ordering::SeqCst);
    }

    /// Change the page size and re-issue the current position.
    pub async fn set_page_size(&self, page_size: u32) {
        self.state.write().page_size = page_size.max(1);
        self.fetch_logs(LogDirection::Same).await;
    }

    /// Change the model filter and re-issue the current position.
    pub async fn set_model_filter(&self, model: Option<String>) {
        self.state.write().model_filter = model;
        self.fetch_logs(LogDirection::Same).await;
    }

    pub fn state(&self) -> LogPageState {
        self.state.read().clone()
    }

    pub fn loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn error(&self) -> Option<String> {
        self.error.read().clone()
    }

    /// Whether a backward transition is possible from the current position.
    pub fn can_prev(&self) -> bool {
        let state = self.state.read();
        if self.cursor_mode {
            !state.cursor_history.is_empty()
        } else {
            state.page > 1
        }
    }

    /// Whether a forward transition is possible from the current position.
    pub fn can_next(&self) -> bool {
        let state = self.state.read();
        if self.cursor_mode {
            state.next_cursor.is_some()
        } else {
            match state.total {
                Some(total) => u64::from(state.page) * u64::from(state.page_size) < total,
                None => state.records.len() as u32 == state.page_size,
            }
        }
    }
}
