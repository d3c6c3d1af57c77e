mod common;

use common::MockSource;
use std::sync::Arc;
use usage_sync::{EngineConfig, LogDirection, UsageEngine};

fn cursor_engine(source: Arc<MockSource>) -> UsageEngine {
    common::init_tracing();
    UsageEngine::new(source, EngineConfig::default())
}

fn offset_engine(source: Arc<MockSource>) -> UsageEngine {
    common::init_tracing();
    UsageEngine::new(
        source,
        EngineConfig {
            cursor_paging: false,
            ..EngineConfig::default()
        },
    )
}

#[tokio::test]
async fn test_cursor_walk_forward_and_back() {
    let source = MockSource::with_logs(120);
    let engine = cursor_engine(source.clone());

    engine.fetch_logs(LogDirection::Reset).await;
    let first = engine.log_state();
    assert_eq!(first.page, 1);
    assert_eq!(first.records.len(), 50);
    assert_eq!(first.records[0].id, "log-0");
    assert!(first.next_cursor.is_some());
    assert!(!engine.can_prev_logs());

    engine.fetch_logs(LogDirection::Next).await;
    let second = engine.log_state();
    assert_eq!(second.page, 2);
    assert_eq!(second.records[0].id, "log-50");
    assert_eq!(second.history_depth(), 1);

    engine.fetch_logs(LogDirection::Next).await;
    let third = engine.log_state();
    assert_eq!(third.page, 3);
    assert_eq!(third.records.len(), 20);
    assert_eq!(third.records[0].id, "log-100");
    // Final page carries no forward cursor.
    assert!(!engine.can_next_logs());

    engine.fetch_logs(LogDirection::Prev).await;
    let back = engine.log_state();
    assert_eq!(back.page, 2);
    assert_eq!(back.cursor, second.cursor);
    assert_eq!(back.records[0].id, "log-50");
    assert_eq!(back.history_depth(), 1);
}

#[tokio::test]
async fn test_cursor_next_at_end_is_noop() {
    let source = MockSource::with_logs(40);
    let engine = cursor_engine(source.clone());

    engine.fetch_logs(LogDirection::Reset).await;
    assert!(!engine.can_next_logs());
    engine.fetch_logs(LogDirection::Next).await;

    assert_eq!(source.logs_call_count(), 1);
    assert_eq!(engine.log_state().page, 1);
}

#[tokio::test]
async fn test_cursor_prev_at_start_is_noop() {
    let source = MockSource::with_logs(120);
    let engine = cursor_engine(source.clone());

    engine.fetch_logs(LogDirection::Reset).await;
    engine.fetch_logs(LogDirection::Prev).await;

    assert_eq!(source.logs_call_count(), 1);
    assert_eq!(engine.log_state().page, 1);
}

#[tokio::test]
async fn test_records_replaced_not_appended() {
    let source = MockSource::with_logs(120);
    let engine = cursor_engine(source.clone());

    engine.fetch_logs(LogDirection::Reset).await;
    engine.fetch_logs(LogDirection::Next).await;

    let state = engine.log_state();
    assert_eq!(state.records.len(), 50);
    assert_eq!(state.records[0].id, "log-50");
}

#[tokio::test]
async fn test_reset_clears_history() {
    let source = MockSource::with_logs(200);
    let engine = cursor_engine(source.clone());

    engine.fetch_logs(LogDirection::Reset).await;
    engine.fetch_logs(LogDirection::Next).await;
    engine.fetch_logs(LogDirection::Next).await;
    assert_eq!(engine.log_state().history_depth(), 2);

    engine.fetch_logs(LogDirection::Reset).await;
    let state = engine.log_state();
    assert_eq!(state.page, 1);
    assert_eq!(state.history_depth(), 0);
    assert_eq!(state.records[0].id, "log-0");
}

#[tokio::test]
async fn test_offset_mode_reports_total_and_pages() {
    let source = MockSource::with_logs(120);
    let engine = offset_engine(source.clone());

    engine.fetch_logs(LogDirection::Reset).await;
    let state = engine.log_state();
    assert_eq!(state.total, Some(120));
    assert!(engine.can_next_logs());

    engine.fetch_logs(LogDirection::Next).await;
    engine.fetch_logs(LogDirection::Next).await;
    let last = engine.log_state();
    assert_eq!(last.page, 3);
    assert_eq!(last.records.len(), 20);
    assert!(!engine.can_next_logs());

    engine.fetch_logs(LogDirection::Prev).await;
    assert_eq!(engine.log_state().page, 2);
    assert_eq!(engine.log_state().records[0].id, "log-50");
}

#[tokio::test]
async fn test_set_page_size_reissues_current_position() {
    let source = MockSource::with_logs(120);
    let engine = cursor_engine(source.clone());

    engine.fetch_logs(LogDirection::Reset).await;
    engine.set_log_page_size(20).await;

    let state = engine.log_state();
    assert_eq!(state.page_size, 20);
    assert_eq!(state.page, 1);
    assert_eq!(state.records.len(), 20);
    assert_eq!(source.logs_call_count(), 2);
}

#[tokio::test]
async fn test_set_model_filter_reissues_current_position() {
    let source = MockSource::with_logs(120);
    let engine = cursor_engine(source.clone());

    engine.fetch_logs(LogDirection::Reset).await;
    engine.set_log_model_filter(Some("opus".into())).await;

    assert_eq!(engine.log_state().model_filter.as_deref(), Some("opus"));
    assert_eq!(source.logs_call_count(), 2);
}

#[tokio::test]
async fn test_log_failure_sets_own_error_surface() {
    let source = MockSource::with_logs(120);
    source.set_failing(None, true);
    let engine = cursor_engine(source.clone());

    engine.fetch_logs(LogDirection::Reset).await;
    assert!(engine.logs_error().is_some());
    assert!(!engine.logs_loading());
    // The dashboard error surface is untouched.
    assert!(engine.error().is_none());

    source.set_failing(None, false);
    engine.fetch_logs(LogDirection::Reset).await;
    assert!(engine.logs_error().is_none());
    assert_eq!(engine.log_state().records.len(), 50);
}
