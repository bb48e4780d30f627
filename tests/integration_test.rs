use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use orderlens::{App, AppEvent, InputMode, OpenOptions, TableCache, ViewState};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};
use std::path::Path;
use std::sync::mpsc;

mod common;

fn key(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

/// Feed an event and every follow-up event it produces.
fn dispatch(app: &mut App, event: AppEvent) {
    let mut next = Some(event);
    while let Some(event) = next.take() {
        if matches!(event, AppEvent::Exit) {
            return;
        }
        next = app.event(&event);
    }
}

fn open(app: &mut App, path: &Path) {
    dispatch(app, AppEvent::Open(path.to_path_buf(), OpenOptions::default()));
}

#[test]
fn test_app_creation() {
    let (tx, _) = mpsc::channel();
    let app = App::new(tx);
    assert_eq!(app.input_mode, InputMode::Normal);
    assert!(app.dashboard().is_none());
}

#[test]
fn test_full_workflow() {
    let temp = tempfile::tempdir().unwrap();
    let path = common::write_sample_orders(temp.path());
    let (tx, _rx) = mpsc::channel();
    let mut app = App::new(tx).with_export_dir(temp.path().join("charts"));

    open(&mut app, &path);
    assert!(app.error_message().is_none());
    let dashboard = app.dashboard().unwrap();
    assert_eq!(dashboard.rows, 3);
    let status = dashboard.status.ready().unwrap();
    assert_eq!(status.get("delivered"), Some(2));
    assert_eq!(status.get("shipped"), Some(1));
    assert_eq!(dashboard.approval.ready().unwrap().excluded, 1);
    assert_eq!(dashboard.trend.ready().unwrap().points.len(), 2);

    // Toggle full data and scroll
    assert_eq!(app.session().visible_rows(5), 3);
    dispatch(&mut app, key(KeyCode::Char('f')));
    assert!(app.session().show_full_data);
    dispatch(&mut app, key(KeyCode::End));
    assert_eq!(app.session().scroll_offset, 2);
    dispatch(&mut app, key(KeyCode::Char('f')));
    assert!(!app.session().show_full_data);
    assert_eq!(app.session().scroll_offset, 0);
}

#[test]
fn test_reload_hits_cache() {
    let temp = tempfile::tempdir().unwrap();
    let path = common::write_sample_orders(temp.path());
    let (tx, _rx) = mpsc::channel();
    let mut app = App::new(tx);

    open(&mut app, &path);
    let first = app.session().table().unwrap().clone();
    dispatch(&mut app, key(KeyCode::Char('r')));
    let second = app.session().table().unwrap().clone();

    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(app.session().cache_hits, 1);
    assert!(app.status_message().unwrap().ends_with("(cached)"));
}

#[test]
fn test_sessions_share_table_cache() {
    let temp = tempfile::tempdir().unwrap();
    let path = common::write_sample_orders(temp.path());
    let cache = TableCache::new();

    let (tx, _rx) = mpsc::channel();
    let mut first = App::new(tx).with_table_cache(cache.clone());
    let (tx, _rx) = mpsc::channel();
    let mut second = App::new(tx).with_table_cache(cache.clone());

    open(&mut first, &path);
    open(&mut second, &path);
    assert_eq!(cache.len().unwrap(), 1);
    assert_eq!(second.session().cache_hits, 1);
    assert_eq!(first.dashboard(), second.dashboard());
}

#[test]
fn test_open_prompt() {
    let temp = tempfile::tempdir().unwrap();
    let path = common::write_sample_orders(temp.path());
    let (tx, _rx) = mpsc::channel();
    let mut app = App::new(tx);

    dispatch(&mut app, key(KeyCode::Char('o')));
    assert_eq!(app.input_mode, InputMode::Opening);
    for c in path.display().to_string().chars() {
        dispatch(&mut app, key(KeyCode::Char(c)));
    }
    // 'q' while typing is part of the path, not quit
    dispatch(&mut app, key(KeyCode::Char('q')));
    dispatch(&mut app, key(KeyCode::Backspace));
    dispatch(&mut app, key(KeyCode::Enter));

    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(app.dashboard().unwrap().rows, 3);
}

#[test]
fn test_failed_load_keeps_previous_table() {
    let temp = tempfile::tempdir().unwrap();
    let good = common::write_sample_orders(temp.path());
    let bad = common::write_file(temp.path(), "bad.csv", "order_status\ndelivered\n");
    let (tx, _rx) = mpsc::channel();
    let mut app = App::new(tx);

    open(&mut app, &good);
    open(&mut app, &bad);

    let message = app.error_message().unwrap();
    assert!(message.starts_with("Failed to load"));
    assert!(message.contains("Column not found: order_purchase_timestamp"));
    assert_eq!(app.dashboard().unwrap().rows, 3);
    assert_eq!(app.session().path(), Some(good.as_path()));

    dispatch(&mut app, key(KeyCode::Esc));
    assert!(app.error_message().is_none());
}

#[test]
fn test_unreadable_file_keeps_previous_table() {
    let temp = tempfile::tempdir().unwrap();
    let good = common::write_sample_orders(temp.path());
    let mut ragged = common::sample_orders_csv();
    ragged.push_str("o4,delivered,2024-03-01,,,,,extra,fields\n");
    let bad = common::write_file(temp.path(), "ragged.csv", ragged);
    let (tx, _rx) = mpsc::channel();
    let mut app = App::new(tx);

    open(&mut app, &good);
    open(&mut app, &bad);

    assert!(app.error_message().unwrap().starts_with("Failed to load"));
    assert_eq!(app.dashboard().unwrap().rows, 3);
    assert_eq!(app.session().path(), Some(good.as_path()));
}

#[test]
fn test_missing_file_shows_error() {
    let (tx, _rx) = mpsc::channel();
    let mut app = App::new(tx);
    open(&mut app, Path::new("/definitely/not/here.csv"));
    assert!(app.error_message().is_some());
    assert!(app.dashboard().is_none());
}

#[test]
fn test_missing_status_column_only_fails_status_view() {
    let temp = tempfile::tempdir().unwrap();
    let csv = common::sample_orders_csv().replace("order_status", "state");
    let path = common::write_file(temp.path(), "orders.csv", csv);
    let (tx, _rx) = mpsc::channel();
    let mut app = App::new(tx);

    open(&mut app, &path);
    let dashboard = app.dashboard().unwrap();
    assert!(matches!(dashboard.status, ViewState::Failed(_)));
    assert!(dashboard.approval.ready().is_some());
    assert!(dashboard.delivery.ready().is_some());
    assert!(dashboard.trend.ready().is_some());
}

#[test]
fn test_quit_keys() {
    let (tx, _rx) = mpsc::channel();
    let mut app = App::new(tx);
    assert!(matches!(app.event(&key(KeyCode::Char('q'))), Some(AppEvent::Exit)));
    assert!(matches!(app.event(&key(KeyCode::Esc)), Some(AppEvent::Exit)));
}

#[test]
fn test_render_dashboard() {
    let temp = tempfile::tempdir().unwrap();
    let path = common::write_sample_orders(temp.path());
    let (tx, _rx) = mpsc::channel();
    let mut app = App::new(tx);
    open(&mut app, &path);

    let area = Rect::new(0, 0, 160, 50);
    let mut buf = Buffer::empty(area);
    (&mut app).render(area, &mut buf);
    let text: String = buf.content().iter().map(|c| c.symbol()).collect();

    assert!(text.contains("Data Overview"));
    assert!(text.contains("Orders by Status"));
    assert!(text.contains("Approval Time"));
    assert!(text.contains("Delivery vs Estimate"));
    assert!(text.contains("Orders per Month"));
    assert!(text.contains("Rows: 3"));
}

#[test]
fn test_render_before_open() {
    let (tx, _rx) = mpsc::channel();
    let mut app = App::new(tx);
    let area = Rect::new(0, 0, 120, 40);
    let mut buf = Buffer::empty(area);
    (&mut app).render(area, &mut buf);
    let text: String = buf.content().iter().map(|c| c.symbol()).collect();
    assert!(text.contains("press o"));
}
