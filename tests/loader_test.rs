use orderlens::config::ChartConfig;
use orderlens::error_display::user_message_from_report;
use orderlens::{load_orders, CompressionFormat, Dashboard, LoadOptions, TableCache};
use std::io::Write;
use std::sync::Arc;

mod common;

#[test]
fn test_row_count_matches_data_rows() {
    let csv = common::sample_orders_csv();
    let table = load_orders(csv.as_bytes(), &LoadOptions::default()).unwrap();
    assert_eq!(table.height(), 3);
    assert_eq!(table.total_unparsed(), 0);
}

#[test]
fn test_bad_timestamps_become_null() {
    let csv = common::orders_csv(&[
        ["delivered", "2024-01-01 00:00:00", "yesterday", "", "", ""],
        ["delivered", "2024-13-45 00:00:00", "2024-01-02", "", "", ""],
    ]);
    let table = load_orders(csv.as_bytes(), &LoadOptions::default()).unwrap();
    assert_eq!(table.height(), 2);
    assert_eq!(table.total_unparsed(), 2);

    let purchase = table.df().column("order_purchase_timestamp").unwrap();
    assert_eq!(purchase.null_count(), 1);
}

#[test]
fn test_missing_timestamp_column_fails_load() {
    let csv = "order_status,order_purchase_timestamp\ndelivered,2024-01-01\n";
    let err = load_orders(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
    assert_eq!(
        user_message_from_report(&err, None),
        "Column not found: order_approved_at"
    );
}

#[test]
fn test_semicolon_delimiter() {
    let csv = common::sample_orders_csv().replace(',', ";");
    let table = load_orders(csv.as_bytes(), &LoadOptions::default().with_delimiter(b';')).unwrap();
    assert_eq!(table.height(), 3);
}

#[test]
fn test_gzip_upload() {
    let csv = common::sample_orders_csv();
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(csv.as_bytes()).unwrap();
    let bytes = encoder.finish().unwrap();

    let options = LoadOptions::default().with_compression(Some(CompressionFormat::Gzip));
    let table = load_orders(&bytes, &options).unwrap();
    assert_eq!(table.height(), 3);
}

#[test]
fn test_same_bytes_give_identical_views() {
    let csv = common::sample_orders_csv();
    let first = load_orders(csv.as_bytes(), &LoadOptions::default()).unwrap();
    let second = load_orders(csv.as_bytes(), &LoadOptions::default()).unwrap();
    assert_eq!(first.key(), second.key());
    assert_eq!(
        Dashboard::build(&first, &ChartConfig::default()),
        Dashboard::build(&second, &ChartConfig::default())
    );
}

#[test]
fn test_cache_shared_between_sessions() {
    let csv = common::sample_orders_csv();
    let cache = TableCache::new();
    let other_session = cache.clone();

    let first = cache
        .get_or_load(csv.as_bytes(), &LoadOptions::default(), "a.csv")
        .unwrap();
    let second = other_session
        .get_or_load(csv.as_bytes(), &LoadOptions::default(), "b.csv")
        .unwrap();

    assert!(!first.hit);
    assert!(second.hit);
    assert!(Arc::ptr_eq(&first.table, &second.table));
    assert_eq!(cache.len().unwrap(), 1);

    let different = format!("{}o4,created,2024-03-01,,,,\n", csv);
    let third = cache
        .get_or_load(different.as_bytes(), &LoadOptions::default(), "c.csv")
        .unwrap();
    assert!(!third.hit);
    assert_eq!(cache.len().unwrap(), 2);
}

#[test]
fn test_late_text_in_numeric_looking_column() {
    let mut csv = String::from(common::ORDERS_HEADER);
    csv.push('\n');
    for i in 0..150 {
        csv.push_str(&format!("{},delivered,2024-01-01,,,,\n", i));
    }
    csv.push_str("abc123,delivered,2024-01-01,,,,\n");

    let table = load_orders(csv.as_bytes(), &LoadOptions::default()).unwrap();
    assert_eq!(table.height(), 151);
}

#[test]
fn test_ragged_row_fails_load() {
    let mut csv = common::sample_orders_csv();
    csv.push_str("o4,delivered,2024-03-01,,,,,extra,fields\n");
    assert!(load_orders(csv.as_bytes(), &LoadOptions::default()).is_err());
}

#[test]
fn test_invalid_utf8_fails_load() {
    let mut bytes = common::sample_orders_csv().into_bytes();
    bytes.extend_from_slice(b"o4,deliv\xff\xfeered,2024-03-01,,,,\n");
    assert!(load_orders(&bytes, &LoadOptions::default()).is_err());
}
