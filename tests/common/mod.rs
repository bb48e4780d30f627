#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const ORDERS_HEADER: &str = "order_id,order_status,order_purchase_timestamp,order_approved_at,order_delivered_carrier_date,order_delivered_customer_date,order_estimated_delivery_date";

/// Three orders over two months; one has no approval and no delivery yet.
pub fn sample_orders_csv() -> String {
    [
        ORDERS_HEADER,
        "o1,delivered,2024-01-01 00:00:00,2024-01-01 03:00:00,2024-01-05 10:00:00,2024-01-08 09:00:00,2024-01-10 00:00:00",
        "o2,delivered,2024-01-20 12:00:00,2024-01-20 13:30:00,2024-01-22 08:00:00,2024-01-27 18:00:00,2024-01-25 00:00:00",
        "o3,shipped,2024-02-03 08:00:00,,2024-02-05 11:00:00,,2024-02-15 00:00:00",
    ]
    .join("\n")
        + "\n"
}

/// Build an orders CSV from `(status, purchase, approved, carrier, customer, estimated)` rows.
pub fn orders_csv(rows: &[[&str; 6]]) -> String {
    let mut out = String::from(ORDERS_HEADER);
    out.push('\n');
    for (i, row) in rows.iter().enumerate() {
        out.push_str(&format!("o{},{}\n", i + 1, row.join(",")));
    }
    out
}

pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

pub fn write_sample_orders(dir: &Path) -> PathBuf {
    write_file(dir, "orders.csv", sample_orders_csv())
}
