use crate::loader::{OrderTable, STATUS_COLUMN};
use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;

/// Label for rows whose status is null
pub const MISSING_STATUS: &str = "(missing)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBucket {
    pub status: String,
    pub count: usize,
}

/// Orders per status, largest bucket first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub buckets: Vec<StatusBucket>,
    pub total: usize,
}

impl StatusCounts {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn max_count(&self) -> usize {
        self.buckets.iter().map(|b| b.count).max().unwrap_or(0)
    }

    pub fn get(&self, status: &str) -> Option<usize> {
        self.buckets
            .iter()
            .find(|b| b.status == status)
            .map(|b| b.count)
    }
}

/// Count rows per distinct `order_status`.
///
/// Every value is its own bucket, including a bucket for nulls, so the counts
/// always add up to the table height.
pub fn status_counts(table: &OrderTable) -> Result<StatusCounts> {
    table
        .df()
        .column(STATUS_COLUMN)
        .map_err(|_| PolarsError::ColumnNotFound(STATUS_COLUMN.into()))?;

    let grouped = table
        .df()
        .clone()
        .lazy()
        .select([col(STATUS_COLUMN).cast(DataType::String)])
        .group_by([col(STATUS_COLUMN)])
        .agg([len().alias("count")])
        .collect()?;

    let statuses = grouped.column(STATUS_COLUMN)?.str()?;
    let counts = grouped.column("count")?.cast(&DataType::UInt64)?;
    let counts = counts.u64()?;

    let mut buckets: Vec<StatusBucket> = statuses
        .into_iter()
        .zip(counts.into_iter())
        .map(|(status, count)| StatusBucket {
            status: status.unwrap_or(MISSING_STATUS).to_string(),
            count: count.unwrap_or(0) as usize,
        })
        .collect();
    buckets.sort_by(|a, b| match b.count.cmp(&a.count) {
        Ordering::Equal => a.status.cmp(&b.status),
        other => other,
    });

    let total = buckets.iter().map(|b| b.count).sum();
    tracing::debug!(buckets = buckets.len(), total, "status counts");

    Ok(StatusCounts { buckets, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load_orders, LoadOptions};

    fn table(statuses: &[&str]) -> OrderTable {
        let mut csv = String::from(
            "order_status,order_purchase_timestamp,order_approved_at,order_delivered_carrier_date,order_delivered_customer_date,order_estimated_delivery_date\n",
        );
        for s in statuses {
            csv.push_str(&format!("{},2024-01-01,,,,\n", s));
        }
        load_orders(csv.as_bytes(), &LoadOptions::default()).unwrap()
    }

    #[test]
    fn test_counts_sorted_by_count_then_name() {
        let counts = status_counts(&table(&[
            "shipped",
            "delivered",
            "canceled",
            "delivered",
            "shipped",
            "delivered",
        ]))
        .unwrap();
        let order: Vec<_> = counts.buckets.iter().map(|b| b.status.as_str()).collect();
        assert_eq!(order, vec!["delivered", "shipped", "canceled"]);
        assert_eq!(counts.total, 6);
        assert_eq!(counts.max_count(), 3);
    }

    #[test]
    fn test_null_status_has_own_bucket() {
        let counts = status_counts(&table(&["delivered", "", "delivered"])).unwrap();
        assert_eq!(counts.get("delivered"), Some(2));
        assert_eq!(counts.get(MISSING_STATUS), Some(1));
        assert_eq!(counts.total, 3);
    }
}
