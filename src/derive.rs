//! Row-wise duration columns computed from the order timestamps.
//!
//! Timestamps are stored as microseconds, so every duration here starts as an
//! integer difference of the physical values. Nulls on either side stay null.

use crate::loader::{
    OrderTable, APPROVED_COLUMN, CARRIER_COLUMN, CUSTOMER_COLUMN, ESTIMATED_COLUMN,
    PURCHASE_COLUMN,
};
use color_eyre::Result;
use polars::prelude::*;

pub const APPROVAL_HOURS: &str = "approval_duration_hours";
pub const DELIVERY_DAYS: &str = "delivery_duration_days";
pub const ESTIMATE_DELTA_DAYS: &str = "estimate_vs_actual_days";

const MICROS_PER_HOUR: f64 = 3_600_000_000.0;
const MICROS_PER_DAY: f64 = 86_400_000_000.0;

fn micros_between(later: &str, earlier: &str) -> Expr {
    col(later).cast(DataType::Int64) - col(earlier).cast(DataType::Int64)
}

/// `(approved_at - purchase)` in fractional hours
pub fn approval_hours() -> Expr {
    (micros_between(APPROVED_COLUMN, PURCHASE_COLUMN).cast(DataType::Float64)
        / lit(MICROS_PER_HOUR))
    .alias(APPROVAL_HOURS)
}

/// Whole days between two timestamps, floored toward negative infinity
fn floor_days_between(later: &str, earlier: &str) -> Expr {
    (micros_between(later, earlier).cast(DataType::Float64) / lit(MICROS_PER_DAY))
        .floor()
        .cast(DataType::Int64)
}

/// `delivered_to_customer - delivered_to_carrier` in whole days
pub fn delivery_days() -> Expr {
    floor_days_between(CUSTOMER_COLUMN, CARRIER_COLUMN).alias(DELIVERY_DAYS)
}

/// `estimated_delivery - delivered_to_customer` in whole days; positive means early
pub fn estimate_delta_days() -> Expr {
    floor_days_between(ESTIMATED_COLUMN, CUSTOMER_COLUMN).alias(ESTIMATE_DELTA_DAYS)
}

/// The three derived columns for one render pass. Never cached.
#[derive(Debug, Clone)]
pub struct DerivedColumns {
    pub approval_hours: Vec<Option<f64>>,
    pub delivery_days: Vec<Option<i64>>,
    pub estimate_delta_days: Vec<Option<i64>>,
}

impl DerivedColumns {
    pub fn compute(table: &OrderTable) -> Result<Self> {
        let df = table
            .df()
            .clone()
            .lazy()
            .select([approval_hours(), delivery_days(), estimate_delta_days()])
            .collect()?;

        Ok(Self {
            approval_hours: df.column(APPROVAL_HOURS)?.f64()?.into_iter().collect(),
            delivery_days: df.column(DELIVERY_DAYS)?.i64()?.into_iter().collect(),
            estimate_delta_days: df.column(ESTIMATE_DELTA_DAYS)?.i64()?.into_iter().collect(),
        })
    }

    /// Approval hours with nulls dropped, plus how many were null
    pub fn valid_approval_hours(&self) -> (Vec<f64>, usize) {
        split_nulls(&self.approval_hours)
    }
}

/// Keep the present values in order and count the missing ones
pub fn split_nulls<T: Copy>(values: &[Option<T>]) -> (Vec<T>, usize) {
    let valid: Vec<T> = values.iter().flatten().copied().collect();
    let missing = values.len() - valid.len();
    (valid, missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load_orders, LoadOptions};

    #[test]
    fn test_day_columns_floor_toward_negative_infinity() {
        let csv = "order_id,order_status,order_purchase_timestamp,order_approved_at,\
order_delivered_carrier_date,order_delivered_customer_date,order_estimated_delivery_date
o1,delivered,2024-01-01 00:00:00,2024-01-01 03:00:00,2024-01-05 10:00:00,2024-01-05 09:00:00,2024-01-08 09:00:00
o2,delivered,2024-01-01 00:00:00,,2024-01-02 00:00:00,2024-01-04 23:00:00,2024-01-04 00:00:00
";
        let table = load_orders(csv.as_bytes(), &LoadOptions::default()).unwrap();
        let derived = DerivedColumns::compute(&table).unwrap();

        assert_eq!(derived.approval_hours, vec![Some(3.0), None]);
        // Customer date one hour before the carrier date floors to -1
        assert_eq!(derived.delivery_days, vec![Some(-1), Some(2)]);
        assert_eq!(derived.estimate_delta_days, vec![Some(3), Some(-1)]);
    }

    #[test]
    fn test_split_nulls() {
        let (valid, missing) = split_nulls(&[Some(1.0), None, Some(2.5), None]);
        assert_eq!(valid, vec![1.0, 2.5]);
        assert_eq!(missing, 2);
    }
}
