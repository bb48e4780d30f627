use crate::loader::{OrderTable, PURCHASE_COLUMN};
use chrono::{DateTime, NaiveDate};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    /// First day of the month
    pub month: NaiveDate,
    pub orders: usize,
}

/// Orders per calendar month, oldest first. Months without orders are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTrend {
    pub points: Vec<TrendPoint>,
}

impl OrderTrend {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_orders(&self) -> usize {
        self.points.iter().map(|p| p.orders).max().unwrap_or(0)
    }
}

pub fn order_trend(table: &OrderTable) -> Result<OrderTrend> {
    let monthly = table
        .df()
        .clone()
        .lazy()
        .filter(col(PURCHASE_COLUMN).is_not_null())
        .select([col(PURCHASE_COLUMN).dt().month_start().alias("month")])
        .group_by([col("month")])
        .agg([len().alias("orders")])
        .sort(["month"], SortMultipleOptions::default())
        .collect()?;

    let months = monthly.column("month")?.cast(&DataType::Int64)?;
    let months = months.i64()?;
    let orders = monthly.column("orders")?.cast(&DataType::UInt64)?;
    let orders = orders.u64()?;

    let points = months
        .into_iter()
        .zip(orders.into_iter())
        .filter_map(|(month, orders)| Some((month?, orders.unwrap_or(0))))
        .map(|(micros, orders)| {
            let month = DateTime::from_timestamp_micros(micros)
                .ok_or_else(|| eyre!("Month out of range: {}", micros))?
                .date_naive();
            Ok(TrendPoint {
                month,
                orders: orders as usize,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(months = points.len(), "order trend");
    Ok(OrderTrend { points })
}
