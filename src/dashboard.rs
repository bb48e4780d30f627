use crate::aggregate::{
    approval_histogram, delivery_comparison, order_trend, status_counts, ApprovalHistogram,
    DeliveryComparison, OrderTrend, StatusCounts,
};
use crate::config::ChartConfig;
use crate::derive::DerivedColumns;
use crate::error_display::user_message_from_report;
use crate::loader::OrderTable;
use color_eyre::Result;
use serde::Serialize;

/// Outcome of one view. A failed view never takes the others down with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ViewState<T> {
    Ready(T),
    /// Computed fine but nothing to show (e.g. every duration was null)
    NoData,
    Failed(String),
}

impl<T> ViewState<T> {
    fn from_result(result: Result<T>, has_data: impl FnOnce(&T) -> bool) -> Self {
        Self::from_outcome(
            result.map_err(|report| user_message_from_report(&report, None)),
            has_data,
        )
    }

    /// A view built from the shared derived columns; a failed derivation fails it too.
    fn from_derived(
        derived: Result<&DerivedColumns, &str>,
        build: impl FnOnce(&DerivedColumns) -> T,
        has_data: impl FnOnce(&T) -> bool,
    ) -> Self {
        Self::from_outcome(derived.map(build).map_err(str::to_string), has_data)
    }

    fn from_outcome(outcome: Result<T, String>, has_data: impl FnOnce(&T) -> bool) -> Self {
        match outcome {
            Ok(value) if has_data(&value) => ViewState::Ready(value),
            Ok(_) => ViewState::NoData,
            Err(message) => {
                tracing::warn!(error = %message, "view failed");
                ViewState::Failed(message)
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ViewState::Failed(_))
    }
}

/// The four aggregate views for one table, rebuilt on every display cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub source: String,
    pub rows: usize,
    pub unparsed_timestamps: usize,
    pub status: ViewState<StatusCounts>,
    pub approval: ViewState<ApprovalHistogram>,
    pub delivery: ViewState<DeliveryComparison>,
    pub trend: ViewState<OrderTrend>,
}

impl Dashboard {
    pub fn build(table: &OrderTable, config: &ChartConfig) -> Self {
        let derived = DerivedColumns::compute(table)
            .map_err(|report| user_message_from_report(&report, None));
        let derived = derived.as_ref().map_err(String::as_str);

        let dashboard = Self {
            source: table.source().to_string(),
            rows: table.height(),
            unparsed_timestamps: table.total_unparsed(),
            status: ViewState::from_result(status_counts(table), |s| !s.is_empty()),
            approval: ViewState::from_derived(
                derived,
                |d| approval_histogram(d, config.histogram_bins),
                |h| !h.is_empty(),
            ),
            delivery: ViewState::from_derived(derived, delivery_comparison, |d| !d.is_empty()),
            trend: ViewState::from_result(order_trend(table), |t| !t.is_empty()),
        };
        tracing::debug!(rows = dashboard.rows, "dashboard built");
        dashboard
    }
}
