//! The four read-only projections shown on the dashboard.
//!
//! Each aggregator takes the loaded table and returns its own result type.
//! They share nothing and may fail independently.

pub mod approval;
pub mod delivery;
pub mod status;
pub mod trend;

pub use approval::{approval_histogram, ApprovalHistogram, HistogramBin};
pub use delivery::{delivery_comparison, BoxSummary, DeliveryComparison};
pub use status::{status_counts, StatusBucket, StatusCounts, MISSING_STATUS};
pub use trend::{order_trend, OrderTrend, TrendPoint};
