//! Turn aggregate views into plottable points, axis bounds and labels.
//!
//! Shared by the terminal widgets and the PNG export so both draw the same
//! numbers.

use crate::aggregate::{ApprovalHistogram, OrderTrend, StatusCounts};
use chrono::NaiveDate;

/// Bars at x = 0, 1, 2, ... with the status as label
pub fn status_points(counts: &StatusCounts) -> (Vec<(f64, f64)>, Vec<String>) {
    counts
        .buckets
        .iter()
        .enumerate()
        .map(|(i, b)| ((i as f64, b.count as f64), b.status.clone()))
        .unzip()
}

/// One point per bin at the bin centre
pub fn histogram_points(histogram: &ApprovalHistogram) -> Vec<(f64, f64)> {
    histogram
        .bins
        .iter()
        .map(|b| ((b.start + b.end) / 2.0, b.count as f64))
        .collect()
}

/// x = days since the Unix epoch for the first of each month
pub fn trend_points(trend: &OrderTrend) -> Vec<(f64, f64)> {
    trend
        .points
        .iter()
        .map(|p| (date_to_days(p.month), p.orders as f64))
        .collect()
}

pub fn date_to_days(date: NaiveDate) -> f64 {
    date.signed_duration_since(NaiveDate::default()).num_days() as f64
}

/// Inverse of [`date_to_days`], rounding to the nearest day
pub fn days_to_date(days: f64) -> Option<NaiveDate> {
    NaiveDate::default().checked_add_signed(chrono::Duration::days(days.round() as i64))
}

/// "2024-01" style label for a month axis value
pub fn format_month_label(days: f64) -> String {
    days_to_date(days)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

/// Pad a range so a single value still gets a visible axis
pub fn padded_bounds(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if max > min {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    } else {
        (min - 1.0, max + 1.0)
    }
}

/// Compact tick label: integer when whole, else 1-2 decimals.
pub fn format_tick(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let abs = v.abs();
    if abs >= 100_000.0 {
        format!("{:.1e}", v)
    } else if (v - v.round()).abs() < 1e-10 {
        format!("{:.0}", v)
    } else if abs >= 1.0 {
        format!("{:.1}", v)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{StatusBucket, TrendPoint};

    #[test]
    fn test_status_points_follow_bucket_order() {
        let counts = StatusCounts {
            buckets: vec![
                StatusBucket {
                    status: "delivered".into(),
                    count: 2,
                },
                StatusBucket {
                    status: "shipped".into(),
                    count: 1,
                },
            ],
            total: 3,
        };
        let (points, labels) = status_points(&counts);
        assert_eq!(points, vec![(0.0, 2.0), (1.0, 1.0)]);
        assert_eq!(labels, vec!["delivered", "shipped"]);
    }

    #[test]
    fn test_month_round_trip_label() {
        let trend = OrderTrend {
            points: vec![TrendPoint {
                month: NaiveDate::from_ymd_opt(2017, 9, 1).unwrap(),
                orders: 4,
            }],
        };
        let points = trend_points(&trend);
        assert_eq!(format_month_label(points[0].0), "2017-09");
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(0.0), "0");
        assert_eq!(format_tick(12.0), "12");
        assert_eq!(format_tick(2.5), "2.5");
        assert_eq!(format_tick(0.25), "0.25");
    }

    #[test]
    fn test_padded_bounds_single_value() {
        assert_eq!(padded_bounds(5.0, 5.0), (4.0, 6.0));
    }
}
