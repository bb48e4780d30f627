//! Chart export to PNG with the plotters bitmap backend.

use crate::aggregate::{ApprovalHistogram, DeliveryComparison, OrderTrend, StatusCounts};
use crate::chart_data::{
    format_month_label, format_tick, padded_bounds, status_points, trend_points,
};
use crate::dashboard::Dashboard;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

pub const STATUS_FILE: &str = "status_counts.png";
pub const HISTOGRAM_FILE: &str = "approval_histogram.png";
pub const BOXPLOT_FILE: &str = "delivery_boxplot.png";
pub const TREND_FILE: &str = "order_trend.png";

const STATUS_COLOR: RGBColor = RGBColor(102, 194, 165);
const HISTOGRAM_COLOR: RGBColor = RGBColor(99, 110, 250);
const DELIVERY_COLOR: RGBColor = RGBColor(255, 160, 122);
const ESTIMATE_COLOR: RGBColor = RGBColor(0, 191, 255);
const TREND_COLOR: RGBColor = RGBColor(44, 160, 44);

/// Label formatter for categorical x positions 0, 1, 2, ...
fn category_label(labels: &[String], v: f64) -> String {
    let idx = v.round();
    if (v - idx).abs() > 0.25 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Bar chart of orders per status.
pub fn write_status_png(path: &Path, counts: &StatusCounts, (width, height): (u32, u32)) -> Result<()> {
    if counts.is_empty() {
        return Err(eyre!("No data to export"));
    }
    let (points, labels) = status_points(counts);

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = points.len() as f64 - 0.5;
    let y_max = counts.max_count() as f64 * 1.1;
    let mut chart = ChartBuilder::on(&root)
        .margin(30)
        .caption("Orders by Status", ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..x_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len() * 2 + 1)
        .x_desc("Order Status")
        .y_desc("Count")
        .x_label_formatter(&|v: &f64| category_label(&labels, *v))
        .y_label_formatter(&|v: &f64| format_tick(*v))
        .draw()?;

    chart.draw_series(points.iter().map(|&(x, y)| {
        Rectangle::new([(x - 0.35, 0.0), (x + 0.35, y)], STATUS_COLOR.filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Histogram of approval time in hours.
pub fn write_histogram_png(
    path: &Path,
    histogram: &ApprovalHistogram,
    (width, height): (u32, u32),
) -> Result<()> {
    let (Some(first), Some(last)) = (histogram.bins.first(), histogram.bins.last()) else {
        return Err(eyre!("No data to export"));
    };

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = histogram.max_count() as f64 * 1.1;
    let mut chart = ChartBuilder::on(&root)
        .margin(30)
        .caption("Approval Time Distribution", ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(first.start..last.end, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Duration (hours)")
        .y_desc("Frequency")
        .x_label_formatter(&|v: &f64| format_tick(*v))
        .y_label_formatter(&|v: &f64| format_tick(*v))
        .draw()?;

    chart.draw_series(histogram.bins.iter().map(|b| {
        Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], HISTOGRAM_COLOR.filled())
    }))?;
    chart.draw_series(histogram.bins.iter().map(|b| {
        Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], WHITE.stroke_width(1))
    }))?;

    root.present()?;
    Ok(())
}

/// Side-by-side boxplot of delivery duration and estimate delta in days.
pub fn write_delivery_png(
    path: &Path,
    comparison: &DeliveryComparison,
    (width, height): (u32, u32),
) -> Result<()> {
    let (y_min, y_max) = comparison
        .bounds()
        .map(|(lo, hi)| padded_bounds(lo, hi))
        .ok_or_else(|| eyre!("No data to export"))?;

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let labels: Vec<String> = comparison.series().iter().map(|s| s.name.clone()).collect();
    let mut chart = ChartBuilder::on(&root)
        .margin(30)
        .caption("Delivery Duration vs Estimate", ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..1.5, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(5)
        .y_desc("Duration (days)")
        .x_label_formatter(&|v: &f64| category_label(&labels, *v))
        .y_label_formatter(&|v: &f64| format_tick(*v))
        .draw()?;

    let box_half = 0.3;
    let cap_half = 0.2;
    let colors = [DELIVERY_COLOR, ESTIMATE_COLOR];

    for (idx, stat) in comparison.series().into_iter().enumerate() {
        if stat.is_empty() {
            continue;
        }
        let x = idx as f64;
        let color = colors[idx % colors.len()];
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - box_half, stat.q1), (x + box_half, stat.q3)],
            color.mix(0.4).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - box_half, stat.q1), (x + box_half, stat.q3)],
            color.stroke_width(2),
        )))?;
        let segments = [
            vec![(x - box_half, stat.median), (x + box_half, stat.median)],
            vec![(x, stat.lower_whisker), (x, stat.q1)],
            vec![(x, stat.q3), (x, stat.upper_whisker)],
            vec![(x - cap_half, stat.lower_whisker), (x + cap_half, stat.lower_whisker)],
            vec![(x - cap_half, stat.upper_whisker), (x + cap_half, stat.upper_whisker)],
        ];
        chart.draw_series(
            segments
                .into_iter()
                .map(|points| PathElement::new(points, color.stroke_width(2))),
        )?;
        chart.draw_series(
            stat.outliers
                .iter()
                .map(|&y| Circle::new((x, y), 3, color.filled())),
        )?;
    }

    root.present()?;
    Ok(())
}

/// Line chart of orders per month.
pub fn write_trend_png(path: &Path, trend: &OrderTrend, (width, height): (u32, u32)) -> Result<()> {
    let points = trend_points(trend);
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(eyre!("No data to export"));
    };
    let (x_min, x_max) = padded_bounds(first.0, last.0);

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = trend.max_orders() as f64 * 1.1;
    let mut chart = ChartBuilder::on(&root)
        .margin(30)
        .caption("Order Trends Over Time", ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Month")
        .y_desc("Number of Orders")
        .x_label_formatter(&|v: &f64| format_month_label(*v))
        .y_label_formatter(&|v: &f64| format_tick(*v))
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), TREND_COLOR.stroke_width(3)))?;
    chart.draw_series(
        points
            .iter()
            .map(|&p| Circle::new(p, 4, TREND_COLOR.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Write every view that has data into `dir`. Returns the files written.
pub fn export_dashboard(
    dashboard: &Dashboard,
    dir: &Path,
    size: (u32, u32),
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    if let Some(counts) = dashboard.status.ready() {
        let path = dir.join(STATUS_FILE);
        write_status_png(&path, counts, size)?;
        written.push(path);
    }
    if let Some(histogram) = dashboard.approval.ready() {
        let path = dir.join(HISTOGRAM_FILE);
        write_histogram_png(&path, histogram, size)?;
        written.push(path);
    }
    if let Some(comparison) = dashboard.delivery.ready() {
        let path = dir.join(BOXPLOT_FILE);
        write_delivery_png(&path, comparison, size)?;
        written.push(path);
    }
    if let Some(trend) = dashboard.trend.ready() {
        let path = dir.join(TREND_FILE);
        write_trend_png(&path, trend, size)?;
        written.push(path);
    }

    tracing::info!(dir = %dir.display(), files = written.len(), "exported charts");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_label() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(category_label(&labels, 1.0), "b");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -1.0), "");
        assert_eq!(category_label(&labels, 7.0), "");
    }

    #[test]
    fn test_empty_views_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let empty = StatusCounts {
            buckets: vec![],
            total: 0,
        };
        assert!(write_status_png(&dir.path().join("s.png"), &empty, (320, 240)).is_err());
        let trend = OrderTrend { points: vec![] };
        assert!(write_trend_png(&dir.path().join("t.png"), &trend, (320, 240)).is_err());
    }
}
