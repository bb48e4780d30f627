//! Dashboard chart panels: status bars, approval histogram, delivery boxplot, monthly trend.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph,
        Widget, Wrap,
    },
};

use crate::aggregate::{ApprovalHistogram, DeliveryComparison, OrderTrend, StatusCounts};
use crate::chart_data::{
    format_month_label, format_tick, histogram_points, padded_bounds, trend_points,
};
use crate::config::Theme;
use crate::dashboard::ViewState;

pub const STATUS_TITLE: &str = " Orders by Status ";
pub const APPROVAL_TITLE: &str = " Approval Time (hours) ";
pub const DELIVERY_TITLE: &str = " Delivery vs Estimate (days) ";
pub const TREND_TITLE: &str = " Orders per Month ";

/// Draw the panel frame and either hand the inner area to `draw` or show the
/// empty/failed message in its place.
fn render_panel<T>(
    area: Rect,
    buf: &mut Buffer,
    theme: &Theme,
    title: &str,
    view: Option<&ViewState<T>>,
    draw: impl FnOnce(&T, Rect, &mut Buffer),
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.get("table_border")))
        .title(Span::styled(title, Style::default().fg(theme.get("primary")).bold()));
    let inner = block.inner(area);
    block.render(area, buf);

    let message = |text: String, color: Color, buf: &mut Buffer| {
        Paragraph::new(text)
            .style(Style::default().fg(color))
            .centered()
            .wrap(Wrap { trim: true })
            .render(inner, buf);
    };

    match view {
        None => message(
            "Open a CSV file to get started (press o)".to_string(),
            theme.get("text_secondary"),
            buf,
        ),
        Some(ViewState::NoData) => message("No data".to_string(), theme.get("text_secondary"), buf),
        Some(ViewState::Failed(err)) => message(err.clone(), theme.get("error"), buf),
        Some(ViewState::Ready(value)) => draw(value, inner, buf),
    }
}

fn axis_labels(min: f64, max: f64, style: Style, format: impl Fn(f64) -> String) -> Vec<Span<'static>> {
    vec![
        Span::styled(format(min), style),
        Span::styled(format((min + max) / 2.0), style),
        Span::styled(format(max), style),
    ]
}

pub fn render_status_chart(
    area: Rect,
    buf: &mut Buffer,
    theme: &Theme,
    view: Option<&ViewState<StatusCounts>>,
) {
    render_panel(area, buf, theme, STATUS_TITLE, view, |counts, inner, buf| {
        let bar_style = Style::default().fg(theme.get("status_bar"));
        let value_style = Style::default()
            .fg(theme.get("text_primary"))
            .bg(theme.get("status_bar"));
        let label_style = Style::default().fg(theme.get("text_secondary"));

        let n = u16::try_from(counts.buckets.len())
            .unwrap_or(u16::MAX)
            .max(1);
        let gap = 1u16;
        let bar_width = (inner.width.saturating_sub(gap.saturating_mul(n)) / n).clamp(1, 12);

        let bars: Vec<Bar> = counts
            .buckets
            .iter()
            .map(|b| {
                Bar::default()
                    .value(b.count as u64)
                    .text_value(b.count.to_string())
                    .label(Line::styled(b.status.clone(), label_style))
                    .style(bar_style)
                    .value_style(value_style)
            })
            .collect();

        BarChart::default()
            .data(BarGroup::default().bars(&bars))
            .bar_width(bar_width)
            .bar_gap(gap)
            .render(inner, buf);
    });
}

pub fn render_approval_chart(
    area: Rect,
    buf: &mut Buffer,
    theme: &Theme,
    view: Option<&ViewState<ApprovalHistogram>>,
) {
    render_panel(area, buf, theme, APPROVAL_TITLE, view, |histogram, inner, buf| {
        let points = histogram_points(histogram);
        let (x_min, x_max) = match (histogram.bins.first(), histogram.bins.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => (0.0, 1.0),
        };
        let y_max = histogram.max_count().max(1) as f64;

        let label_style = Style::default().fg(theme.get("text_primary"));
        let x_axis = Axis::default()
            .title("Hours")
            .bounds([x_min, x_max])
            .style(label_style)
            .labels(axis_labels(x_min, x_max, label_style, format_tick));
        let y_axis = Axis::default()
            .title("Orders")
            .bounds([0.0, y_max])
            .style(label_style)
            .labels(axis_labels(0.0, y_max, label_style, format_tick));

        let dataset = Dataset::default()
            .marker(symbols::Marker::HalfBlock)
            .graph_type(GraphType::Bar)
            .style(Style::default().fg(theme.get("histogram_bar")))
            .data(&points);

        Chart::new(vec![dataset])
            .x_axis(x_axis)
            .y_axis(y_axis)
            .render(inner, buf);

        if histogram.excluded > 0 {
            let note = format!("{} rows without approval", histogram.excluded);
            let width = (note.chars().count() as u16).min(inner.width);
            let note_area = Rect::new(inner.right().saturating_sub(width), inner.y, width, 1);
            Paragraph::new(note)
                .style(Style::default().fg(theme.get("text_secondary")))
                .render(note_area, buf);
        }
    });
}

pub fn render_delivery_chart(
    area: Rect,
    buf: &mut Buffer,
    theme: &Theme,
    view: Option<&ViewState<DeliveryComparison>>,
) {
    render_panel(area, buf, theme, DELIVERY_TITLE, view, |comparison, inner, buf| {
        let Some((lo, hi)) = comparison.bounds() else {
            return;
        };
        let (y_min, y_max) = padded_bounds(lo, hi);
        let box_half = 0.3;
        let cap_half = 0.2;
        let color_keys = ["delivery_box", "estimate_box"];

        let mut segments: Vec<(Vec<(f64, f64)>, Style)> = Vec::new();
        let mut outliers: Vec<(Vec<(f64, f64)>, Style)> = Vec::new();
        for (idx, stat) in comparison.series().into_iter().enumerate() {
            if stat.is_empty() {
                continue;
            }
            let x = idx as f64;
            let style = Style::default().fg(theme.get(color_keys[idx % color_keys.len()]));
            let mut push = |points: Vec<(f64, f64)>| segments.push((points, style));
            push(vec![
                (x - box_half, stat.q1),
                (x + box_half, stat.q1),
                (x + box_half, stat.q3),
                (x - box_half, stat.q3),
                (x - box_half, stat.q1),
            ]);
            push(vec![(x - box_half, stat.median), (x + box_half, stat.median)]);
            push(vec![(x, stat.lower_whisker), (x, stat.q1)]);
            push(vec![(x, stat.q3), (x, stat.upper_whisker)]);
            push(vec![
                (x - cap_half, stat.lower_whisker),
                (x + cap_half, stat.lower_whisker),
            ]);
            push(vec![
                (x - cap_half, stat.upper_whisker),
                (x + cap_half, stat.upper_whisker),
            ]);
            if !stat.outliers.is_empty() {
                outliers.push((
                    stat.outliers.iter().map(|&y| (x, y)).collect(),
                    Style::default().fg(theme.get("outlier_marker")),
                ));
            }
        }

        let mut datasets: Vec<Dataset> = segments
            .iter()
            .map(|(points, style)| {
                Dataset::default()
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(*style)
                    .data(points)
            })
            .collect();
        datasets.extend(outliers.iter().map(|(points, style)| {
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(*style)
                .data(points)
        }));

        let label_style = Style::default().fg(theme.get("text_primary"));
        let names: Vec<Span> = comparison
            .series()
            .iter()
            .map(|s| Span::styled(s.name.clone(), label_style))
            .collect();
        let x_axis = Axis::default()
            .bounds([-0.5, 1.5])
            .style(label_style)
            .labels(names);
        let y_axis = Axis::default()
            .title("Days")
            .bounds([y_min, y_max])
            .style(label_style)
            .labels(axis_labels(y_min, y_max, label_style, format_tick));

        Chart::new(datasets)
            .x_axis(x_axis)
            .y_axis(y_axis)
            .render(inner, buf);
    });
}

pub fn render_trend_chart(
    area: Rect,
    buf: &mut Buffer,
    theme: &Theme,
    view: Option<&ViewState<OrderTrend>>,
) {
    render_panel(area, buf, theme, TREND_TITLE, view, |trend, inner, buf| {
        let points = trend_points(trend);
        let (x_min, x_max) = match (points.first(), points.last()) {
            (Some(first), Some(last)) => padded_bounds(first.0, last.0),
            _ => (0.0, 1.0),
        };
        let y_max = (trend.max_orders().max(1) as f64) * 1.1;

        let label_style = Style::default().fg(theme.get("text_primary"));
        let x_axis = Axis::default()
            .bounds([x_min, x_max])
            .style(label_style)
            .labels(axis_labels(x_min, x_max, label_style, format_month_label));
        let y_axis = Axis::default()
            .title("Orders")
            .bounds([0.0, y_max])
            .style(label_style)
            .labels(axis_labels(0.0, y_max, label_style, format_tick));

        let style = Style::default().fg(theme.get("trend_line"));
        let line = Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(style)
            .data(&points);
        let markers = Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(style.bold())
            .data(&points);

        Chart::new(vec![line, markers])
            .x_axis(x_axis)
            .y_axis(y_axis)
            .render(inner, buf);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{StatusBucket, StatusCounts};

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_no_data_message() {
        let area = Rect::new(0, 0, 40, 8);
        let mut buf = Buffer::empty(area);
        let view: ViewState<StatusCounts> = ViewState::NoData;
        render_status_chart(area, &mut buf, &Theme::default(), Some(&view));
        assert!(buffer_text(&buf).contains("No data"));
    }

    #[test]
    fn test_failed_view_shows_message() {
        let area = Rect::new(0, 0, 60, 8);
        let mut buf = Buffer::empty(area);
        let view: ViewState<StatusCounts> =
            ViewState::Failed("Column not found: order_status".into());
        render_status_chart(area, &mut buf, &Theme::default(), Some(&view));
        assert!(buffer_text(&buf).contains("Column not found: order_status"));
    }

    #[test]
    fn test_many_statuses_render_without_overflow() {
        let area = Rect::new(0, 0, 80, 20);
        let mut buf = Buffer::empty(area);
        let buckets: Vec<StatusBucket> = (0..65_536)
            .map(|i| StatusBucket {
                status: format!("s{}", i),
                count: 1,
            })
            .collect();
        let view = ViewState::Ready(StatusCounts {
            total: buckets.len(),
            buckets,
        });
        render_status_chart(area, &mut buf, &Theme::default(), Some(&view));
        assert!(buffer_text(&buf).contains("Orders by Status"));
    }

    #[test]
    fn test_status_bars_render_labels() {
        let area = Rect::new(0, 0, 60, 12);
        let mut buf = Buffer::empty(area);
        let view = ViewState::Ready(StatusCounts {
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
        });
        render_status_chart(area, &mut buf, &Theme::default(), Some(&view));
        let text = buffer_text(&buf);
        assert!(text.contains("Orders by Status"));
        assert!(text.contains("deliver"));
    }
}
