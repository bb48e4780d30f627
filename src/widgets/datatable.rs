use std::borrow::Cow;

use polars::prelude::*;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};

use crate::config::Theme;

/// Data overview: the first rows of the table, or a scrollable window over all rows.
pub struct DataOverview<'a> {
    df: &'a DataFrame,
    /// Rows eligible for display (sample size or full height)
    visible_rows: usize,
    offset: usize,
    show_full_data: bool,
    header_fg: Color,
    border_fg: Color,
    text_fg: Color,
    cell_padding: u16,
}

impl<'a> DataOverview<'a> {
    pub fn new(df: &'a DataFrame, visible_rows: usize, theme: &Theme) -> Self {
        Self {
            df,
            visible_rows: visible_rows.min(df.height()),
            offset: 0,
            show_full_data: false,
            header_fg: theme.get("table_header"),
            border_fg: theme.get("table_border"),
            text_fg: theme.get("text_primary"),
            cell_padding: 2,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_full_data(mut self, show_full_data: bool) -> Self {
        self.show_full_data = show_full_data;
        self
    }

    fn title(&self, shown: usize) -> String {
        let total = self.df.height();
        if self.show_full_data {
            let first = if shown == 0 { 0 } else { self.offset + 1 };
            format!(
                " Data Overview: rows {}-{} of {} ",
                first,
                self.offset + shown,
                total
            )
        } else {
            format!(" Data Overview: first {} of {} rows ", self.visible_rows, total)
        }
    }
}

/// Cell text for one value; nulls are blank.
pub fn cell_text<'a>(value: &'a AnyValue<'a>) -> Cow<'a, str> {
    if matches!(value, AnyValue::Null) {
        Cow::Borrowed("")
    } else {
        value.str_value()
    }
}

impl Widget for DataOverview<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.border_fg));
        let inner = block.inner(area);

        // One line is the header
        let capacity = inner.height.saturating_sub(1) as usize;
        let offset = self.offset.min(self.visible_rows.saturating_sub(1));
        let shown = self.visible_rows.saturating_sub(offset).min(capacity);

        block.title(self.title(shown)).render(area, buf);

        if self.df.width() == 0 || self.visible_rows == 0 {
            Paragraph::new("No rows")
                .style(Style::default().fg(self.text_fg))
                .centered()
                .render(inner, buf);
            return;
        }

        let mut widths: Vec<u16> = self
            .df
            .get_column_names()
            .iter()
            .map(|name| name.chars().count() as u16)
            .collect();
        let mut rows: Vec<Vec<Cell>> = vec![vec![]; shown];
        let mut used_width = 0u16;
        let mut visible_columns = 0;

        for (col_index, column) in self.df.get_columns().iter().enumerate() {
            let mut max_len = widths[col_index];
            for (i, row) in rows.iter_mut().enumerate() {
                let value = column.get(offset + i).unwrap_or(AnyValue::Null);
                let text = cell_text(&value).into_owned();
                max_len = max_len.max(text.chars().count() as u16);
                row.push(Cell::from(Line::from(text)));
            }

            // Use > so a column that fits exactly is still shown
            let overflows = used_width + max_len > inner.width;
            if overflows {
                if visible_columns == 0 || column.dtype() == &DataType::String {
                    widths[col_index] = inner.width.saturating_sub(used_width);
                    visible_columns += 1;
                }
                break;
            }
            widths[col_index] = max_len;
            used_width += max_len + self.cell_padding;
            visible_columns += 1;
        }

        widths.truncate(visible_columns);
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|mut row| {
                row.truncate(visible_columns);
                Row::new(row).style(Style::default().fg(self.text_fg))
            })
            .collect();
        let headers: Vec<Span> = self
            .df
            .get_column_names()
            .iter()
            .take(visible_columns)
            .map(|name| Span::styled(name.to_string(), Style::default().bold()))
            .collect();

        Table::new(rows, widths)
            .column_spacing(self.cell_padding)
            .header(Row::new(headers).style(Style::default().fg(self.header_fg)))
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_null_cells_are_blank() {
        assert_eq!(cell_text(&AnyValue::Null), "");
        assert_eq!(cell_text(&AnyValue::String("shipped")), "shipped");
    }

    #[test]
    fn test_sample_rows_only() {
        let df = df!(
            "order_id" => ["a", "b", "c", "d", "e", "f", "g"],
            "order_status" => ["s1", "s2", "s3", "s4", "s5", "s6", "s7"]
        )
        .unwrap();
        let area = Rect::new(0, 0, 60, 12);
        let mut buf = Buffer::empty(area);
        DataOverview::new(&df, 5, &Theme::default()).render(area, &mut buf);
        let text = buffer_text(&buf);
        assert!(text.contains("first 5 of 7 rows"));
        assert!(text.contains("s5"));
        assert!(!text.contains("s6"));
    }

    #[test]
    fn test_full_data_scrolls() {
        let df = df!("order_status" => ["s1", "s2", "s3", "s4", "s5", "s6", "s7"]).unwrap();
        let area = Rect::new(0, 0, 40, 6);
        let mut buf = Buffer::empty(area);
        DataOverview::new(&df, 7, &Theme::default())
            .with_full_data(true)
            .with_offset(4)
            .render(area, &mut buf);
        let text = buffer_text(&buf);
        assert!(text.contains("rows 5-7 of 7"));
        assert!(text.contains("s7"));
        assert!(!text.contains("s1"));
    }
}
