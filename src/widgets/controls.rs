use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Paragraph, Widget},
};

use crate::config::Theme;

pub const CONTROLS: [(&str, &str); 5] = [
    ("f", "Full data"),
    ("o", "Open"),
    ("r", "Reload"),
    ("e", "Export"),
    ("q", "Quit"),
];

/// Bottom bar listing the key bindings and the loaded row count.
pub struct Controls {
    pub row_count: Option<usize>,
    pub dimmed: bool,
    pub full_data: bool,
    bar_bg: Color,
    key_fg: Color,
    text_fg: Color,
    active_fg: Color,
    dimmed_fg: Color,
}

impl Controls {
    pub fn new(theme: &Theme) -> Self {
        Self {
            row_count: None,
            dimmed: false,
            full_data: false,
            bar_bg: theme.get("controls_bg"),
            key_fg: theme.get("text_primary"),
            text_fg: theme.get("text_primary"),
            active_fg: theme.get("primary"),
            dimmed_fg: theme.get("dimmed"),
        }
    }

    pub fn with_row_count(mut self, row_count: Option<usize>) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }

    pub fn with_full_data(mut self, full_data: bool) -> Self {
        self.full_data = full_data;
        self
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut constraints = CONTROLS.iter().fold(vec![], |mut acc, (key, action)| {
            acc.push(Constraint::Length(key.chars().count() as u16 + 2));
            acc.push(Constraint::Length(action.chars().count() as u16 + 1));
            acc
        });
        if self.row_count.is_some() {
            constraints.push(Constraint::Length(15)); // "Rows: 12345"
        }
        constraints.push(Constraint::Fill(1));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);

        let base_style = if self.dimmed {
            Style::default().fg(self.dimmed_fg)
        } else {
            Style::default().fg(self.key_fg)
        };

        for (i, (key, action)) in CONTROLS.iter().enumerate() {
            let j = i * 2;
            Paragraph::new(*key)
                .style(base_style.bold())
                .centered()
                .render(layout[j], buf);
            // Highlight the toggle while the full table is shown
            let action_style = if *key == "f" && self.full_data && !self.dimmed {
                base_style.bg(self.bar_bg).fg(self.active_fg)
            } else if self.dimmed {
                base_style.bg(self.bar_bg)
            } else {
                base_style.bg(self.bar_bg).fg(self.text_fg)
            };
            Paragraph::new(*action)
                .style(action_style)
                .render(layout[j + 1], buf);
        }

        let mut fill_start_idx = CONTROLS.len() * 2;
        if let Some(count) = self.row_count {
            Paragraph::new(format!("Rows: {}", count))
                .style(base_style.bg(self.bar_bg))
                .right_aligned()
                .render(layout[fill_start_idx], buf);
            fill_start_idx += 1;
        }

        Paragraph::new("")
            .style(base_style.bg(self.bar_bg))
            .render(layout[fill_start_idx], buf);
    }
}
