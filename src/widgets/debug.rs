use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Paragraph, Widget},
};

/// Counters shown in the debug line when `--debug` is on.
#[derive(Debug, Default, Clone)]
pub struct DebugState {
    pub enabled: bool,
    pub num_events: usize,
    pub num_key_events: usize,
    pub num_frames: usize,
    pub last_key_event_name: String,
    pub last_action: String,
    pub cache_hits: usize,
    pub cached_tables: usize,
}

impl DebugState {
    pub fn on_key(&mut self, event: &KeyEvent) {
        self.num_key_events += 1;
        self.last_key_event_name = match event.code {
            KeyCode::Char(c) => c.to_string(),
            code => format!("{:?}", code),
        };
    }

    pub fn on_action(&mut self, action: impl Into<String>) {
        self.last_action = action.into();
        tracing::debug!(action = %self.last_action, "action");
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let text = format!(
            "events: {} keys: {} frames: {} last key: {} action: {} cache: {} tables / {} hits",
            self.num_events,
            self.num_key_events,
            self.num_frames,
            self.last_key_event_name,
            self.last_action,
            self.cached_tables,
            self.cache_hits,
        );
        Paragraph::new(text)
            .style(Style::default().fg(Color::Black).bg(Color::Yellow))
            .render(area, buf);
    }
}
