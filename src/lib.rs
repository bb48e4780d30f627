use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

pub mod aggregate;
pub mod cache;
pub mod chart_data;
pub mod chart_export;
pub mod config;
pub mod dashboard;
pub mod derive;
pub mod error_display;
pub mod loader;
pub mod session;
pub mod widgets;

pub use cache::CacheManager;
pub use config::{
    rgb_to_256_color, rgb_to_basic_ansi, AppConfig, ColorParser, ConfigManager, Theme,
};
pub use dashboard::{Dashboard, ViewState};
pub use loader::{load_orders, LoadOptions, OrderTable};
pub use orderlens_cli::{Args, CompressionFormat};
pub use session::{FileKey, Session, TableCache};

use error_display::user_message_from_report;
use widgets::chart::{
    render_approval_chart, render_delivery_chart, render_status_chart, render_trend_chart,
};
use widgets::controls::Controls;
use widgets::datatable::DataOverview;
use widgets::debug::DebugState;

/// Application name used for cache directory and other app-specific paths
pub const APP_NAME: &str = "orderlens";

/// Rows moved by PageUp / PageDown in the full data overview
const PAGE_ROWS: isize = 10;

/// File loading options as given on the command line or in the config file.
/// Unset fields fall back to [`LoadOptions`] defaults when a file is opened.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub compression: Option<CompressionFormat>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_compression(mut self, compression: CompressionFormat) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Create OpenOptions from CLI args and config, with CLI args taking precedence
    pub fn from_args_and_config(args: &Args, config: &AppConfig) -> Self {
        let mut opts = OpenOptions::new();
        opts.delimiter = args.delimiter.or(config.file_loading.delimiter);

        // CLI no_header flag overrides config
        opts.has_header = if let Some(no_header) = args.no_header {
            Some(!no_header)
        } else {
            config.file_loading.has_header
        };

        opts.compression = args.compression.or_else(|| {
            config
                .file_loading
                .compression
                .as_deref()
                .and_then(CompressionFormat::from_name)
        });
        opts
    }

    /// Resolve against `path`: explicit compression wins, else the file extension decides.
    pub fn load_options(&self, path: &Path) -> LoadOptions {
        let defaults = LoadOptions::default();
        LoadOptions::default()
            .with_delimiter(self.delimiter.unwrap_or(defaults.delimiter))
            .with_has_header(self.has_header.unwrap_or(defaults.has_header))
            .with_compression(
                self.compression
                    .or_else(|| CompressionFormat::from_extension(path)),
            )
    }
}

impl From<&Args> for OpenOptions {
    fn from(args: &Args) -> Self {
        Self::from_args_and_config(args, &AppConfig::default())
    }
}

/// Load `path` and build every view once, without a terminal.
pub fn load_dashboard(path: &Path, options: &OpenOptions, config: &AppConfig) -> Result<Dashboard> {
    let mut session = Session::default();
    let lookup = session
        .open(path, &options.load_options(path))
        .map_err(|e| eyre!(user_message_from_report(&e, Some(path))))?;
    Ok(Dashboard::build(&lookup.table, &config.chart))
}

pub enum AppEvent {
    Key(KeyEvent),
    Open(PathBuf, OpenOptions),
    DoLoad(PathBuf, OpenOptions), // Internal event to actually perform loading after UI update
    ToggleFullData,
    ExportCharts(PathBuf),
    Exit,
    Crash(String),
    Resize(u16, u16), // resized (width, height)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing a path into the open prompt
    Opening,
}

#[derive(Default)]
pub struct ErrorModal {
    pub active: bool,
    pub message: String,
}

impl ErrorModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: String) {
        self.active = true;
        self.message = message;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
    }
}

pub struct App {
    events: Sender<AppEvent>,
    session: Session,
    config: AppConfig,
    theme: Theme,
    dashboard: Option<Dashboard>,
    open_options: OpenOptions,
    export_dir: PathBuf,
    debug: DebugState,
    input: String,
    pub input_mode: InputMode,
    error_modal: ErrorModal,
    status_message: Option<String>,
}

impl App {
    pub fn send_event(&mut self, event: AppEvent) -> Result<()> {
        self.events.send(event)?;
        Ok(())
    }

    pub fn new(events: Sender<AppEvent>) -> App {
        Self::new_with_config(events, Theme::default(), AppConfig::default())
    }

    pub fn new_with_config(events: Sender<AppEvent>, theme: Theme, app_config: AppConfig) -> App {
        let mut session = Session::default();
        session.show_full_data = app_config.display.show_full_data;
        let debug = DebugState {
            enabled: app_config.debug.enabled,
            ..DebugState::default()
        };

        App {
            events,
            session,
            config: app_config,
            theme,
            dashboard: None,
            open_options: OpenOptions::default(),
            export_dir: PathBuf::from("."),
            debug,
            input: String::new(),
            input_mode: InputMode::Normal,
            error_modal: ErrorModal::new(),
            status_message: None,
        }
    }

    /// Share a table cache with other sessions in this process
    pub fn with_table_cache(mut self, cache: TableCache) -> Self {
        let show_full_data = self.session.show_full_data;
        self.session = Session::new(cache);
        self.session.show_full_data = show_full_data;
        self
    }

    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = dir;
        self
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.dashboard.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_modal
            .active
            .then_some(self.error_modal.message.as_str())
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    fn color(&self, name: &str) -> Color {
        self.theme.get(name)
    }

    fn sample_rows(&self) -> usize {
        self.config.display.sample_rows
    }

    /// Recompute every view from the current table.
    fn refresh_dashboard(&mut self) {
        self.dashboard = self
            .session
            .table()
            .map(|table| Dashboard::build(table, &self.config.chart));
        self.debug.cache_hits = self.session.cache_hits;
        match self.session.cache().len() {
            Ok(len) => self.debug.cached_tables = len,
            Err(e) => tracing::warn!(error = %e, "cannot read table cache size"),
        }
    }

    fn load(&mut self, path: &Path, options: &OpenOptions) {
        match self.session.open(path, &options.load_options(path)) {
            Ok(lookup) => {
                self.open_options = options.clone();
                let suffix = if lookup.hit { " (cached)" } else { "" };
                self.status_message = Some(format!(
                    "Loaded {} rows from {}{}",
                    lookup.table.height(),
                    path.display(),
                    suffix
                ));
                tracing::info!(
                    path = %path.display(),
                    rows = lookup.table.height(),
                    cache_hit = lookup.hit,
                    "file opened"
                );
                self.refresh_dashboard();
            }
            Err(e) => {
                let message = user_message_from_report(&e, Some(path));
                tracing::warn!(error = %message, "load failed");
                self.status_message = None;
                self.error_modal.show(message);
            }
        }
    }

    fn export(&mut self, dir: &Path) {
        let Some(dashboard) = &self.dashboard else {
            self.error_modal
                .show("Open a CSV file before exporting charts".to_string());
            return;
        };
        let size = (self.config.chart.export_width, self.config.chart.export_height);
        match chart_export::export_dashboard(dashboard, dir, size) {
            Ok(written) => {
                self.status_message = Some(format!(
                    "Exported {} charts to {}",
                    written.len(),
                    dir.display()
                ));
            }
            Err(e) => {
                let message = format!("Export failed: {}", user_message_from_report(&e, None));
                tracing::warn!(error = %message, "export failed");
                self.error_modal.show(message);
            }
        }
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        self.debug.on_key(event);

        if event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(AppEvent::Exit);
        }

        // Error modal has highest priority
        if self.error_modal.active {
            if matches!(event.code, KeyCode::Esc | KeyCode::Enter) {
                self.error_modal.hide();
            }
            return None;
        }

        if self.input_mode == InputMode::Opening {
            return self.prompt_key(event);
        }

        let sample_rows = self.sample_rows();
        match event.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Exit),
            KeyCode::Char('f') => Some(AppEvent::ToggleFullData),
            KeyCode::Char('o') => {
                self.input = self
                    .session
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                self.input_mode = InputMode::Opening;
                None
            }
            KeyCode::Char('r') => {
                let path = self.session.path()?.to_path_buf();
                self.debug.on_action("reload");
                Some(AppEvent::Open(path, self.open_options.clone()))
            }
            KeyCode::Char('e') => Some(AppEvent::ExportCharts(self.export_dir.clone())),
            KeyCode::Up | KeyCode::Char('k') => {
                self.session.scroll_by(-1, sample_rows);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.session.scroll_by(1, sample_rows);
                None
            }
            KeyCode::PageUp => {
                self.session.scroll_by(-PAGE_ROWS, sample_rows);
                None
            }
            KeyCode::PageDown => {
                self.session.scroll_by(PAGE_ROWS, sample_rows);
                None
            }
            KeyCode::Home => {
                self.session.scroll_offset = 0;
                None
            }
            KeyCode::End => {
                self.session.scroll_to_end(sample_rows);
                None
            }
            _ => None,
        }
    }

    fn prompt_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        match event.code {
            KeyCode::Esc => {
                self.input.clear();
                self.input_mode = InputMode::Normal;
                None
            }
            KeyCode::Enter => {
                let path = self.input.trim().to_string();
                self.input.clear();
                self.input_mode = InputMode::Normal;
                if path.is_empty() {
                    return None;
                }
                Some(AppEvent::Open(PathBuf::from(path), self.open_options.clone()))
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                None
            }
            _ => None,
        }
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Open(path, options) => {
                // Show the loading message before doing the work
                self.status_message = Some(format!("Loading {}...", path.display()));
                Some(AppEvent::DoLoad(path.clone(), options.clone()))
            }
            AppEvent::DoLoad(path, options) => {
                self.debug.on_action("load");
                self.load(path, options);
                None
            }
            AppEvent::ToggleFullData => {
                self.debug.on_action("toggle full data");
                self.session.toggle_full_data();
                self.refresh_dashboard();
                None
            }
            AppEvent::ExportCharts(dir) => {
                self.debug.on_action("export");
                self.export(dir);
                None
            }
            AppEvent::Resize(_, _) => None,
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn render_title(&self, area: Rect, buf: &mut Buffer) {
        let mut spans = vec![Span::styled(
            " orderlens ",
            Style::default().fg(self.color("primary")).bold(),
        )];
        if let Some(dashboard) = &self.dashboard {
            spans.push(Span::styled(
                format!(" {}  {} rows ", dashboard.source, dashboard.rows),
                Style::default().fg(self.color("text_primary")),
            ));
            if dashboard.unparsed_timestamps > 0 {
                spans.push(Span::styled(
                    format!(" {} timestamps could not be parsed ", dashboard.unparsed_timestamps),
                    Style::default().fg(self.color("dimmed")),
                ));
            }
        }
        if let Some(message) = &self.status_message {
            spans.push(Span::styled(
                format!(" {}", message),
                Style::default().fg(self.color("text_secondary")),
            ));
        }
        Paragraph::new(Line::from(spans)).render(area, buf);
    }

    fn render_prompt(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Open CSV (Enter to load, Esc to cancel) ")
            .border_style(Style::default().fg(self.color("modal_border")));
        Paragraph::new(format!("{}_", self.input))
            .style(Style::default().fg(self.color("text_primary")))
            .block(block)
            .render(area, buf);
    }

    fn render_error_modal(&self, area: Rect, buf: &mut Buffer) {
        let popup_area = centered_rect(area, 70, 40);
        Clear.render(popup_area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Error")
            .border_style(Style::default().fg(self.color("modal_border_error")));
        let inner_area = block.inner(popup_area);
        block.render(popup_area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(inner_area);

        Paragraph::new(self.error_modal.message.as_str())
            .style(Style::default().fg(self.color("error")))
            .wrap(Wrap { trim: true })
            .render(chunks[0], buf);

        Paragraph::new("[ OK ]")
            .centered()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.color("modal_border"))),
            )
            .render(chunks[1], buf);
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        let visible_rows = self.session.visible_rows(self.sample_rows());
        // Header, borders, and at least one line for "No rows"
        let overview_height = (visible_rows.max(1) as u16 + 3).min(area.height / 3).max(4);

        let mut constraints = vec![
            Constraint::Length(1),
            Constraint::Length(overview_height),
            Constraint::Fill(1),
        ];
        if self.input_mode == InputMode::Opening {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Length(1)); // Controls
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.render_title(layout[0], buf);

        match self.session.table() {
            Some(table) => DataOverview::new(table.df(), visible_rows, &self.theme)
                .with_offset(self.session.scroll_offset)
                .with_full_data(self.session.show_full_data)
                .render(layout[1], buf),
            None => Paragraph::new("Open a CSV file to get started (press o)")
                .style(Style::default().fg(self.color("text_secondary")))
                .centered()
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(" Data Overview ")
                        .border_style(Style::default().fg(self.color("table_border"))),
                )
                .render(layout[1], buf),
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(layout[2]);
        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[0]);
        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let dashboard = self.dashboard.as_ref();
        render_status_chart(top[0], buf, &self.theme, dashboard.map(|d| &d.status));
        render_approval_chart(top[1], buf, &self.theme, dashboard.map(|d| &d.approval));
        render_delivery_chart(bottom[0], buf, &self.theme, dashboard.map(|d| &d.delivery));
        render_trend_chart(bottom[1], buf, &self.theme, dashboard.map(|d| &d.trend));

        let mut next = 3;
        if self.input_mode == InputMode::Opening {
            self.render_prompt(layout[next], buf);
            next += 1;
        }

        let controls = Controls::new(&self.theme)
            .with_row_count(self.session.table().map(|t| t.height()))
            .with_full_data(self.session.show_full_data)
            .with_dimmed(self.error_modal.active || self.input_mode == InputMode::Opening);
        (&controls).render(layout[next], buf);
        next += 1;

        if self.debug.enabled {
            (&self.debug).render(layout[next], buf);
        }

        if self.error_modal.active {
            self.render_error_modal(area, buf);
        }
    }
}

fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_options_cli_overrides_config() {
        let mut config = AppConfig::default();
        config.file_loading.delimiter = Some(b';');
        config.file_loading.compression = Some("gzip".to_string());
        let args = Args {
            delimiter: Some(b'\t'),
            no_header: Some(true),
            ..Args::default()
        };
        let opts = OpenOptions::from_args_and_config(&args, &config);
        assert_eq!(opts.delimiter, Some(b'\t'));
        assert_eq!(opts.has_header, Some(false));
        assert_eq!(opts.compression, Some(CompressionFormat::Gzip));
    }

    #[test]
    fn test_load_options_detects_compression_from_extension() {
        let opts = OpenOptions::new().load_options(Path::new("orders.csv.zst"));
        assert_eq!(opts.compression, Some(CompressionFormat::Zstd));
        assert_eq!(opts.delimiter, b',');
        assert!(opts.has_header);

        let explicit = OpenOptions::new()
            .with_compression(CompressionFormat::Xz)
            .load_options(Path::new("orders.csv.gz"));
        assert_eq!(explicit.compression, Some(CompressionFormat::Xz));
    }

    #[test]
    fn test_centered_rect_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(area, 70, 40);
        assert!(popup.x > 0 && popup.right() <= area.right());
        assert_eq!(popup.width, 70);
        assert_eq!(popup.height, 20);
    }
}
