use color_eyre::eyre::eyre;
use color_eyre::Result;
use orderlens_cli::CompressionFormat;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use supports_color::Stream;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate the default configuration as a fully commented-out TOML document
    pub fn generate_default_config(&self) -> Result<String> {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;

        let comments = Self::collect_all_comments();
        Ok(Self::comment_all_fields(&toml_str, &comments))
    }

    fn collect_all_comments() -> HashMap<String, String> {
        let mut comments = HashMap::new();
        let sections: [(&str, &[(&str, &str)]); 7] = [
            ("", APP_COMMENTS),
            ("file_loading", FILE_LOADING_COMMENTS),
            ("display", DISPLAY_COMMENTS),
            ("chart", CHART_COMMENTS),
            ("performance", PERFORMANCE_COMMENTS),
            ("theme.colors", COLOR_COMMENTS),
            ("debug", DEBUG_COMMENTS),
        ];

        for (section, fields) in sections {
            for (field, comment) in fields {
                let key = if section.is_empty() {
                    field.to_string()
                } else {
                    format!("{}.{}", section, field)
                };
                comments.insert(key, comment.to_string());
            }
        }

        comments
    }

    /// Comment out every section and field, prefixing each with its description.
    /// Option fields that serialize to nothing are added back as `# field = null`.
    fn comment_all_fields(toml: &str, comments: &HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# orderlens configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: HashSet<String> = HashSet::new();

        for line in toml.lines() {
            if let Some(section) = Self::extract_section_name(line) {
                if let Some(header) = SECTION_HEADERS.iter().find(|(s, _)| *s == section) {
                    result.push_str(header.1);
                    result.push('\n');
                }
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                current_section = section;
                Self::push_missing_option_fields(
                    &mut result,
                    &current_section,
                    comments,
                    &mut seen_fields,
                    toml,
                );
                continue;
            }

            if let Some(field_path) = Self::extract_field_path(line, &current_section) {
                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen_fields.insert(field_path);
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        result
    }

    fn push_missing_option_fields(
        result: &mut String,
        section: &str,
        comments: &HashMap<String, String>,
        seen_fields: &mut HashSet<String>,
        toml: &str,
    ) {
        for field_path in OPTION_FIELDS {
            let Some((field_section, field_name)) = field_path.rsplit_once('.') else {
                continue;
            };
            if field_section != section || seen_fields.contains(*field_path) {
                continue;
            }
            // Present in the serialized document; handled by the field pass
            if toml
                .lines()
                .any(|l| Self::extract_field_path(l, section).as_deref() == Some(*field_path))
            {
                continue;
            }
            if let Some(comment) = comments.get(*field_path) {
                for comment_line in comment.lines() {
                    result.push_str("# ");
                    result.push_str(comment_line);
                    result.push('\n');
                }
            }
            result.push_str(&format!("# {} = null\n", field_name));
            seen_fields.insert(field_path.to_string());
        }
    }

    /// Extract section name from TOML line like "[display]" or "[theme.colors]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    fn extract_field_path(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }

        let eq_pos = trimmed.find('=')?;
        let field_name = trimmed[..eq_pos].trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;

        let template = self.generate_default_config()?;
        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub display: DisplayConfig,
    pub chart: ChartConfig,
    pub performance: PerformanceConfig,
    pub theme: ThemeConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub compression: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Rows shown in the overview while full data is off
    pub sample_rows: usize,
    pub show_full_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub histogram_bins: usize,
    pub export_width: u32,
    pub export_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub event_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub primary: String,
    pub secondary: String,
    pub error: String,
    pub dimmed: String,
    pub controls_bg: String,
    pub text_primary: String,
    pub text_secondary: String,
    pub table_header: String,
    pub table_border: String,
    pub modal_border: String,
    pub modal_border_error: String,
    pub status_bar: String,
    pub histogram_bar: String,
    pub delivery_box: String,
    pub estimate_box: String,
    pub trend_line: String,
    pub outlier_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            display: DisplayConfig::default(),
            chart: ChartConfig::default(),
            performance: PerformanceConfig::default(),
            theme: ThemeConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            sample_rows: 5,
            show_full_data: false,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 30,
            export_width: 1024,
            export_height: 768,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            event_poll_interval_ms: 25,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            primary: "cyan".to_string(),
            secondary: "yellow".to_string(),
            error: "red".to_string(),
            dimmed: "dark_gray".to_string(),
            controls_bg: "indexed(236)".to_string(),
            text_primary: "white".to_string(),
            text_secondary: "dark_gray".to_string(),
            table_header: "white".to_string(),
            table_border: "cyan".to_string(),
            modal_border: "cyan".to_string(),
            modal_border_error: "red".to_string(),
            status_bar: "cyan".to_string(),
            histogram_bar: "green".to_string(),
            delivery_box: "blue".to_string(),
            estimate_box: "magenta".to_string(),
            trend_line: "yellow".to_string(),
            outlier_marker: "red".to_string(),
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let config_manager = ConfigManager::new(app_name)?;
        Self::load_from(&config_manager)
    }

    /// Load configuration using a specific config directory
    pub fn load_from(config_manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(Self::load_user_config(config_manager)?);
        config.validate()?;
        Ok(config)
    }

    /// Load user configuration from <config_dir>/config.toml
    fn load_user_config(config_manager: &ConfigManager) -> Result<AppConfig> {
        let config_path = config_manager.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.display.merge(other.display);
        self.chart.merge(other.chart);
        self.performance.merge(other.performance);
        self.theme.colors.merge(other.theme.colors);
        self.debug.merge(other.debug);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.performance.event_poll_interval_ms == 0 {
            return Err(eyre!("event_poll_interval_ms must be greater than 0"));
        }

        if self.display.sample_rows == 0 {
            return Err(eyre!("sample_rows must be greater than 0"));
        }

        if self.chart.histogram_bins == 0 {
            return Err(eyre!("histogram_bins must be greater than 0"));
        }

        if self.chart.export_width == 0 || self.chart.export_height == 0 {
            return Err(eyre!("export_width and export_height must be greater than 0"));
        }

        if let Some(name) = &self.file_loading.compression {
            if CompressionFormat::from_name(name).is_none() {
                return Err(eyre!(
                    "Invalid compression: {}. Must be 'gzip', 'zstd', 'bzip2', or 'xz'",
                    name
                ));
            }
        }

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
        if other.compression.is_some() {
            self.compression = other.compression;
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.sample_rows != default.sample_rows {
            self.sample_rows = other.sample_rows;
        }
        if other.show_full_data != default.show_full_data {
            self.show_full_data = other.show_full_data;
        }
    }
}

impl ChartConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ChartConfig::default();
        if other.histogram_bins != default.histogram_bins {
            self.histogram_bins = other.histogram_bins;
        }
        if other.export_width != default.export_width {
            self.export_width = other.export_width;
        }
        if other.export_height != default.export_height {
            self.export_height = other.export_height;
        }
    }
}

impl PerformanceConfig {
    pub fn merge(&mut self, other: Self) {
        let default = PerformanceConfig::default();
        if other.event_poll_interval_ms != default.event_poll_interval_ms {
            self.event_poll_interval_ms = other.event_poll_interval_ms;
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled {
            self.enabled = true;
        }
    }
}

impl ColorConfig {
    /// Name/value pairs for every color slot
    fn entries(&self) -> [(&'static str, &String); 17] {
        [
            ("primary", &self.primary),
            ("secondary", &self.secondary),
            ("error", &self.error),
            ("dimmed", &self.dimmed),
            ("controls_bg", &self.controls_bg),
            ("text_primary", &self.text_primary),
            ("text_secondary", &self.text_secondary),
            ("table_header", &self.table_header),
            ("table_border", &self.table_border),
            ("modal_border", &self.modal_border),
            ("modal_border_error", &self.modal_border_error),
            ("status_bar", &self.status_bar),
            ("histogram_bar", &self.histogram_bar),
            ("delivery_box", &self.delivery_box),
            ("estimate_box", &self.estimate_box),
            ("trend_line", &self.trend_line),
            ("outlier_marker", &self.outlier_marker),
        ]
    }

    fn entries_mut(&mut self) -> [(&'static str, &mut String); 17] {
        [
            ("primary", &mut self.primary),
            ("secondary", &mut self.secondary),
            ("error", &mut self.error),
            ("dimmed", &mut self.dimmed),
            ("controls_bg", &mut self.controls_bg),
            ("text_primary", &mut self.text_primary),
            ("text_secondary", &mut self.text_secondary),
            ("table_header", &mut self.table_header),
            ("table_border", &mut self.table_border),
            ("modal_border", &mut self.modal_border),
            ("modal_border_error", &mut self.modal_border_error),
            ("status_bar", &mut self.status_bar),
            ("histogram_bar", &mut self.histogram_bar),
            ("delivery_box", &mut self.delivery_box),
            ("estimate_box", &mut self.estimate_box),
            ("trend_line", &mut self.trend_line),
            ("outlier_marker", &mut self.outlier_marker),
        ]
    }

    /// Validate all color strings can be parsed
    fn validate(&self, parser: &ColorParser) -> Result<()> {
        for (name, value) in self.entries() {
            parser
                .parse(value)
                .map_err(|e| eyre!("Invalid color value for '{}': {}", name, e))?;
        }
        Ok(())
    }

    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();
        let defaults = default.entries();
        let others = other.entries();
        for (i, (_, slot)) in self.entries_mut().into_iter().enumerate() {
            if others[i].1 != defaults[i].1 {
                *slot = others[i].1.clone();
            }
        }
    }
}

/// Color parser with terminal capability detection
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    /// Create a new ColorParser with automatic terminal capability detection
    pub fn new() -> Self {
        let no_color = std::env::var("NO_COLOR").is_ok();
        let support = supports_color::on(Stream::Stdout);

        Self {
            supports_true_color: support.as_ref().map(|s| s.has_16m).unwrap_or(false),
            supports_256: support.as_ref().map(|s| s.has_256).unwrap_or(false),
            no_color,
        }
    }

    /// Parse a color string (hex, indexed or named) into a terminal color
    pub fn parse(&self, s: &str) -> Result<Color> {
        if self.no_color {
            return Ok(Color::Reset);
        }

        let trimmed = s.trim();

        if trimmed.starts_with('#') && trimmed.len() == 7 {
            let (r, g, b) = parse_hex(trimmed)?;
            return Ok(self.convert_rgb_to_terminal_color(r, g, b));
        }

        if trimmed.to_lowercase().starts_with("indexed(") && trimmed.ends_with(')') {
            let num_str = &trimmed[8..trimmed.len() - 1];
            let num = num_str.parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            return Ok(Color::Indexed(num));
        }

        match trimmed.to_lowercase().as_str() {
            "black" => Ok(Color::Black),
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "cyan" => Ok(Color::Cyan),
            "white" => Ok(Color::White),

            "bright_black" | "bright black" => Ok(Color::Indexed(8)),
            "bright_red" | "bright red" => Ok(Color::Indexed(9)),
            "bright_green" | "bright green" => Ok(Color::Indexed(10)),
            "bright_yellow" | "bright yellow" => Ok(Color::Indexed(11)),
            "bright_blue" | "bright blue" => Ok(Color::Indexed(12)),
            "bright_magenta" | "bright magenta" => Ok(Color::Indexed(13)),
            "bright_cyan" | "bright cyan" => Ok(Color::Indexed(14)),
            "bright_white" | "bright white" => Ok(Color::Indexed(15)),

            "gray" | "grey" => Ok(Color::Indexed(8)),
            "dark_gray" | "dark gray" | "dark_grey" | "dark grey" => Ok(Color::Indexed(8)),
            "light_gray" | "light gray" | "light_grey" | "light grey" => Ok(Color::Indexed(7)),

            "reset" | "reversed" => Ok(Color::Reset),

            _ => Err(eyre!(
                "Unknown color name: '{}'. Supported: basic ANSI colors (red, blue, etc.), \
                 bright variants (bright_red, etc.), or hex colors (#ff0000)",
                trimmed
            )),
        }
    }

    fn convert_rgb_to_terminal_color(&self, r: u8, g: u8, b: u8) -> Color {
        if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            rgb_to_basic_ansi(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse hex color string (#ff0000) to RGB components
fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    if !s.starts_with('#') || s.len() != 7 {
        return Err(eyre!(
            "Invalid hex color format: '{}'. Expected format: #rrggbb",
            s
        ));
    }

    let component = |range: std::ops::Range<usize>, name: &str| {
        u8::from_str_radix(&s[range], 16)
            .map_err(|_| eyre!("Invalid {} component in hex color: {}", name, s))
    };

    Ok((
        component(1..3, "red")?,
        component(3..5, "green")?,
        component(5..7, "blue")?,
    ))
}

/// Convert RGB to nearest 256-color palette index (xterm palette)
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 10 {
        // grayscale ramp 232-255
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        if gray < 8 {
            return 16;
        } else if gray > 247 {
            return 231;
        } else {
            return 232 + ((gray - 8) * 24 / 240) as u8;
        }
    }

    // 6x6x6 color cube (16-231)
    let r_idx = (r as u16 * 5 / 255) as u8;
    let g_idx = (g as u16 * 5 / 255) as u8;
    let b_idx = (b as u16 * 5 / 255) as u8;

    16 + 36 * r_idx + 6 * g_idx + b_idx
}

/// Convert RGB to nearest basic ANSI color (8 colors)
pub fn rgb_to_basic_ansi(r: u8, g: u8, b: u8) -> Color {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 30 {
        let avg = (r as u16 + g as u16 + b as u16) / 3;
        return if avg < 64 { Color::Black } else { Color::White };
    }

    match (r > 128, g > 128, b > 128) {
        (false, false, false) => Color::Black,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (true, true, false) => Color::Yellow,
        (false, false, true) => Color::Blue,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => Color::White,
    }
}

/// Theme containing parsed colors ready for use
#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
}

impl Theme {
    /// Create a Theme from a ThemeConfig by parsing all color strings
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let parser = ColorParser::new();
        let mut colors = HashMap::new();
        for (name, value) in config.colors.entries() {
            colors.insert(name.to_string(), parser.parse(value)?);
        }
        Ok(Self { colors })
    }

    /// Get a color by name, returns Reset if not found
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }

    /// Get a color by name, returns None if not found
    pub fn get_optional(&self, name: &str) -> Option<Color> {
        self.colors.get(name).copied()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_config(&ThemeConfig::default()).unwrap_or_else(|_| Self {
            colors: HashMap::new(),
        })
    }
}

const OPTION_FIELDS: &[&str] = &[
    "file_loading.delimiter",
    "file_loading.has_header",
    "file_loading.compression",
];

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "file_loading",
        "# ============================================================================\n# File Loading Defaults\n# ============================================================================",
    ),
    (
        "display",
        "# ============================================================================\n# Display Settings\n# ============================================================================",
    ),
    (
        "chart",
        "# ============================================================================\n# Charts\n# ============================================================================",
    ),
    (
        "performance",
        "# ============================================================================\n# Performance Settings\n# ============================================================================",
    ),
    (
        "theme",
        "# ============================================================================\n# Color Theme\n# ============================================================================",
    ),
    (
        "theme.colors",
        "# Color definitions\n# Supported formats:\n#   - Named colors: \"red\", \"blue\", \"bright_red\", \"dark_gray\", etc. (case-insensitive)\n#   - Hex colors: \"#ff0000\" or \"#FF0000\" (case-insensitive)\n#   - Indexed colors: \"indexed(0-255)\" for specific xterm 256-color palette entries\n# Colors automatically adapt to your terminal's capabilities",
    ),
    (
        "debug",
        "# ============================================================================\n# Debug Settings\n# ============================================================================",
    ),
];

const FILE_LOADING_COMMENTS: &[(&str, &str)] = &[
    (
        "delimiter",
        "Default delimiter for CSV files (as ASCII value, e.g., 44 for comma)\nIf not specified, comma is used",
    ),
    (
        "has_header",
        "Whether files have headers by default\nnull = auto-detect, true = has header, false = no header",
    ),
    (
        "compression",
        "Compression of input files when the extension does not say\nOne of \"gzip\", \"zstd\", \"bzip2\", \"xz\"",
    ),
];

const DISPLAY_COMMENTS: &[(&str, &str)] = &[
    (
        "sample_rows",
        "Number of rows shown in the data overview while full data is off",
    ),
    (
        "show_full_data",
        "Start with the full data overview (toggle with 'f')",
    ),
];

const CHART_COMMENTS: &[(&str, &str)] = &[
    (
        "histogram_bins",
        "Number of equal-width bins in the approval time histogram",
    ),
    ("export_width", "Width in pixels of exported PNG charts"),
    ("export_height", "Height in pixels of exported PNG charts"),
];

const PERFORMANCE_COMMENTS: &[(&str, &str)] = &[(
    "event_poll_interval_ms",
    "Event polling interval in milliseconds\nLower values = more responsive, higher CPU usage",
)];

const COLOR_COMMENTS: &[(&str, &str)] = &[
    ("primary", "Main accent color (titles, highlights)"),
    ("secondary", "Secondary accent color (key hints)"),
    ("error", "Error messages"),
    ("dimmed", "Dimmed text and inactive elements"),
    ("controls_bg", "Background of the controls bar"),
    ("text_primary", "Primary text color"),
    ("text_secondary", "Secondary text color (axis labels, notes)"),
    ("table_header", "Data overview header text"),
    ("table_border", "Data overview and panel borders"),
    ("modal_border", "Border of the open-file prompt"),
    ("modal_border_error", "Border of the error modal"),
    ("status_bar", "Bars of the order status chart"),
    ("histogram_bar", "Bars of the approval time histogram"),
    ("delivery_box", "Delivery duration box"),
    ("estimate_box", "Estimate vs actual box"),
    ("trend_line", "Monthly order volume line"),
    ("outlier_marker", "Boxplot outlier points"),
];

const DEBUG_COMMENTS: &[(&str, &str)] = &[(
    "enabled",
    "Show the debug line (event counts, last key, cache hits)",
)];
