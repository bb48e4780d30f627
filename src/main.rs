use clap::Parser;
use color_eyre::Result;
use orderlens::{
    chart_export, load_dashboard, App, AppConfig, AppEvent, Args, CacheManager, ConfigManager,
    OpenOptions, Theme, APP_NAME,
};
use ratatui::DefaultTerminal;
use std::fs::File;
use std::sync::mpsc::channel;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter (e.g. `orderlens=debug`)
const LOG_ENV: &str = "ORDERLENS_LOG";

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

/// Log to `--log-file`, or to the cache directory with `--debug`. Headless modes
/// fall back to stderr; the dashboard never logs to the terminal it draws on.
fn init_logging(args: &Args, headless: bool) -> Result<()> {
    let level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let log_path = match (&args.log_file, args.debug) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(CacheManager::new(APP_NAME)?.log_path()?),
        (None, false) => None,
    };

    if let Some(path) = log_path {
        let file = File::create(&path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .init();
    } else if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
    Ok(())
}

fn run(mut terminal: DefaultTerminal, args: &Args, config: AppConfig, theme: Theme) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    let poll_interval = std::time::Duration::from_millis(config.performance.event_poll_interval_ms);
    let opts = OpenOptions::from_args_and_config(args, &config);
    let mut app = App::new_with_config(tx.clone(), theme, config);
    if args.debug {
        app.enable_debug();
    }
    render(&mut terminal, &mut app)?;
    if let Some(path) = &args.path {
        tx.send(AppEvent::Open(path.clone(), opts))?;
    }

    loop {
        if crossterm::event::poll(poll_interval)? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(std::time::Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(APP_NAME) {
            Ok(config_manager) => match config_manager.write_default_config(args.force) {
                Ok(path) => {
                    println!("Configuration written to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error generating config: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

/// Apply command-line display overrides on top of the loaded config and re-validate
fn apply_args(config: &mut AppConfig, args: &Args) -> Result<()> {
    if let Some(sample_rows) = args.sample_rows {
        config.display.sample_rows = sample_rows;
    }
    if args.full_data {
        config.display.show_full_data = true;
    }
    if args.debug {
        config.debug.enabled = true;
    }
    config.validate()
}

/// `--report` and `--export-dir`: load once, write the result, exit.
fn run_headless(args: &Args, config: &AppConfig) -> Result<()> {
    let Some(path) = &args.path else {
        return Ok(());
    };
    let opts = OpenOptions::from_args_and_config(args, config);
    let dashboard = load_dashboard(path, &opts, config)?;

    if let Some(dir) = &args.export_dir {
        let size = (config.chart.export_width, config.chart.export_height);
        for written in chart_export::export_dashboard(&dashboard, dir, size)? {
            println!("{}", written.display());
        }
    }
    if args.report {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;

    let headless = args.report || args.export_dir.is_some();
    init_logging(&args, headless)?;

    let mut config = AppConfig::load(APP_NAME)?;
    apply_args(&mut config, &args)?;
    let theme = Theme::from_config(&config.theme)?;

    if headless {
        if let Err(e) = run_headless(&args, &config) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    let terminal = ratatui::init();
    let result = run(terminal, &args, config, theme);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_args_to_open_options() {
        let args = Args {
            path: Some(PathBuf::from("orders.csv")),
            no_header: Some(true),
            delimiter: Some(b';'),
            ..Args::default()
        };
        let opts: OpenOptions = (&args).into();
        assert_eq!(opts.has_header, Some(false));
        assert_eq!(opts.delimiter, Some(b';'));
        assert_eq!(opts.compression, None);
    }

    #[test]
    fn test_apply_args_overrides_display() {
        let mut config = AppConfig::default();
        let args = Args {
            sample_rows: Some(12),
            full_data: true,
            ..Args::default()
        };
        apply_args(&mut config, &args).unwrap();
        assert_eq!(config.display.sample_rows, 12);
        assert!(config.display.show_full_data);
        assert!(!config.debug.enabled);
    }

    #[test]
    fn test_apply_args_rejects_zero_sample_rows() {
        let mut config = AppConfig::default();
        let args = Args {
            sample_rows: Some(0),
            ..Args::default()
        };
        assert!(apply_args(&mut config, &args).is_err());
    }
}
