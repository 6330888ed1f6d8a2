use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    Terminal,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use upwatch::config::Settings;
use upwatch::data::duration::parse_duration;
use upwatch::data::{aggregate, Ingestor};
use upwatch::source::{DataSource, FileScopedFeed, FileSource, ScopedFeed, StreamSource};
use upwatch::view::StalePolicy;
use upwatch::{events, ui, App};

/// Poll cadence for push streams; payloads are already queued.
const STREAM_POLL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "upwatch")]
#[command(about = "Terminal dashboard for application, service and instance health")]
struct Args {
    /// Path to a status JSON file
    #[arg(short, long, default_value = "status.json", conflicts_with = "connect")]
    file: PathBuf,

    /// Connect to a TCP endpoint for live payloads (host:port)
    #[arg(short, long, conflicts_with = "file")]
    connect: Option<String>,

    /// Directory holding per-application detail files (<app>.json).
    /// Defaults to the directory of --file.
    #[arg(long)]
    detail_dir: Option<PathBuf>,

    /// Application to focus on startup
    #[arg(long)]
    focus: Option<String>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// How often to poll --file (e.g., "5s", "500ms")
    #[arg(long)]
    poll_interval: Option<String>,

    /// Inactivity before alerts may move the selection (e.g., "60s")
    #[arg(long)]
    idle_threshold: Option<String>,

    /// Drop entities missing from the latest payload instead of keeping them
    #[arg(long)]
    prune: bool,

    /// Write logs to this file (discarded otherwise)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Export the aggregated state of --file to JSON and exit
    #[arg(short, long, conflicts_with = "connect")]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = resolve_settings(&args)?;
    init_logging(&settings)?;

    // Handle export mode (non-interactive)
    if let Some(ref export_path) = args.export {
        return export_to_file(&args.file, export_path);
    }

    let detail_dir = args.detail_dir.clone().unwrap_or_else(|| {
        args.file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let feed: Box<dyn ScopedFeed> = Box::new(FileScopedFeed::new(detail_dir));

    // Handle TCP connection mode
    if let Some(ref addr) = args.connect {
        let rt = tokio::runtime::Runtime::new()?;
        let _guard = rt.enter();
        let source = Box::new(StreamSource::connect(addr));
        return run_tui(source, feed, &settings, args.focus.as_deref(), STREAM_POLL);
    }

    // Default: file-based mode
    let source = Box::new(FileSource::new(&args.file));
    run_tui(
        source,
        feed,
        &settings,
        args.focus.as_deref(),
        settings.poll_interval,
    )
}

/// Config file and environment, then command-line overrides.
fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(ref value) = args.poll_interval {
        settings.poll_interval = parse_duration(value).context("Invalid --poll-interval")?;
    }
    if let Some(ref value) = args.idle_threshold {
        settings.idle_threshold = parse_duration(value).context("Invalid --idle-threshold")?;
    }
    if args.prune {
        settings.stale_policy = StalePolicy::Prune;
    }
    if args.log_file.is_some() {
        settings.log_file = args.log_file.clone();
    }
    Ok(settings)
}

/// The terminal is taken over by the UI, so logs go to a file or nowhere.
fn init_logging(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match settings.log_file {
        Some(ref path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
    Ok(())
}

/// Run the TUI with the given data source
fn run_tui(
    source: Box<dyn DataSource>,
    feed: Box<dyn ScopedFeed>,
    settings: &Settings,
    focus: Option<&str>,
    poll_interval: Duration,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    // Create app and load initial data
    let now = Utc::now();
    let mut app = App::new(source, feed, settings.view_settings(), now);
    info!(source = app.source_description(), "starting");
    app.reload_data(now);
    if let Some(app_name) = focus {
        app.navigate(app_name);
    }

    // Run the main loop
    let result = run_app(&mut terminal, &mut app, poll_interval);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    poll_interval: Duration,
) -> Result<()> {
    let mut last_poll = Instant::now();

    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    while app.running {
        // Draw UI
        terminal.draw(|frame| {
            let area = frame.area();

            // Check for minimum terminal size
            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                frame.render_widget(paragraph, message_area(area));
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Min(8),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::overview::render(frame, app, chunks[1]);
            ui::common::render_status_bar(frame, app, chunks[2]);

            if app.controller().is_focused() {
                ui::detail::render_overlay(frame, app, area);
            }
            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            let now = Utc::now();
            match event {
                Event::Key(key) => events::handle_key_event(app, key, now),
                Event::Mouse(mouse) => {
                    // Content starts after header (1) + table border (1) + table header (1)
                    events::handle_mouse_event(app, mouse, 2, now);
                }
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }

        let now = Utc::now();
        if last_poll.elapsed() >= poll_interval {
            app.reload_data(now);
            last_poll = Instant::now();
        }
        app.tick(now);
    }

    Ok(())
}

/// Five centered rows for the "too small" message, clipped to the screen.
fn message_area(area: Rect) -> Rect {
    let height = 5.min(area.height);
    Rect::new(area.x, area.y + (area.height / 2).saturating_sub(2), area.width, height)
}

/// Ingest one payload file and write its aggregated tree as JSON.
fn export_to_file(status_path: &Path, export_path: &Path) -> Result<()> {
    let payload = std::fs::read(status_path)
        .with_context(|| format!("Failed to read {}", status_path.display()))?;
    let snapshot = Ingestor::new()
        .ingest(&payload)
        .with_context(|| format!("Failed to parse {}", status_path.display()))?;
    let tree = aggregate(snapshot);

    let json = serde_json::to_string_pretty(&tree)?;
    std::fs::write(export_path, json)?;

    println!("Exported health state to: {}", export_path.display());
    Ok(())
}
