//! ChartDrill TUI: random candlestick segments for chart-pattern practice.
//!
//! Layout:
//! 1. Chart: candles of the current segment with annotations and cursor
//! 2. Controls: symbol, lookback window, bar count, tool, cursor readout
//! 3. Status bar: key hints and the latest message

mod annotation;
mod app;
mod input;
mod theme;
mod ui;
mod worker;

use std::fs::{self, OpenOptions};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::{mpsc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chartdrill_core::config::ChartDrillConfig;

use crate::app::AppState;
use crate::worker::WorkerCommand;

fn main() -> Result<()> {
    let config_path = std::env::var_os("CHARTDRILL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(ChartDrillConfig::default_path);
    let config = ChartDrillConfig::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let log_path = init_logging()?;
    info!(config = %config_path.display(), log = %log_path.display(), "chartdrill tui starting");

    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    // Worker channels
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let worker_handle = worker::spawn_worker(config.clone(), cmd_rx, resp_tx)
        .context("spawning worker thread")?;

    let mut app = AppState::new(config, cmd_tx.clone(), resp_rx);
    app.request_choices();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    // Shutdown worker. A fetch in progress finishes first.
    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker_handle.join();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Log to `{data_dir}/chartdrill/chartdrill.log`; the terminal belongs to the UI.
fn init_logging() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chartdrill");
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join("chartdrill.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .init();
    Ok(path)
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        // 1. Render
        terminal.draw(|f| ui::draw(f, app))?;

        // 2. Drain worker responses (non-blocking)
        while let Ok(resp) = app.worker_rx.try_recv() {
            app.handle_worker_response(resp);
        }

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        // 4. Check quit
        if !app.running {
            break;
        }
    }
    Ok(())
}
