//! logview entry point
//!
//! Launches the terminal log viewer.
//!
//! # Usage
//!
//! ```bash
//! # Stream one pod
//! logview --context prod -n web --pod web-0 -c app
//!
//! # Discover the pods behind a selector and pick among them
//! logview --context prod -n web -l app=web --pod-picker
//!
//! # Debug logging to a file (the screen belongs to the UI)
//! RUST_LOG=debug logview --log-file /tmp/logview.log ...
//! ```

use std::fs::File;
use std::io::{self, IsTerminal};
use std::panic;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use logview_core::{default_config_path, load_config_from_path, LogViewer};
use logview_tui::{App, Args};

/// Initialize logging with the specified level
///
/// Logs go to `log_file` when given and are discarded otherwise, so the
/// alternate screen is never written to.
fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "logview={level},logview_tui={level},logview_core={level}"
        ))
    });

    match log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {path:?}"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(config_path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    let viewer = LogViewer::from_config(&config).context("Invalid configuration")?;

    tracing::info!(
        source = %config.source(),
        endpoint = %config.endpoint,
        "configuration loaded"
    );

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        anyhow::bail!("logview requires a terminal (TTY)");
    }

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(viewer, args.props());
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
