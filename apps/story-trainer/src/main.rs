//! Story Trainer - Read English storybooks, drill their vocabulary, and keep a study streak.

mod app;
mod cards;
mod config;
mod gemini;
mod import;
mod logging;
mod models;
mod practice;
mod reader;
mod review;
mod stats;
mod store;
mod translate;
mod ui;
mod vocab;

use app::App;
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load();
    let _log_guard = logging::init_tracing(&config.data_dir(), &config.logging);
    info!(data_dir = %config.data_dir().display(), "starting story trainer");
    if let Some(path) = Config::config_path() {
        match config.write_if_missing(&path) {
            Ok(true) => info!(path = %path.display(), "wrote default config"),
            Ok(false) => {}
            Err(err) => warn!(path = %path.display(), error = %err, "could not write default config"),
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!(error = %err, "story trainer exited with an error");
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    config: Config,
) -> anyhow::Result<()> {
    let mut app = App::new(config)?;

    loop {
        terminal.draw(|f| ui::draw(f, &mut app))?;

        // The frame above shows the working indicator; run the task before
        // reading more input.
        if app.pending.is_some() {
            app.run_pending();
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }
            if key.code == KeyCode::Char('q') && key.modifiers.is_empty() && !app.is_editing() {
                break;
            }
            app.handle_key(key);
        }
    }

    info!("story trainer closed");
    Ok(())
}
