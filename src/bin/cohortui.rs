use clap::{Parser, ValueEnum};
use cohortui::config::Config;
use cohortui::core::Cohort;
use cohortui::services::CohortStore;
use cohortui::tui::App;
use color_eyre::Result;
use crossterm::event::{self, Event as CEvent};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// Terminal editor for the inclusion and exclusion filters of a cohort definition
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
    /// Cohort JSON file to edit. Created on first save if it does not exist.
    #[arg(value_name = "COHORT")]
    cohort: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let log_path = std::env::current_dir()?.join("cohortui.log");
    cohortui::logging::init_with(Some(log_path), args.logging.map(Into::into))?;

    let config = match Config::from_path(args.config.as_ref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Falling back to built-in config: {e}");
            Config::embedded()?
        }
    };

    let store = open_store(args.cohort)?;
    let mut app = App::new(store, &config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    if let Err(e) = &res {
        error!("Error: {e}");
    }
    res.map_err(|e| color_eyre::eyre::eyre!("{e:#}"))
}

fn open_store(path: Option<PathBuf>) -> Result<CohortStore> {
    let Some(path) = path else {
        info!("No cohort file given, starting with an empty cohort");
        return Ok(CohortStore::new(Cohort::new(
            uuid::Uuid::new_v4().to_string(),
            "Untitled cohort",
        )));
    };
    if path.exists() {
        return Ok(CohortStore::open(&path)?);
    }
    info!("{} does not exist yet; it will be created on save", path.display());
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Untitled cohort".to_string());
    let store = CohortStore::new(Cohort::new(uuid::Uuid::new_v4().to_string(), stem));
    store.set_path(path)?;
    Ok(store)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> anyhow::Result<()> {
    while !app.should_quit() {
        terminal.draw(|f| app.render(f))?;
        if event::poll(Duration::from_millis(100))?
            && let CEvent::Key(key_event) = event::read()?
        {
            if let Err(e) = app.handle_key_event(key_event) {
                error!("Error handling key event: {e}");
            }
        }
        if let Err(e) = app.update() {
            error!("Error applying store events: {e}");
        }
    }
    Ok(())
}
