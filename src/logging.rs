use color_eyre::Result;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

lazy_static::lazy_static! {
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

/// Initialize logging with default settings (WARN level, `cohortui.log` in the cwd)
pub fn init() -> Result<()> {
    init_with(None, None)
}

/// Initialize logging with custom path and/or level
///
/// An explicit level overrides `RUST_LOG`; without one `RUST_LOG` is used
/// with WARN as the fallback.
pub fn init_with(custom_log_path: Option<PathBuf>, level: Option<Level>) -> Result<()> {
    let log_path = match custom_log_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            path
        }
        None => std::env::current_dir()?.join(LOG_FILE.as_str()),
    };

    let env_filter = match level {
        Some(lvl) => EnvFilter::builder()
            .with_default_directive(lvl.into())
            .parse_lossy(""),
        None => EnvFilter::builder()
            .with_default_directive(Level::WARN.into())
            .from_env_lossy(),
    };

    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
    let file_subscriber = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(Mutex::new(file))
        .with_target(false)
        .with_ansi(false)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(())
}
