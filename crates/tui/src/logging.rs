use std::{fs, path::Path, sync::Mutex};

use dashboard::Settings;
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, Result};

/// Logs go to a file: the terminal belongs to the UI. `RUST_LOG` wins over
/// the configured level.
pub fn init(settings: &Settings) -> Result<()> {
    let path = Path::new(&settings.log_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "crmdesk_tui={level},dashboard={level}",
            level = settings.log_level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| AppError::Logging(err.to_string()))
}
