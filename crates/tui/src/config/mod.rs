use clap::Parser;
use dashboard::Settings;

use crate::error::Result;

#[derive(Debug, Parser)]
#[command(name = "crmdesk_tui", about = "Terminal dashboard for the CRM admin backend")]
pub struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override backend base URL (e.g. http://localhost:3001).
    #[arg(long)]
    base_url: Option<String>,
    /// Override where the login session is stored.
    #[arg(long)]
    session_path: Option<String>,
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
    /// Override the log file path.
    #[arg(long)]
    log_path: Option<String>,
}

impl Args {
    /// Loads settings and applies the command line overrides on top.
    pub fn into_settings(self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;

        if let Some(base_url) = self.base_url {
            settings.base_url = base_url;
        }
        if let Some(session_path) = self.session_path {
            settings.session_path = session_path;
        }
        if let Some(log_level) = self.log_level {
            settings.log_level = log_level;
        }
        if let Some(log_path) = self.log_path {
            settings.log_path = log_path;
        }

        Ok(settings)
    }
}

pub fn load() -> Result<Settings> {
    Args::parse().into_settings()
}
