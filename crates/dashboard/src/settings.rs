//! Deployment settings shared by the terminal dashboard and the admin CLI.
//!
//! Values come from an optional TOML file and `CRMDESK_*` environment
//! variables (nested keys use `__`, e.g. `CRMDESK_AUTH__MODE=jwt`). The
//! binaries apply their command line overrides on top.

use serde::Deserialize;
use thiserror::Error;

use crate::{auth::AuthMode, session::DEFAULT_SESSION_PATH};

pub const DEFAULT_CONFIG_PATH: &str = "config/crmdesk.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("auth mode \"federated\" requires auth.endpoint")]
    MissingEndpoint,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthBackend {
    Federated,
    Jwt,
    #[default]
    Api,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub mode: AuthBackend,
    /// Identity provider endpoint, federated mode only.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl AuthSettings {
    pub fn to_mode(&self) -> Result<AuthMode, SettingsError> {
        match self.mode {
            AuthBackend::Federated => {
                let endpoint = self
                    .endpoint
                    .clone()
                    .filter(|endpoint| !endpoint.trim().is_empty())
                    .ok_or(SettingsError::MissingEndpoint)?;
                Ok(AuthMode::Federated {
                    endpoint,
                    api_key: self.api_key.clone(),
                })
            }
            AuthBackend::Jwt => Ok(AuthMode::Jwt),
            AuthBackend::Api => Ok(AuthMode::Api),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub auth: AuthSettings,
    pub session_path: String,
    pub log_level: String,
    pub log_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            auth: AuthSettings::default(),
            session_path: DEFAULT_SESSION_PATH.to_string(),
            log_level: "info".to_string(),
            log_path: "config/crmdesk_tui.log".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path` (or the default path) and the environment.
    /// A missing file is not an error.
    pub fn load(path: Option<&str>) -> Result<Self, SettingsError> {
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("CRMDESK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn auth_mode(&self) -> Result<AuthMode, SettingsError> {
        self.auth.to_mode()
    }
}
