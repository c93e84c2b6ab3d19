//! Configuration loader and validator for the Algolia content sync service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub algolia: Algolia,
    pub sync: Sync,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Algolia credentials and request host.
///
/// Empty `application_id`/`api_key` mean "unconfigured": sync operations
/// no-op (event paths) or return a configuration error (admin paths) rather
/// than failing validation, so a fresh install parses cleanly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Algolia {
    pub application_id: String,
    pub api_key: String,
    #[serde(default = "default_host")]
    pub host: String,
}

/// Which content types participate in sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sync {
    pub enabled_types: Vec<String>,
}

fn default_host() -> String {
    "algolia.net".to_string()
}

impl Config {
    /// Both credentials present (after trimming).
    pub fn is_configured(&self) -> bool {
        !self.algolia.application_id.trim().is_empty() && !self.algolia.api_key.trim().is_empty()
    }

    /// Whether a content type is enabled for sync.
    pub fn type_enabled(&self, doc_type: &str) -> bool {
        self.sync.enabled_types.iter().any(|t| t == doc_type)
    }

    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
///
/// Credentials are deliberately not required here; see [`Algolia`].
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.algolia.host.trim().is_empty() {
        return Err(ConfigError::Invalid("algolia.host must be non-empty"));
    }
    if cfg.sync.enabled_types.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::Invalid(
            "sync.enabled_types entries must be non-empty",
        ));
    }
    Ok(())
}

/// Example YAML configuration, used by docs and tests.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

algolia:
  application_id: "YOUR_ALGOLIA_APP_ID"
  api_key: "YOUR_ALGOLIA_ADMIN_API_KEY"
  host: "algolia.net"

sync:
  enabled_types:
    - post
    - page
"#
}
