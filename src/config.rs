//! Configuration file parser for `~/.config/wikiscroll/config.toml`.
//!
//! The config file is optional: a missing or empty file yields
//! `Config::default()`.  Unknown keys are ignored by serde, but we log a
//! warning so typos do not go unnoticed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::scroll::TriggerSettings;
use crate::source::categories::ALL;
use crate::source::wikipedia::Endpoints;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be given.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Articles per page.
    pub page_size: usize,

    /// Category shown on startup and by the home key.
    pub initial_category: String,

    /// Per-request timeout for the HTTP client, in seconds.
    pub request_timeout_secs: u64,

    /// `User-Agent` sent to Wikipedia.
    pub user_agent: String,

    /// Where to write logs.  `None` discards them (the TUI owns stdout).
    pub log_file: Option<PathBuf>,

    pub wikipedia: Endpoints,

    pub scroll: TriggerSettings,

    /// Category id → search expression.  Overrides built-ins or adds new
    /// categories.
    pub categories: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: 15,
            initial_category: ALL.to_string(),
            request_timeout_secs: 10,
            user_agent: concat!("wikiscroll/", env!("CARGO_PKG_VERSION"), " (terminal client)")
                .to_string(),
            log_file: None,
            wikipedia: Endpoints::default(),
            scroll: TriggerSettings::default(),
            categories: BTreeMap::new(),
        }
    }
}

impl Config {
    const KNOWN_KEYS: [&'static str; 8] = [
        "page_size",
        "initial_category",
        "request_timeout_secs",
        "user_agent",
        "log_file",
        "wikipedia",
        "scroll",
        "categories",
    ];

    /// Default location: `$HOME/.config/wikiscroll/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("wikiscroll")
                .join("config.toml")
        })
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Zero page size or timeout → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        tracing::info!(page_size = config.page_size, category = %config.initial_category, "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
