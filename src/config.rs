//! Configuration file support.
//!
//! Settings come from an optional TOML file (`aura-hud.toml` in the working
//! directory unless `--config` names another) and are then overridden by
//! command-line flags. Every field has a default so an empty file is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::window::SizeBounds;

pub const DEFAULT_CONFIG_FILE: &str = "aura-hud.toml";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at '{}'", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Location passed to `/hud-data` when fetching.
    pub location: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: 10,
            location: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Window size bounds in terminal cells.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowsConfig {
    pub min_width: u16,
    pub max_width: u16,
    pub min_height: u16,
    pub max_height: u16,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        let bounds = SizeBounds::default();
        Self {
            min_width: bounds.min_width,
            max_width: bounds.max_width,
            min_height: bounds.min_height,
            max_height: bounds.max_height,
        }
    }
}

impl WindowsConfig {
    pub fn bounds(&self) -> SizeBounds {
        SizeBounds {
            min_width: self.min_width,
            max_width: self.max_width,
            min_height: self.min_height,
            max_height: self.max_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Lines kept by the in-app debug log.
    pub max_lines: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            max_lines: crate::debug_log::DEFAULT_MAX_LINES,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.level
            .parse::<LevelFilter>()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.level)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HudConfig {
    pub backend: BackendConfig,
    pub windows: WindowsConfig,
    pub logging: LoggingConfig,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub location: Option<String>,
    pub log_level: Option<String>,
}

impl HudConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] when it exists.
    /// An explicit path that does not exist is an error; a missing default
    /// file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !path.exists() {
            if explicit {
                return Err(ConfigError::NotFound { path });
            }
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.windows;
        if w.min_width > w.max_width {
            return Err(ConfigError::Invalid(format!(
                "windows.min_width ({}) exceeds windows.max_width ({})",
                w.min_width, w.max_width
            )));
        }
        if w.min_height > w.max_height {
            return Err(ConfigError::Invalid(format!(
                "windows.min_height ({}) exceeds windows.max_height ({})",
                w.min_height, w.max_height
            )));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "backend.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.url is empty".to_string()));
        }
        self.logging.level_filter()?;
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(url) = overrides.backend_url {
            self.backend.url = url;
        }
        if let Some(location) = overrides.location {
            self.backend.location = Some(location);
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        self.validate()
    }
}
