//! TOML configuration for the message pump
//!
//! An explicitly named file must exist. Without one, the default file in the
//! user's configuration directory is read when present, and built-in
//! defaults apply otherwise. Command-line arguments are applied on top by the
//! caller.

use crate::core::error_handling::ContextualError;
use crate::core::logging::LogFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "subqueue";
const CONFIG_FILE_NAME: &str = "subqueue.toml";
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// How the pump consumes each queue
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConsumeMode {
    /// Read messages directly from the queue
    Pull,
    /// Background loop with a synchronous handler
    #[default]
    Sync,
    /// Background loop with an asynchronous handler
    Async,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Error reading configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing configuration file: {message}")]
    Parse { message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, ConfigError::Read { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::NotFound { .. } => Some("The specified configuration file does not exist"),
            ConfigError::Parse { message } | ConfigError::Invalid { message } => Some(message),
            ConfigError::Read { .. } => None,
        }
    }
}

/// Settings for one pump run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PumpConfig {
    /// Literal channels to subscribe to and publish on
    pub channels: Vec<String>,
    /// Glob patterns to subscribe to
    pub patterns: Vec<String>,
    /// Messages published on each channel
    pub messages: usize,
    pub mode: ConsumeMode,
    /// Make the handler fail on every Nth message
    pub fail_every: Option<usize>,
    pub log_level: Option<String>,
    pub log_format: LogFormat,
    pub log_file: Option<PathBuf>,
    pub color: Option<bool>,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            channels: vec!["news".to_string()],
            patterns: Vec::new(),
            messages: 5,
            mode: ConsumeMode::default(),
            fail_every: None,
            log_level: None,
            log_format: LogFormat::default(),
            log_file: None,
            color: None,
        }
    }
}

/// `<config dir>/subqueue/subqueue.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl PumpConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: PumpConfig = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loading configuration from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Resolve the configuration for a run
    ///
    /// Returns the configuration and the file it came from, if any.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match explicit {
            Some(path) => Ok((Self::load(path)?, Some(path.to_path_buf()))),
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    let config = Self::load(&path)?;
                    Ok((config, Some(path)))
                }
                _ => Ok((Self::default(), None)),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() && self.patterns.is_empty() {
            return Err(ConfigError::Invalid {
                message: "at least one channel or pattern is required".to_string(),
            });
        }
        if let Some(name) = self
            .channels
            .iter()
            .chain(&self.patterns)
            .find(|name| name.is_empty())
        {
            return Err(ConfigError::Invalid {
                message: format!("channel names must not be empty (got {:?})", name),
            });
        }
        if self.fail_every == Some(0) {
            return Err(ConfigError::Invalid {
                message: "fail_every must be at least 1".to_string(),
            });
        }
        if let Some(level) = &self.log_level {
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "unknown log level '{}' (expected one of {})",
                        level,
                        LOG_LEVELS.join(", ")
                    ),
                });
            }
        }
        Ok(())
    }
}
