//! Command-line arguments for the `subqueue` pump
//!
//! Every option is optional so that unset arguments leave configuration file
//! values untouched.

use crate::core::config::{ConsumeMode, PumpConfig};
use crate::core::logging::LogFormat;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::str::FromStr;

/// Version line with build metadata for `--version`
pub fn long_version() -> String {
    format!(
        "{} (built {}, commit {})",
        crate::PACKAGE_VERSION,
        crate::BUILD_TIME,
        crate::GIT_HASH
    )
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "subqueue")]
#[command(about = "Pump messages through per-subscription delivery queues")]
#[command(version, long_version = long_version())]
#[command(after_help = " * can be specified multiple times or as a comma-separated list")]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Literal channels to subscribe to*
    #[arg(long = "channel", value_name = "NAMES", value_delimiter = ',', action = ArgAction::Append)]
    pub channels: Vec<String>,

    /// Glob patterns to subscribe to*
    #[arg(long = "pattern", value_name = "PATTERNS", value_delimiter = ',', action = ArgAction::Append)]
    pub patterns: Vec<String>,

    /// Messages published on each channel
    #[arg(short = 'n', long = "messages", value_name = "COUNT")]
    pub messages: Option<usize>,

    /// How each queue is consumed
    #[arg(short = 'm', long = "mode", value_enum)]
    pub mode: Option<ConsumeMode>,

    /// Make the handler fail on every Nth message
    #[arg(long = "fail-every", value_name = "N")]
    pub fail_every: Option<usize>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Force colored output
    #[arg(long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", conflicts_with = "color")]
    pub no_color: bool,
}

impl Args {
    /// Overlay the arguments that were given onto `config`
    pub fn apply_to(&self, config: &mut PumpConfig) {
        if !self.channels.is_empty() {
            config.channels = self.channels.clone();
        }
        if !self.patterns.is_empty() {
            config.patterns = self.patterns.clone();
        }
        if let Some(messages) = self.messages {
            config.messages = messages;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.fail_every.is_some() {
            config.fail_every = self.fail_every;
        }
        if self.log_level.is_some() {
            config.log_level = self.log_level.clone();
        }
        if let Some(format) = self.log_format.as_deref() {
            // Restricted by value_parser
            if let Ok(format) = LogFormat::from_str(format) {
                config.log_format = format;
            }
        }
        if self.log_file.is_some() {
            config.log_file = self.log_file.clone();
        }
        if self.color {
            config.color = Some(true);
        } else if self.no_color {
            config.color = Some(false);
        }
    }
}
