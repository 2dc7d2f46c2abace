//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/blameline/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/blameline/` (~/.config/blameline/)
//! - State/Logs: `$XDG_STATE_HOME/blameline/` (~/.local/state/blameline/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Annotation behaviour
    #[serde(default)]
    pub annotation: AnnotationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Annotation and scheduling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnnotationConfig {
    /// Initial value of the enabled toggle when no persisted setting exists
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Debounce window for selection changes, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long a parsed blame stays fresh, in milliseconds
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Ceiling on git stdout, in bytes
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Summaries longer than this are truncated in inline decorations
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// git executable to invoke
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            debounce_ms: default_debounce_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            max_output_bytes: default_max_output_bytes(),
            summary_max_chars: default_summary_max_chars(),
            git_binary: default_git_binary(),
        }
    }
}

impl AnnotationConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_ms == 0 {
            return Err(Error::Config(
                "annotation.cache_ttl_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_output_bytes == 0 {
            return Err(Error::Config(
                "annotation.max_output_bytes must be greater than zero".to_string(),
            ));
        }
        if self.summary_max_chars < 4 {
            return Err(Error::Config(
                "annotation.summary_max_chars must be at least 4".to_string(),
            ));
        }
        if self.git_binary.trim().is_empty() {
            return Err(Error::Config(
                "annotation.git_binary must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    50
}

fn default_cache_ttl_ms() -> u64 {
    60_000
}

fn default_max_output_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_summary_max_chars() -> usize {
    50
}

fn default_git_binary() -> String {
    "git".to_string()
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.annotation.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/blameline/config.toml` (~/.config/blameline/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("blameline").join("config.toml")
    }

    /// Returns the state directory path (for logs and persisted settings)
    ///
    /// `$XDG_STATE_HOME/blameline/` (~/.local/state/blameline/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("blameline")
    }

    /// Returns the persisted settings path
    pub fn settings_path() -> PathBuf {
        Self::state_dir().join("settings.toml")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/blameline/blameline.log` (~/.local/state/blameline/blameline.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("blameline.log")
    }
}
