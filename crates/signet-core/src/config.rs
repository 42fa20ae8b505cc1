//! Library configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/signet/config.toml)
//! 3. Environment variables (SIGNET_* prefix)
//!
//! Environment variables take precedence over config file values. All of
//! these are tunables; none affect correctness.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sync::RetryPolicy;

/// Environment variable prefix
const ENV_PREFIX: &str = "SIGNET";

/// Tunable settings for the bookmark database and its sync workflows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Delay before the first conflict retry, in milliseconds
    #[serde(default = "default_refresh_initial_delay_ms")]
    pub refresh_initial_delay_ms: u64,

    /// Upper bound on the delay between conflict retries, in milliseconds
    #[serde(default = "default_refresh_max_delay_ms")]
    pub refresh_max_delay_ms: u64,

    /// Whether serialized trees are indented for human editing
    #[serde(default = "default_indent_serialization")]
    pub indent_serialization: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_initial_delay_ms: default_refresh_initial_delay_ms(),
            refresh_max_delay_ms: default_refresh_max_delay_ms(),
            indent_serialization: default_indent_serialization(),
        }
    }
}

impl Config {
    /// Load configuration from the default location and environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides. If the file
    /// doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// The retry schedule the refresh workflow should use
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.refresh_initial_delay_ms),
            multiplier: 2,
            max_delay: Duration::from_millis(self.refresh_max_delay_ms),
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_u64("REFRESH_INITIAL_DELAY_MS") {
            self.refresh_initial_delay_ms = value;
        }
        if let Some(value) = env_u64("REFRESH_MAX_DELAY_MS") {
            self.refresh_max_delay_ms = value;
        }
        if let Ok(value) = std::env::var(format!("{}_INDENT_SERIALIZATION", ENV_PREFIX)) {
            self.indent_serialization = value.eq_ignore_ascii_case("true") || value == "1";
        }
    }

    /// Get the config file path
    ///
    /// Can be overridden with the SIGNET_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("signet")
            .join("config.toml")
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .and_then(|value| value.parse().ok())
}

fn default_refresh_initial_delay_ms() -> u64 {
    200
}

fn default_refresh_max_delay_ms() -> u64 {
    5_000
}

fn default_indent_serialization() -> bool {
    true
}
