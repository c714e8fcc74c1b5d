use crate::error::ConfigError;
use crate::events::Timestamp;
use crate::thresholds::ThresholdTable;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
///
/// Loaded from an optional TOML file. Every section and field has a default,
/// so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Limits the run is judged against
    pub thresholds: ThresholdTable,
    /// Notification delivery settings
    pub notifications: NotificationConfig,
}

/// Settings for the `notify` command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Upper bound for a single channel delivery
    pub timeout_seconds: u64,
    /// Bot name shown in chat channels
    pub username: String,
    /// Avatar shown in Discord messages
    pub avatar_url: String,
    /// Directory receiving debug reports for failed runs
    pub debug_report_dir: PathBuf,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            username: "NightBFF CI Bot".to_string(),
            avatar_url:
                "https://github.com/Apesensei/nightbff-integration/raw/main/.github/ci-bot-avatar.png"
                    .to_string(),
            debug_report_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::TomlError` if it is not valid TOML for this schema, and
    /// `ConfigError::ValidationError` if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// See [`Config::from_file`].
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is usable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;

        if self.notifications.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "notifications.timeout_seconds must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Webhook destinations, taken from the environment
///
/// A channel is enabled only when its variable is set to a non-empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelTargets {
    /// `SLACK_WEBHOOK_URL`
    pub slack_webhook_url: Option<String>,
    /// `DISCORD_WEBHOOK_URL`
    pub discord_webhook_url: Option<String>,
}

impl ChannelTargets {
    /// Read targets from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    /// Read targets through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            slack_webhook_url: non_empty(lookup("SLACK_WEBHOOK_URL")),
            discord_webhook_url: non_empty(lookup("DISCORD_WEBHOOK_URL")),
        }
    }
}

/// Facts about the CI run, echoed verbatim in notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    pub timestamp: Timestamp,
    /// `NODE_ENV`, defaulting to `CI`
    pub environment: String,
    /// `GITHUB_REF`, defaulting to `unknown`
    pub branch: String,
    /// `GITHUB_SHA`, defaulting to `unknown`
    pub commit: String,
}

impl RunMetadata {
    /// Read metadata from the process environment, stamped now
    pub fn from_env() -> Self {
        Self::from_lookup(env_var, Utc::now())
    }

    /// Read metadata through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F, timestamp: Timestamp) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            timestamp,
            environment: non_empty(lookup("NODE_ENV")).unwrap_or_else(|| "CI".to_string()),
            branch: non_empty(lookup("GITHUB_REF")).unwrap_or_else(|| "unknown".to_string()),
            commit: non_empty(lookup("GITHUB_SHA")).unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
