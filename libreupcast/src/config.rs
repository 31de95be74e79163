//! Configuration management for Reupcast

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::publish::FanOutPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
}

/// Remote platform endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Base URL for account and permission queries
    pub api_base: String,
    /// Base URL for video ingestion
    pub video_api_base: String,
    /// Versioned path segment used for video ingestion
    pub api_version: String,
    /// Per-request timeout; video uploads can take a long time
    pub timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            api_base: "https://graph.facebook.com".to_string(),
            video_api_base: "https://graph-video.facebook.com".to_string(),
            api_version: "v14.0".to_string(),
            timeout_secs: 600,
        }
    }
}

impl GraphConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Minutes to wait between two videos of a batch
    pub interval_minutes: u64,
    pub policy: FanOutPolicy,
    pub staging_dir: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 0,
            policy: FanOutPolicy::Broadcast,
            staging_dir: "~/.local/share/reupcast/uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokensConfig {
    pub dir: String,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            dir: "~/.local/share/reupcast/tokens".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is not an error: the built-in defaults are used instead.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every request fail
    pub fn validate(&self) -> Result<()> {
        if self.graph.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "graph.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        if self.graph.api_version.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "graph.api_version".to_string(),
                reason: "cannot be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Staging directory with `~` expanded
    pub fn staging_dir(&self) -> PathBuf {
        expand_path(&self.upload.staging_dir)
    }

    /// Token store directory with `~` expanded
    pub fn tokens_dir(&self) -> PathBuf {
        expand_path(&self.tokens.dir)
    }
}

/// Convert a whole-minute pacing interval into a duration
pub fn interval_from_minutes(minutes: u64) -> Duration {
    Duration::from_millis(minutes.saturating_mul(60_000))
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Resolve the configuration file path (`REUPCAST_CONFIG`, then the user config dir)
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("REUPCAST_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("reupcast").join("config.toml"))
}
