//! Configuration management for the CLI
//!
//! This module handles loading configuration from:
//! - Default values
//! - Configuration files (YAML/JSON)
//! - Environment variables
//! - Command-line arguments

use crate::error::{Error, Result};
use roster_core::http::retry::RetryPolicy;
use roster_core::{ClientConfig, ReauthPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend connection settings
    pub backend: BackendConfig,

    /// Credential settings
    pub auth: AuthConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Backend connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend origin; falls back to ROSTER_BACKEND_BASE_URL, then the hosted default
    pub base_url: Option<String>,

    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after a connection failure
    pub max_retries: u32,

    /// First retry delay in milliseconds
    pub initial_retry_delay_ms: u64,

    /// What to do when the backend rejects the credential
    pub reauth: ReauthPolicy,
}

/// Credential configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Fixed access token
    pub token: Option<String>,

    /// Shell command that prints an access token on stdout
    pub token_command: Option<String>,

    /// Shell command that runs an interactive login
    pub login_command: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (compact, full, json)
    pub format: String,

    /// Log file path
    pub file: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        let defaults = ClientConfig::default();
        Self {
            base_url: None,
            timeout_secs: defaults.timeout_secs,
            max_retries: defaults.retry_policy.max_retries,
            initial_retry_delay_ms: defaults.retry_policy.initial_delay_ms,
            reauth: ReauthPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(Error::InvalidFormat {
                    path: path.to_path_buf(),
                    expected: "YAML or JSON".to_string(),
                })
            }
        };

        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in &Self::default_config_paths() {
            if path.exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        tracing::debug!(path = %path.display(), "loaded config file");
                        return Ok(config);
                    }
                    Err(e) => {
                        eprintln!("Warning: Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Configuration file paths checked in order
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".roster.yaml"),
            PathBuf::from(".roster.json"),
            PathBuf::from("roster.yaml"),
            PathBuf::from("roster.json"),
        ];

        if let Some(dir) = Self::user_config_dir() {
            paths.push(dir.join("config.yaml"));
            paths.push(dir.join("config.json"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".roster.yaml"));
            paths.push(home_dir.join(".roster.json"));
        }

        paths
    }

    /// Per-user configuration directory
    pub fn user_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("roster"))
    }

    /// Default location for `config init`
    pub fn user_config_path() -> Result<PathBuf> {
        Self::user_config_dir()
            .map(|dir| dir.join("config.yaml"))
            .ok_or_else(|| Error::config("could not determine the user config directory"))
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Client configuration for the request pipeline
    ///
    /// A `--base-url` flag wins over the file; with neither, the pipeline
    /// falls back to the environment and then the hosted default.
    pub fn client_config(&self, base_url_override: Option<&str>) -> ClientConfig {
        let retry_policy = RetryPolicy::new(self.backend.max_retries)
            .with_initial_delay(Duration::from_millis(self.backend.initial_retry_delay_ms));

        let mut config = ClientConfig::default()
            .with_retry_policy(retry_policy)
            .with_reauth_policy(self.backend.reauth)
            .with_timeout_secs(self.backend.timeout_secs);

        if let Some(base_url) = base_url_override.or(self.backend.base_url.as_deref()) {
            config = config.with_base_url(base_url);
        }
        config
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    )
}
