//! Configuration management for assistant-relay.
//!
//! Credentials come from the process environment (`ASSISTANT_ID`, `API_KEY`),
//! falling back to a `.env` file in the working directory or its parents.
//! Tunables are loaded from `~/.config/assistant-relay/config.toml`.

use crate::error::RelayError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the assistant identity.
pub const ASSISTANT_ID_VAR: &str = "ASSISTANT_ID";
/// Environment variable holding the bearer credential.
pub const API_KEY_VAR: &str = "API_KEY";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Run polling settings.
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Remote service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API (default: https://api.openai.com/v1).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Value of the feature-version header sent on every call.
    #[serde(default = "default_beta_header")]
    pub beta_header: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            beta_header: default_beta_header(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_beta_header() -> String {
    "assistants=v2".to_string()
}

/// Run polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay before the first status check.
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    /// Upper bound for the delay between checks.
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    /// Multiplier applied to the delay after every check.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Give up on a run after this many seconds.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            backoff_factor: default_backoff_factor(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

fn default_initial_interval_ms() -> u64 {
    500
}

fn default_max_interval_ms() -> u64 {
    5000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_wait_secs() -> u64 {
    300
}

impl PollingConfig {
    /// Build the orchestrator's poll policy from these settings.
    pub fn policy(&self) -> crate::pipeline::PollPolicy {
        crate::pipeline::PollPolicy {
            initial_interval: Duration::from_millis(self.initial_interval_ms),
            max_interval: Duration::from_millis(self.max_interval_ms),
            backoff_factor: self.backoff_factor,
            max_wait: Duration::from_secs(self.max_wait_secs),
        }
    }
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("assistant-relay"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

/// Bearer credential. Never printed.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Process-wide identity and credential, read-only after startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub assistant_id: String,
    pub api_key: ApiKey,
}

impl Credentials {
    /// Read credentials from the process environment, then the nearest `.env`.
    pub fn from_env(assistant_override: Option<String>) -> Result<Self, RelayError> {
        let file = dotenvy::dotenv_iter()
            .map(dotenv_values)
            .unwrap_or_default();
        Self::from_sources(assistant_override, |name| std::env::var(name).ok(), &file)
    }

    /// Read credentials from `env`, then the given `.env` file.
    pub fn from_env_file(
        assistant_override: Option<String>,
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RelayError> {
        let file = dotenvy::from_path_iter(path)
            .map(dotenv_values)
            .map_err(|e| RelayError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_sources(assistant_override, env, &file)
    }

    /// Environment values win over file values, as with `dotenvy::dotenv`.
    fn from_sources<F>(
        assistant_override: Option<String>,
        env: F,
        file: &HashMap<String, String>,
    ) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(assistant_override, |name| {
            env(name).or_else(|| file.get(name).cloned())
        })
    }

    /// Read credentials through `lookup`, failing on missing or blank values.
    pub fn from_lookup<F>(assistant_override: Option<String>, lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| RelayError::Config(format!("{name} is not set")))
        };

        let assistant_id = match assistant_override.map(|a| a.trim().to_string()) {
            Some(id) if !id.is_empty() => id,
            _ => require(ASSISTANT_ID_VAR)?,
        };
        let api_key = ApiKey::new(require(API_KEY_VAR)?);

        Ok(Self {
            assistant_id,
            api_key,
        })
    }
}

/// Collect parsed `.env` entries, skipping malformed lines.
fn dotenv_values<R: std::io::Read>(iter: dotenvy::Iter<R>) -> HashMap<String, String> {
    iter.filter_map(|item| item.ok()).collect()
}
