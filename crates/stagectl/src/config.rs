//! Stagectl configuration.
//!
//! Config file: ~/.config/stagectl/config.toml or /etc/stagectl/config.toml.
//! A `.json` file is read as JSON, anything else as TOML. Table order in
//! `[classification_rules]` is preserved and decides trigger precedence.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "STAGECTL_CONFIG";
/// Environment variable supplying `backend.api_key` when the file has none
pub const API_KEY_ENV: &str = "STAGECTL_API_KEY";

fn default_model() -> String {
    "qwen3:4b".to_string()
}

fn default_timeout_secs() -> f64 {
    30.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> f64 {
    1.0
}

fn default_caregiver_url() -> String {
    "http://localhost:8080/caregiver".to_string()
}

/// Generative backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default, alias = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Full URL, or the base URL for Ollama
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Per-request timeout; fractional seconds allowed
    #[serde(default = "default_timeout_secs", alias = "timeoutSeconds", alias = "timeout")]
    pub timeout_secs: f64,

    /// Total attempts per classification, including the first
    #[serde(default = "default_max_retries", alias = "maxRetries")]
    pub max_retries: u32,

    /// Base backoff; doubles after each failed attempt
    #[serde(
        default = "default_retry_delay_secs",
        alias = "retryDelaySeconds",
        alias = "retry_delay"
    )]
    pub retry_delay_secs: f64,

    /// AWS region for Bedrock models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        secs_or_default("backend.timeout_secs", self.timeout_secs, default_timeout_secs())
    }

    pub fn retry_delay(&self) -> Duration {
        secs_or_default(
            "backend.retry_delay_secs",
            self.retry_delay_secs,
            default_retry_delay_secs(),
        )
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            region: None,
        }
    }
}

/// Caregiver notification service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaregiverConfig {
    #[serde(default = "default_caregiver_url")]
    pub url: String,

    #[serde(default = "default_timeout_secs", alias = "timeoutSeconds", alias = "timeout")]
    pub timeout_secs: f64,
}

impl CaregiverConfig {
    pub fn timeout(&self) -> Duration {
        secs_or_default("caregiver.timeout_secs", self.timeout_secs, default_timeout_secs())
    }
}

/// Seconds as a `Duration`; negative, NaN or huge values use `fallback`
fn secs_or_default(name: &str, secs: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
        warn!("{} = {} is not a valid duration, using {}s", name, secs, fallback);
        Duration::from_secs_f64(fallback)
    })
}

impl Default for CaregiverConfig {
    fn default() -> Self {
        Self {
            url: default_caregiver_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Intent code -> trigger list. Validated leniently by `PatternTable`.
    #[serde(
        default,
        alias = "classificationRules",
        skip_serializing_if = "Option::is_none"
    )]
    pub classification_rules: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,

    #[serde(default, alias = "mcp_server", skip_serializing_if = "Option::is_none")]
    pub caregiver: Option<CaregiverConfig>,
}

impl StageConfig {
    /// Default user config path: ~/.config/stagectl/config.toml
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("stagectl").join("config.toml"))
    }

    /// System config path: /etc/stagectl/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/stagectl/config.toml")
    }

    /// Load configuration.
    ///
    /// Priority:
    /// 1. `explicit` path (must exist)
    /// 2. $STAGECTL_CONFIG (must exist)
    /// 3. User config (~/.config/stagectl/config.toml)
    /// 4. System config (/etc/stagectl/config.toml)
    /// 5. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::load_file_chain(explicit)?;
        config.fill_api_key(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    fn load_file_chain(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::from_file(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::from_file(&system_path);
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read one config file; JSON by extension, otherwise TOML
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config = if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_toml_str(&contents)
        }
        .with_context(|| format!("Failed to parse {}", path.display()))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid TOML configuration")
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Invalid JSON configuration")
    }

    /// Use `key` for the backend when the file did not set one
    pub fn fill_api_key(&mut self, key: Option<String>) {
        if let (Some(backend), Some(key)) = (self.backend.as_mut(), key) {
            if backend.api_key.is_none() && !key.trim().is_empty() {
                backend.api_key = Some(key);
            }
        }
    }
}
