use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// UV provider settings
    #[serde(default)]
    pub uv: UvConfig,

    /// Retry and connectivity settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Remote history settings
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UvConfig {
    /// Endpoint of the UV index API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Access token sent as `x-access-token` (falls back to OPENUV_API_KEY
    /// at load time, never written back to disk)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Altitude in meters sent with every lookup
    #[serde(default = "default_altitude")]
    pub altitude_m: u32,

    /// Hard client-side timeout per request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How long a cached lookup stays fresh
    #[serde(default = "default_cache_minutes")]
    pub cache_minutes: u64,
}

fn default_base_url() -> String {
    "https://api.openuv.io/api/v1/uv".to_string()
}

fn default_altitude() -> u32 {
    100
}

fn default_request_timeout() -> u64 {
    10
}

fn default_cache_minutes() -> u64 {
    5
}

impl Default for UvConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            altitude_m: default_altitude(),
            request_timeout_secs: default_request_timeout(),
            cache_minutes: default_cache_minutes(),
        }
    }
}

impl UvConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_minutes * 60)
    }

    /// The configured API key, if it is present and non-empty.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingSetting("uv.api_key".to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Failures tolerated before the app flips offline (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base of the exponential backoff, multiplied by 2^attempt (default: 100)
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    100
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base(),
        }
    }
}

impl NetworkConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Collection holding UV records
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Debounce window for live history updates (default: 1000)
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,
}

fn default_collection() -> String {
    "uvExposure".to_string()
}

fn default_flush_interval() -> u64 {
    1000
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            flush_interval_ms: default_flush_interval(),
        }
    }
}

impl HistoryConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, writing defaults there if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        Self::load_with_env_key(config_path, std::env::var("OPENUV_API_KEY").ok())
    }

    fn load_with_env_key(config_path: &Path, env_key: Option<String>) -> Result<Self> {
        let mut config = if config_path.exists() {
            let contents =
                std::fs::read_to_string(config_path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            config
        };

        // Environment fills an absent key in memory only
        if config.uv.api_key.is_none() {
            config.uv.api_key = env_key;
        }

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_url(&self.uv.base_url, "uv.base_url", &mut result);

        if self.uv.require_api_key().is_err() {
            result.add_warning(
                "uv.api_key",
                "No API key configured - UV lookups will be rejected by the provider",
            );
        }

        if self.uv.request_timeout_secs == 0 {
            result.add_error("uv.request_timeout_secs", "Timeout must be greater than 0");
        } else if self.uv.request_timeout_secs > 120 {
            result.add_warning(
                "uv.request_timeout_secs",
                "Timeout is unusually long (>120s)",
            );
        }

        if self.uv.cache_minutes == 0 {
            result.add_warning("uv.cache_minutes", "Caching disabled (0 minutes)");
        }

        if self.network.max_retries == 0 {
            result.add_error("network.max_retries", "At least one attempt is required");
        }

        if self.network.backoff_base_ms > 10_000 {
            result.add_warning(
                "network.backoff_base_ms",
                "Backoff base is more than 10 seconds",
            );
        }

        if self.history.collection.trim().is_empty() {
            result.add_error("history.collection", "Collection name cannot be empty");
        }

        result
    }

    fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("sunsafe");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn config_with_key() -> Config {
        let mut config = Config::default();
        config.uv.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn test_valid_default_config() {
        let result = config_with_key().validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_defaults_match_provider_contract() {
        let config = Config::default();
        assert_eq!(config.uv.altitude_m, 100);
        assert_eq!(config.uv.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.uv.cache_duration(), Duration::from_secs(300));
        assert_eq!(config.network.max_retries, 3);
        assert_eq!(config.network.backoff_base(), Duration::from_millis(100));
        assert_eq!(config.history.collection, "uvExposure");
        assert_eq!(config.history.flush_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = config_with_key();
        config.uv.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "uv.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = config_with_key();
        config.uv.base_url = "ftp://api.openuv.io/api/v1/uv".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_missing_api_key_is_warning() {
        let mut config = Config::default();
        config.uv.api_key = None;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "uv.api_key"));
        assert!(matches!(
            config.uv.require_api_key(),
            Err(ConfigError::MissingSetting(_))
        ));
    }

    #[test]
    fn test_zero_retries_is_error() {
        let mut config = config_with_key();
        config.network.max_retries = 0;
        config.uv.request_timeout_secs = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        let summary = result.error_summary();
        assert!(summary.contains("network.max_retries"));
        assert!(summary.contains("uv.request_timeout_secs"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = config_with_key();
        config.network.backoff_base_ms = 5;
        config.history.collection = "uvTest".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.uv.api_key.as_deref(), Some("test-key"));
        assert_eq!(loaded.network.backoff_base_ms, 5);
        assert_eq!(loaded.history.collection, "uvTest");
    }

    #[test]
    fn test_load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(!path.exists());

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.uv.altitude_m, 100);
    }

    #[test]
    fn test_env_key_is_not_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config =
            Config::load_with_env_key(&path, Some("env-secret".to_string())).unwrap();
        assert_eq!(config.uv.api_key.as_deref(), Some("env-secret"));

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("env-secret"));

        // A key in the file beats the environment
        std::fs::write(&path, "[uv]\napi_key = \"file-key\"\n").unwrap();
        let config =
            Config::load_with_env_key(&path, Some("env-secret".to_string())).unwrap();
        assert_eq!(config.uv.api_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn test_uv_table_with_only_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[uv]\napi_key = \"k\"\n").unwrap();

        let config = Config::load_with_env_key(&path, None).unwrap();
        assert_eq!(config.uv.base_url, "https://api.openuv.io/api/v1/uv");
        assert_eq!(config.uv.api_key.as_deref(), Some("k"));
        assert_eq!(config.uv.altitude_m, 100);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[uv]\nbase_url = \"http://localhost:9000/uv\"\napi_key = \"k\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.uv.base_url, "http://localhost:9000/uv");
        assert_eq!(config.uv.cache_minutes, 5);
        assert_eq!(config.network.max_retries, 3);
        assert_eq!(config.history.flush_interval_ms, 1000);
    }
}
