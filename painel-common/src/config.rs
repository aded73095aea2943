//! Configuration management for painel services.
//!
//! Configuration lives at `~/.painel/config.json`. A missing file yields the
//! defaults, which point at a local development backend.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (PAINEL_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `PAINEL_MARKET_DATA_URL` → gateway.market_data_url
//! - `PAINEL_AUTH_URL` → gateway.auth_url
//! - `PAINEL_ACCOUNT_URL` → gateway.account_url
//! - `PAINEL_LOG_LEVEL` → observability.log_level
//! - `PAINEL_LOG_FORMAT` → observability.log_format
//! - `PAINEL_SECTOR` → dashboard.sector

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ResultExt};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".painel"),
        |dirs| dirs.home_dir().join(".painel"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Gateway Configuration
// ============================================================================

/// Remote endpoints consumed by the query layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the market-data gateway
    #[serde(default = "default_market_data_url")]
    pub market_data_url: String,

    /// Base URL of the session auth service (profile, logout, Google auth)
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Base URL of the account endpoints (login, register)
    #[serde(default = "default_account_url")]
    pub account_url: String,

    /// Transport timeout for a single request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            market_data_url: default_market_data_url(),
            auth_url: default_auth_url(),
            account_url: default_account_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_market_data_url() -> String {
    "http://localhost:8000/market-data".into()
}

fn default_auth_url() -> String {
    "http://localhost:8003/api/v1/auth".into()
}

fn default_account_url() -> String {
    "http://localhost:8000/auth".into()
}

fn default_timeout_secs() -> u64 {
    30
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Retry / Policy Configuration
// ============================================================================

/// Exponential backoff applied between retries of queries and mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry, doubled on each further attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single retry delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Partial override of one category's freshness policy.
///
/// Keys in `Config::policies` are category names such as `market_data`,
/// `static_data` or `user_profile`. `refetch_interval_ms = 0` disables the
/// background refetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyOverrideConfig {
    #[serde(default)]
    pub refetch_interval_ms: Option<u64>,
    #[serde(default)]
    pub stale_time_ms: Option<u64>,
    #[serde(default)]
    pub cache_time_ms: Option<u64>,
    #[serde(default)]
    pub retry: Option<u32>,
}

// ============================================================================
// Dashboard Configuration
// ============================================================================

/// Defaults for the dashboard runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Sector filter for the home screenings ("internacional" for the
    /// international view, unset for the whole market)
    #[serde(default)]
    pub sector: Option<String>,
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for painel services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-category policy overrides
    #[serde(default)]
    pub policies: HashMap<String, PolicyOverrideConfig>,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PAINEL_MARKET_DATA_URL") {
            self.gateway.market_data_url = url;
        }
        if let Some(url) = lookup("PAINEL_AUTH_URL") {
            self.gateway.auth_url = url;
        }
        if let Some(url) = lookup("PAINEL_ACCOUNT_URL") {
            self.gateway.account_url = url;
        }
        if let Some(level) = lookup("PAINEL_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("PAINEL_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(sector) = lookup("PAINEL_SECTOR") {
            self.dashboard.sector = if sector.is_empty() { None } else { Some(sector) };
        }
    }

    /// Check structural constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.gateway.timeout_secs == 0 {
            return Err(Error::Config("gateway.timeout_secs must be positive".into()));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::Config(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        for url in [
            &self.gateway.market_data_url,
            &self.gateway.auth_url,
            &self.gateway.account_url,
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!("invalid gateway URL: {}", url)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gateway.market_data_url, "http://localhost:8000/market-data");
        assert_eq!(config.gateway.auth_url, "http://localhost:8003/api/v1/auth");
        assert_eq!(config.retry.base_delay_ms, 1_000);
        assert_eq!(config.retry.max_delay_ms, 30_000);
        assert!(config.policies.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "gateway": {{ "market_data_url": "https://api.example.com/market-data" }},
                "policies": {{ "market_data": {{ "stale_time_ms": 20000, "retry": 3 }} }},
                "dashboard": {{ "sector": "Energy" }}
            }}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.gateway.market_data_url, "https://api.example.com/market-data");
        assert_eq!(config.gateway.timeout_secs, 30);
        assert_eq!(config.observability.log_level, "info");
        let market = config.policies.get("market_data").unwrap();
        assert_eq!(market.stale_time_ms, Some(20_000));
        assert_eq!(market.retry, Some(3));
        assert!(market.cache_time_ms.is_none());
        assert_eq!(config.dashboard.sector.as_deref(), Some("Energy"));
    }

    #[test]
    fn test_load_from_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config.apply_overrides_from(|name| match name {
            "PAINEL_MARKET_DATA_URL" => Some("https://md.example.com".into()),
            "PAINEL_LOG_FORMAT" => Some("json".into()),
            "PAINEL_SECTOR" => Some("internacional".into()),
            _ => None,
        });

        assert_eq!(config.gateway.market_data_url, "https://md.example.com");
        assert_eq!(config.observability.log_format, "json");
        assert_eq!(config.dashboard.sector.as_deref(), Some("internacional"));
        assert_eq!(config.gateway.auth_url, "http://localhost:8003/api/v1/auth");
    }

    #[test]
    fn test_empty_sector_override_clears() {
        let mut config = Config::default();
        config.dashboard.sector = Some("Energy".into());
        config.apply_overrides_from(|name| (name == "PAINEL_SECTOR").then(String::new));
        assert!(config.dashboard.sector.is_none());
    }

    #[test]
    fn test_validate_retry_bounds() {
        let mut config = Config::default();
        config.retry.base_delay_ms = 60_000;
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_validate_url_scheme() {
        let mut config = Config::default();
        config.gateway.auth_url = "localhost:8003".into();
        assert!(config.validate().is_err());
    }
}
