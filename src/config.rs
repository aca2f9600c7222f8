//! Configuration management for Helios
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::error::{HeliosError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Enever API access configuration
    pub api: ApiConfig,

    /// Which provider entities are exposed
    pub providers: ProvidersConfig,

    /// Time resolution of the electricity feed
    #[serde(default)]
    pub resolution: PriceResolution,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Directory for persisted feed caches and the request counter
    pub state_dir: String,

    /// Timezone the feeds are interpreted in
    pub timezone: String,
}

/// Enever API access parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API token, passed as a query-string parameter
    pub token: String,

    /// Base URL of the price feeds
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Validate the token once at startup. Costs one request token.
    #[serde(default = "default_true")]
    pub validate_on_startup: bool,
}

/// Provider entity selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Expose all known providers, ignoring the per-feed lists below
    pub default_enabled: bool,

    /// Electricity provider codes to expose
    pub electricity_enabled: Vec<String>,

    /// Gas provider codes to expose
    pub gas_enabled: Vec<String>,

    /// Expose the monthly API request counter
    pub api_counter_enabled: bool,
}

/// Time resolution of the electricity feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PriceResolution {
    /// Hourly quotes
    #[default]
    #[serde(rename = "60")]
    Hourly,

    /// Quarter-hour quotes
    #[serde(rename = "15")]
    QuarterHourly,
}

impl PriceResolution {
    /// Interval length in minutes
    pub fn minutes(&self) -> i64 {
        match self {
            PriceResolution::Hourly => 60,
            PriceResolution::QuarterHourly => 15,
        }
    }

    /// Interval length as a chrono duration
    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.minutes())
    }

    /// Stable identifier used in storage keys
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceResolution::Hourly => "60",
            PriceResolution::QuarterHourly => "15",
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: "https://enever.nl/api/".to_string(),
            timeout_seconds: 10,
            validate_on_startup: true,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default_enabled: true,
            electricity_enabled: Vec::new(),
            gas_enabled: Vec::new(),
            api_counter_enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/helios.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            providers: ProvidersConfig::default(),
            resolution: PriceResolution::Hourly,
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
            state_dir: "/var/lib/helios".to_string(),
            timezone: "Europe/Amsterdam".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        let default_paths = [
            "helios_config.yaml",
            "/data/helios_config.yaml",
            "/etc/helios/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse the configured timezone
    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| HeliosError::validation("timezone", &format!("Unknown timezone: {}", self.timezone)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.token.trim().is_empty() {
            return Err(HeliosError::validation(
                "api.token",
                "API token cannot be empty",
            ));
        }

        if self.api.base_url.is_empty() {
            return Err(HeliosError::validation(
                "api.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.api.timeout_seconds == 0 {
            return Err(HeliosError::validation(
                "api.timeout_seconds",
                "Must be greater than 0",
            ));
        }

        if self.web.port == 0 {
            return Err(HeliosError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        if self.state_dir.is_empty() {
            return Err(HeliosError::validation(
                "state_dir",
                "State directory cannot be empty",
            ));
        }

        self.timezone()?;

        for code in &self.providers.electricity_enabled {
            if !crate::providers::supports_electricity(code) {
                return Err(HeliosError::validation(
                    "providers.electricity_enabled",
                    &format!("Unknown electricity provider: {code:?}"),
                ));
            }
        }

        for code in &self.providers.gas_enabled {
            if !crate::providers::supports_gas(code) {
                return Err(HeliosError::validation(
                    "providers.gas_enabled",
                    &format!("Unknown gas provider: {code:?}"),
                ));
            }
        }

        Ok(())
    }

    /// Electricity provider codes to expose, honoring the default flag
    pub fn enabled_electricity_providers(&self) -> Vec<String> {
        if self.providers.default_enabled {
            crate::providers::electricity_keys()
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        } else {
            self.providers.electricity_enabled.clone()
        }
    }

    /// Gas provider codes to expose, honoring the default flag
    pub fn enabled_gas_providers(&self) -> Vec<String> {
        if self.providers.default_enabled {
            crate::providers::gas_keys()
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        } else {
            self.providers.gas_enabled.clone()
        }
    }
}
